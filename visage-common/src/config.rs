//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration is read once at process start and never mutated afterwards.
//! Resolution priority, highest first:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (`VISAGE_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: defaults are used and a warning is logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default upload ceiling: 10 MiB
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// MIME types the upload validator knows how to recognize
pub const SUPPORTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Default scoring model identifier
pub const DEFAULT_MODEL_NAME: &str = "gemini-1.5-flash";

/// Default Generative Language API endpoint
pub const DEFAULT_ORACLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "visage.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Data directory (database lives here unless `database_path` is set)
    pub root_folder: Option<PathBuf>,

    /// Explicit SQLite database file
    pub database_path: Option<PathBuf>,

    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub oracle: OracleConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Upload constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum accepted image size in bytes
    pub max_file_size: usize,

    /// Accepted MIME types (subset of [`SUPPORTED_IMAGE_TYPES`])
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: SUPPORTED_IMAGE_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Scoring oracle (remote AI model) parameters
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub api_key: String,
    pub model_name: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub temperature: f64,
    /// Upper bound for a single oracle call
    pub timeout_secs: u64,
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            base_url: DEFAULT_ORACLE_BASE_URL.to_string(),
            max_output_tokens: 2048,
            temperature: 0.1,
            timeout_secs: 60,
        }
    }
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Valid credentials for the access control gate
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub api_keys: Vec<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_keys", &format!("<{} configured>", self.api_keys.len()))
            .finish()
    }
}

/// Per-client request rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests per minute per client address; 0 disables limiting
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields defaults; an unreadable or unparsable file is an error.
    /// Nothing is logged here since this runs before the subscriber exists.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Apply `VISAGE_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// Empty values are ignored so that an exported-but-blank variable does
    /// not wipe a value from the TOML file.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(root) = get("VISAGE_ROOT_FOLDER") {
            self.root_folder = Some(PathBuf::from(root));
        }
        if let Some(db) = get("VISAGE_DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(db));
        }
        if let Some(keys) = get("VISAGE_API_KEYS") {
            self.auth.api_keys = parse_key_list(&keys);
        }
        if let Some(key) = get("VISAGE_ORACLE_API_KEY").or_else(|| get("GOOGLE_AI_API_KEY")) {
            self.oracle.api_key = key;
        }
        if let Some(model) = get("VISAGE_ORACLE_MODEL") {
            self.oracle.model_name = model;
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.upload.max_file_size == 0 {
            return Err(Error::Config("upload.max_file_size must be positive".to_string()));
        }
        if self.upload.allowed_types.is_empty() {
            return Err(Error::Config("upload.allowed_types must not be empty".to_string()));
        }
        for mime in &self.upload.allowed_types {
            let normalized = mime.trim().to_ascii_lowercase();
            if !SUPPORTED_IMAGE_TYPES.contains(&normalized.as_str()) {
                return Err(Error::Config(format!(
                    "upload.allowed_types contains unsupported type '{}' (supported: {})",
                    mime,
                    SUPPORTED_IMAGE_TYPES.join(", ")
                )));
            }
        }
        if self.oracle.timeout_secs == 0 {
            return Err(Error::Config("oracle.timeout_secs must be positive".to_string()));
        }
        if self.oracle.model_name.trim().is_empty() {
            return Err(Error::Config("oracle.model_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Root folder from config, falling back to the platform default
    pub fn root_folder(&self) -> PathBuf {
        self.root_folder.clone().unwrap_or_else(default_root_folder)
    }

    /// Database file path from config, falling back to `<root_folder>/visage.db`
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.root_folder().join(DATABASE_FILE_NAME))
    }
}

/// Split a comma separated credential list, dropping blanks
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Default configuration file location (`<config_dir>/visage/config.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("visage").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("visage.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("visage"))
        .unwrap_or_else(|| PathBuf::from("./visage_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.upload.allowed_types.len(), 4);
        assert_eq!(config.oracle.model_name, "gemini-1.5-flash");
        assert_eq!(config.oracle.timeout(), Duration::from_secs(60));
        assert_eq!(config.rate_limit.requests_per_minute, 30);
        assert!(config.auth.api_keys.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_key_list_drops_blanks() {
        assert_eq!(parse_key_list(" a, ,b ,,c"), vec!["a", "b", "c"]);
        assert!(parse_key_list("").is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TomlConfig::default();
        config.apply_overrides_from(lookup_from(&[
            ("VISAGE_API_KEYS", "k1,k2"),
            ("VISAGE_DATABASE_PATH", "/tmp/x.db"),
            ("GOOGLE_AI_API_KEY", "google-key"),
        ]));

        assert_eq!(config.auth.api_keys, vec!["k1", "k2"]);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/x.db"));
        assert_eq!(config.oracle.api_key, "google-key");
    }

    #[test]
    fn test_visage_oracle_key_wins_over_google_key() {
        let mut config = TomlConfig::default();
        config.apply_overrides_from(lookup_from(&[
            ("VISAGE_ORACLE_API_KEY", "visage-key"),
            ("GOOGLE_AI_API_KEY", "google-key"),
        ]));
        assert_eq!(config.oracle.api_key, "visage-key");
    }

    #[test]
    fn test_blank_env_value_does_not_override() {
        let mut config = TomlConfig::default();
        config.auth.api_keys = vec!["from-toml".to_string()];
        config.apply_overrides_from(lookup_from(&[("VISAGE_API_KEYS", "  ")]));
        assert_eq!(config.auth.api_keys, vec!["from-toml"]);
    }

    #[test]
    fn test_database_path_defaults_into_root_folder() {
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/srv/visage")),
            ..Default::default()
        };
        assert_eq!(config.database_path(), PathBuf::from("/srv/visage/visage.db"));
    }

    #[test]
    fn test_validate_rejects_unknown_type() {
        let mut config = TomlConfig::default();
        config.upload.allowed_types = vec!["image/gif".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("image/gif"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = TomlConfig::default();
        config.upload.max_file_size = 0;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.oracle.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = TomlConfig::default();
        config.oracle.api_key = "super-secret".to_string();
        config.auth.api_keys = vec!["also-secret".to_string()];
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("also-secret"));
        assert!(rendered.contains("<1 configured>"));
    }
}
