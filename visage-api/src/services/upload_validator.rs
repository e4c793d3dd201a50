//! Upload validator
//!
//! Checks an uploaded image before any expensive work happens:
//! - size must be non-zero and not exceed the configured maximum
//! - the declared content type (when present) must be an allowed image type
//! - the magic bytes must identify an allowed image type that agrees with
//!   the declared one
//! - the image must decode, each side must lie in 200..=4000 px and the
//!   aspect ratio in 0.33..=3
//!
//! Images larger than [`MAX_ORACLE_DIMENSION`] on their longest side are
//! downscaled and re-encoded as JPEG before they reach the oracle.
//!
//! Size can be checked incrementally with [`UploadLimits::check_size`] while
//! the body is streamed, so an oversized upload is rejected without being
//! buffered in full.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;
use visage_common::config::UploadConfig;

/// Fallback name for uploads without a usable filename
pub const UNKNOWN_FILENAME: &str = "unknown.jpg";

/// Maximum stored filename length, extension included
pub const MAX_FILENAME_LEN: usize = 100;

/// Smallest accepted width or height in pixels
pub const MIN_DIMENSION: u32 = 200;

/// Largest accepted width or height in pixels
pub const MAX_DIMENSION: u32 = 4000;

/// Accepted width/height ratio range
pub const MIN_ASPECT_RATIO: f64 = 0.33;
pub const MAX_ASPECT_RATIO: f64 = 3.0;

/// Longest side sent to the oracle
pub const MAX_ORACLE_DIMENSION: u32 = 1024;

/// JPEG quality used when a downscaled image is re-encoded
const REENCODE_QUALITY: u8 = 85;

/// Upload rejections
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Request does not contain a file field")]
    MissingFile,

    #[error("File size exceeds the maximum of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Malformed upload: {0}")]
    Malformed(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

impl UploadError {
    pub fn code(&self) -> &'static str {
        match self {
            UploadError::Empty => "EMPTY_FILE",
            UploadError::MissingFile => "MISSING_FILE",
            UploadError::TooLarge { .. } => "FILE_TOO_LARGE",
            UploadError::UnsupportedType(_) => "UNSUPPORTED_FILE_TYPE",
            UploadError::Malformed(_) => "MALFORMED_UPLOAD",
            UploadError::InvalidImage(_) => "INVALID_IMAGE",
        }
    }
}

/// Image formats the service can accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Parse a MIME type, ignoring case and parameters; `image/jpg` is JPEG
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    /// Identify the format from magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        infer::get(bytes).and_then(|kind| Self::from_mime(kind.mime_type()))
    }

    /// Canonical MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
        }
    }

    fn codec(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

/// An upload that passed validation
///
/// `bytes` and `format` describe the oracle payload, which differs from the
/// upload only when the image was downscaled.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    dimensions: (u32, u32),
    filename: String,
}

impl ValidatedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Width and height of the uploaded image
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Sanitized filename
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// Size and type constraints, fixed at startup
#[derive(Debug, Clone)]
pub struct UploadLimits {
    max_file_size: usize,
    allowed: Vec<ImageFormat>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

impl UploadLimits {
    pub fn new(max_file_size: usize, allowed: Vec<ImageFormat>) -> Self {
        Self {
            max_file_size,
            allowed,
        }
    }

    /// Build limits from configuration; unknown MIME types are skipped
    /// (configuration validation rejects them at startup)
    pub fn from_config(config: &UploadConfig) -> Self {
        let mut allowed = Vec::new();
        for format in config.allowed_types.iter().filter_map(|m| ImageFormat::from_mime(m)) {
            if !allowed.contains(&format) {
                allowed.push(format);
            }
        }
        Self::new(config.max_file_size, allowed)
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn is_allowed(&self, format: ImageFormat) -> bool {
        self.allowed.contains(&format)
    }

    /// Reject once `len` bytes exceed the maximum
    pub fn check_size(&self, len: usize) -> Result<(), UploadError> {
        if len > self.max_file_size {
            return Err(UploadError::TooLarge {
                size: len,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Check a declared content type before reading the body
    ///
    /// `None` (no declaration, or `application/octet-stream`) defers the
    /// decision to sniffing.
    pub fn check_declared_type(
        &self,
        content_type: Option<&str>,
    ) -> Result<Option<ImageFormat>, UploadError> {
        let declared = match content_type.map(str::trim) {
            None | Some("") => return Ok(None),
            Some(ct) if ct.eq_ignore_ascii_case("application/octet-stream") => return Ok(None),
            Some(ct) => ct,
        };

        match ImageFormat::from_mime(declared) {
            Some(format) if self.is_allowed(format) => Ok(Some(format)),
            _ => Err(UploadError::UnsupportedType(format!(
                "{} (allowed: {})",
                declared,
                self.allowed_list()
            ))),
        }
    }

    /// Full validation of a buffered upload
    pub fn validate(
        &self,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        filename: Option<&str>,
    ) -> Result<ValidatedImage, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        self.check_size(bytes.len())?;

        let declared = self.check_declared_type(content_type)?;

        let sniffed = ImageFormat::sniff(&bytes).ok_or_else(|| {
            UploadError::UnsupportedType("content is not a recognized image".to_string())
        })?;
        if !self.is_allowed(sniffed) {
            return Err(UploadError::UnsupportedType(format!(
                "{} (allowed: {})",
                sniffed.mime_type(),
                self.allowed_list()
            )));
        }
        if let Some(declared) = declared {
            if declared != sniffed {
                return Err(UploadError::UnsupportedType(format!(
                    "declared {} but content is {}",
                    declared.mime_type(),
                    sniffed.mime_type()
                )));
            }
        }

        let decoded = decode_checked(&bytes, sniffed)?;
        let dimensions = (decoded.width(), decoded.height());
        let (bytes, format) = match downscale_for_oracle(&decoded)? {
            Some(resized) => (resized, ImageFormat::Jpeg),
            None => (bytes, sniffed),
        };

        Ok(ValidatedImage {
            bytes,
            format,
            dimensions,
            filename: sanitize_filename(filename),
        })
    }

    fn allowed_list(&self) -> String {
        self.allowed
            .iter()
            .map(ImageFormat::mime_type)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Check image geometry against the accepted ranges
pub fn check_dimensions(width: u32, height: u32) -> Result<(), UploadError> {
    if width < MIN_DIMENSION || height < MIN_DIMENSION {
        return Err(UploadError::InvalidImage(format!(
            "{}x{} is smaller than the minimum {}x{}",
            width, height, MIN_DIMENSION, MIN_DIMENSION
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(UploadError::InvalidImage(format!(
            "{}x{} exceeds the maximum {}x{}",
            width, height, MAX_DIMENSION, MAX_DIMENSION
        )));
    }

    let ratio = f64::from(width) / f64::from(height);
    if !(MIN_ASPECT_RATIO..=MAX_ASPECT_RATIO).contains(&ratio) {
        return Err(UploadError::InvalidImage(format!(
            "aspect ratio {:.2} is outside {}..={}",
            ratio, MIN_ASPECT_RATIO, MAX_ASPECT_RATIO
        )));
    }
    Ok(())
}

/// Read the header, check geometry, then decode the pixel data
///
/// Geometry is checked from the header alone so that an oversized image is
/// rejected before its pixels are allocated.
fn decode_checked(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, UploadError> {
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format.codec())
        .into_dimensions()
        .map_err(|e| UploadError::InvalidImage(format!("unreadable image header: {}", e)))?;
    check_dimensions(width, height)?;

    image::load_from_memory_with_format(bytes, format.codec())
        .map_err(|e| UploadError::InvalidImage(format!("corrupt image data: {}", e)))
}

/// Re-encode as JPEG when the longest side exceeds [`MAX_ORACLE_DIMENSION`]
fn downscale_for_oracle(decoded: &DynamicImage) -> Result<Option<Vec<u8>>, UploadError> {
    if decoded.width().max(decoded.height()) <= MAX_ORACLE_DIMENSION {
        return Ok(None);
    }

    let resized = decoded
        .resize(MAX_ORACLE_DIMENSION, MAX_ORACLE_DIMENSION, FilterType::Lanczos3)
        .to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, REENCODE_QUALITY)
        .encode_image(&resized)
        .map_err(|e| UploadError::InvalidImage(format!("re-encoding failed: {}", e)))?;

    debug!(
        from = %format!("{}x{}", decoded.width(), decoded.height()),
        to = %format!("{}x{}", resized.width(), resized.height()),
        bytes = out.len(),
        "Downscaled image for oracle"
    );
    Ok(Some(out))
}

/// Reduce a client-supplied filename to a safe stored name
///
/// Directory components are dropped, characters outside `[A-Za-z0-9_.-]`
/// become `_`, and names longer than [`MAX_FILENAME_LEN`] are truncated
/// keeping the extension.
///
/// # Examples
///
/// ```
/// use visage_api::services::upload_validator::sanitize_filename;
///
/// assert_eq!(sanitize_filename(Some("my photo (1).jpg")), "my_photo__1_.jpg");
/// assert_eq!(sanitize_filename(Some("../../etc/passwd")), "passwd");
/// assert_eq!(sanitize_filename(None), "unknown.jpg");
/// ```
pub fn sanitize_filename(filename: Option<&str>) -> String {
    let base = filename
        .map(|f| f.rsplit(['/', '\\']).next().unwrap_or("").trim())
        .unwrap_or("");
    if base.is_empty() {
        return UNKNOWN_FILENAME.to_string();
    }

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.len() <= MAX_FILENAME_LEN {
        return cleaned;
    }

    // cleaned is pure ASCII from here on, so byte slicing is safe
    match cleaned.rfind('.') {
        Some(dot) if dot > 0 && cleaned.len() - dot < MAX_FILENAME_LEN => {
            let ext = &cleaned[dot..];
            let stem = &cleaned[..MAX_FILENAME_LEN - ext.len()];
            format!("{}{}", stem, ext)
        }
        _ => cleaned[..MAX_FILENAME_LEN].to_string(),
    }
}
