//! Core analysis services
//!
//! Write path: upload validation → scoring oracle → classification → storage.

pub mod analysis_pipeline;
pub mod classifier;
pub mod oracle_client;
pub mod statistics;
pub mod upload_validator;

pub use analysis_pipeline::{AnalysisPipeline, PipelineError};
pub use classifier::{classify, Classification};
pub use oracle_client::{GeminiOracle, OracleAssessment, OracleError, ScoringOracle};
pub use upload_validator::{ImageFormat, UploadError, UploadLimits, ValidatedImage};
