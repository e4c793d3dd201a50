//! Database access for visage-api

pub mod analyses;

pub use analyses::{AnalysisStore, StoreError};
