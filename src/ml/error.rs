//! Error types for the regression engine

use std::path::PathBuf;

use thiserror::Error;

use crate::error::PricingError;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The model artifact path does not exist
    #[error("model artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("dataset is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A declared feature name has no value in the loan inputs
    #[error("unknown feature `{0}`")]
    UnknownFeature(String),

    #[error("expected {expected} features, got {found}")]
    FeatureCountMismatch { expected: usize, found: usize },

    #[error("dataset has no rows")]
    EmptyDataset,

    #[error("{rows} rows cannot identify {parameters} parameters")]
    InsufficientData { rows: usize, parameters: usize },

    #[error("model fit failed: {0}")]
    Fit(String),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
