//! Error types for GeoProvider

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    // Lookup errors
    #[error("Feature not found: {id}")]
    NotFound { id: String },

    #[error("Dataset is empty, no extents available")]
    EmptyDataset,

    // Lifecycle errors
    #[error("Invalid provider state: {reason}")]
    InvalidState { reason: String },

    // Backend errors
    #[error("Backend failure: {reason}")]
    Backend { reason: String },

    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    InvalidGeometry {
        feature_id: String,
        reason: String,
    },

    #[error("Row does not match table schema: {reason}")]
    SchemaMismatch { reason: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProviderError {
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState { reason: reason.into() }
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend { reason: reason.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
