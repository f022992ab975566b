//! Error types for Aisle

use thiserror::Error;

/// The main error type for Aisle operations
#[derive(Debug, Error)]
pub enum AisleError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(u64),

    #[error("Asset error: {0}")]
    AssetError(String),

    #[error("Import error: {0}")]
    ImportError(String),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Resource error: {0}")]
    ResourceError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),

    #[error("Value out of range: {field} must be between {min} and {max}, got {value}")]
    ValueOutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },
}

/// Result type alias for Aisle operations
pub type Result<T> = std::result::Result<T, AisleError>;

impl From<toml::de::Error> for AisleError {
    fn from(err: toml::de::Error) -> Self {
        AisleError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for AisleError {
    fn from(err: toml::ser::Error) -> Self {
        AisleError::TomlSerError(err.to_string())
    }
}
