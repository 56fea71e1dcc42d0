use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("Cannot decode column {column}: expected {expected}")]
    Decode {
        column: String,
        expected: &'static str,
    },

    #[error("Unsupported column type {type_name} for column {column}")]
    UnsupportedColumnType { column: String, type_name: String },

    #[error("Id generation error: {0}")]
    IdGeneration(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
