use drsite_api::ResourceKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transform policy error: {0}")]
    TransformPolicy(String),

    #[error("Emit error: {0}")]
    Emit(String),

    #[error("Duplicate {kind} resource: {name}")]
    DuplicateResource { kind: ResourceKind, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
