use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Unresolved reference to {class}#{id}")]
    UnresolvedReference { class: String, id: String },

    #[error("Unit of work is closed")]
    SessionClosed,

    #[error("Stale collection '{0}': unit of work flushed since it was wired")]
    StaleCollection(String),

    #[error("Unsupported collection kind: {0}")]
    UnsupportedCollection(String),

    #[error("Reflection error: {0}")]
    Reflection(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl<T> From<std::sync::PoisonError<T>> for ModelError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
