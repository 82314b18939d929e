use thiserror::Error;

/// The closed set of failure kinds the service layer produces. Each kind maps
/// to exactly one HTTP status at the API boundary, and the message carried by
/// the kind is the message the client sees.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing/malformed required field, out-of-range numeric, bad enum value.
    #[error("{0}")]
    Validation(String),

    /// Missing id, missing referenced entity, or entity not owned by the caller.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique name, or a deletion target that is still referenced.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
