use kairos_core::types::ObjectId;
use thiserror::Error;

/// Service layer errors - surfaced by the series editing tooling only.
///
/// The occurrence query path never returns these; it absorbs every failure
/// into an empty or partial result.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    RfcError(#[from] kairos_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] kairos_core::error::CoreError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Object {0} is not recurring")]
    NotRecurring(ObjectId),

    #[error("Invalid split date: {0}")]
    InvalidSplitDate(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
