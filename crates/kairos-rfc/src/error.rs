use thiserror::Error;

/// RRULE parsing and validation errors
#[derive(Error, Debug)]
pub enum RfcError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
