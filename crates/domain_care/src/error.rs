//! Care domain errors

use thiserror::Error;

/// Errors that can occur in the care domain
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// A record failed field validation
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// An appointment cannot move to the requested status
    #[error("Invalid appointment transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A value could not be parsed
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl DomainError {
    /// Creates an InvalidValue error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        DomainError::InvalidValue(message.into())
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::ValidationFailed(errors.to_string())
    }
}

/// Runs `validator` checks on a record
pub(crate) fn validate<T: validator::Validate>(record: &T) -> Result<(), DomainError> {
    record.validate().map_err(DomainError::from)
}
