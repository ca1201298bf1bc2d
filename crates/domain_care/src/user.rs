//! Directory users

use core_kernel::{define_record, FieldType, UserId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{validate, DomainError};

/// An authenticated user
///
/// Users always live on the default resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct User {
    pub id: UserId,
    #[validate(email)]
    pub email: String,
}

define_record!(User => "users", unique = id {
    id: FieldType::UUID,
    email: FieldType::TEXT,
});

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
        }
    }

    pub fn validate_record(&self) -> Result<(), DomainError> {
        validate(self)
    }
}
