//! Core Kernel - Foundational types for the care directory
//!
//! This crate provides the building blocks shared by the domain records and the
//! persistence layer:
//! - The record model: field types, field values and static schema descriptors
//! - Strongly-typed identifiers for directory entities
//! - The kernel error type

pub mod record;
pub mod identifiers;
pub mod error;

pub use record::{FieldDef, FieldType, FieldValue, Record, RecordSchema, RecordType, ScalarType};
pub use identifiers::{AppointmentId, DoctorId, QueryId, ReviewId, SpecialtyId, UserId};
pub use error::CoreError;

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
