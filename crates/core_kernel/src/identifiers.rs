//! Strongly-typed identifiers for directory records
//!
//! Every record's unique key is a UUID wrapped in its own newtype, so a
//! `DoctorId` cannot be stored where an `AppointmentId` is expected. Each id
//! converts into a [`FieldValue::Uuid`](crate::record::FieldValue) when the
//! record is mapped to columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl From<$name> for $crate::record::FieldValue {
            fn from(id: $name) -> Self {
                $crate::record::FieldValue::Uuid(id.0)
            }
        }
    };
}

define_id!(
    /// Key of a `doctors` row
    DoctorId,
    "DOC"
);
define_id!(
    /// Key of a `medical_specialties` row
    SpecialtyId,
    "SPC"
);
define_id!(AppointmentId, "APT");
define_id!(ReviewId, "REV");
define_id!(
    /// Key of a `user_queries` row; appointments keep it as their source query
    QueryId,
    "QRY"
);
define_id!(UserId, "USR");
