//! Care Directory Domain
//!
//! The records persisted by the care directory. Each record type declares its
//! table, columns and unique key with `core_kernel::define_record!`, so it can
//! be handed directly to `infra_db::RecordStore`.
//!
//! | record | table | routed by |
//! |---|---|---|
//! | [`Doctor`] | `doctors` | `Doctor` |
//! | [`Appointment`] | `appointments` | `Appointment` |
//! | [`DoctorReview`] | `doctor_reviews` | `DoctorReview` |
//! | [`UserQuery`] | `user_queries` | `UserQuery` |
//! | [`MedicalSpecialty`] | `medical_specialties` | `MedicalSpecialty` |
//! | [`User`] | `users` | always the default resource |
//!
//! # Examples
//!
//! ```rust
//! use core_kernel::{Record, RecordType};
//! use domain_care::{User, UserQuery};
//!
//! let query = UserQuery::new("knee pain after running, near Austin");
//! assert_eq!(query.schema().table(), Some("user_queries"));
//! assert_eq!(User::record_schema().unique_key().map(|f| f.name), Some("id"));
//! ```

use core_kernel::{FieldType, ScalarType};

pub mod appointment;
pub mod doctor;
pub mod error;
pub mod query;
pub mod review;
pub mod specialty;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus, PaymentStatus, VisitMode};
pub use doctor::Doctor;
pub use error::DomainError;
pub use query::{UrgencyLevel, UserQuery};
pub use review::DoctorReview;
pub use specialty::MedicalSpecialty;
pub use user::User;

pub(crate) const TEXT_LIST: FieldType = FieldType::array_of(ScalarType::Text);
