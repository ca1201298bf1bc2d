//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the care
//! directory test suite.
//!
//! # Modules
//!
//! - `mock`: Scripted in-memory pools behind the `PoolFactory` seam
//! - `fixtures`: Pre-built records and store configurations
//! - `builders`: Builder patterns for test records
//! - `database`: PostgreSQL test container management
//! - `assertions`: Assertion helpers for statements and mock state
//! - `generators`: Property-based test data generators

pub mod mock;
pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use mock::*;
pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
