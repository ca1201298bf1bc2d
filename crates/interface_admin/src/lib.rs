//! Operator tooling for the care directory store
//!
//! The `store-admin` binary loads the store configuration, builds the pool
//! registry and runs one health sweep. This library holds the parts of that
//! flow that do not need a live server, so they can be tested against mock
//! pools.

pub mod report;

pub use report::{check, render, CheckOutcome};
