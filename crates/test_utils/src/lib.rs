//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! case desk test suite.
//!
//! # Modules
//!
//! - `fixtures`: Fixed test data (actors, amounts, dates)
//! - `builders`: Builders for directory entries and case requests
//! - `database`: PostgreSQL testcontainer harness
//! - `assertions`: Assertion helpers for domain results
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
