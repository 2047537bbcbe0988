//! Request and response bodies
//!
//! Field names are camelCase on the wire. Domain records that already
//! serialize in that shape (cases, finance entries, invoices, directory
//! records) are returned as-is.

pub mod common;
pub mod cases;
pub mod lifecycle;

pub use common::RangeQuery;
