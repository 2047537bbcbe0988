//! Entity Directory Domain
//!
//! Clients, providers and hospitals are passive reference data: a case names
//! one of them as its insurer and a hospital (or provider) as the service
//! location. The lifecycle engine reads fee schedules, region and coverage
//! from these records when it snapshots a case into finance and invoice
//! entries, but never mutates them.
//!
//! # Directory kinds
//!
//! - **Clients**: insurers that refer cases
//! - **Providers**: assistance providers; may act as insurer or service location
//! - **Hospitals**: service locations; may also be billed as insurer
//!
//! A polymorphic insurer reference is an [`EntityRef`], resolved through the
//! [`Directory`] lookup table of per-kind ports.

pub mod entry;
pub mod error;
pub mod ports;
pub mod service;

pub use entry::{
    DirectoryEntry, EntityKind, EntityRef, EntryStatus, HospitalRelation,
    Contact, Contacts, NewEntry, EntryPatch,
};
pub use error::DirectoryError;
pub use ports::{ActiveCaseCounter, Directory, DirectoryPort};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{FixedCaseCounts, InMemoryDirectoryPort};
pub use service::{DirectoryService, DropdownData, DropdownItem, EntryWithCaseload};
