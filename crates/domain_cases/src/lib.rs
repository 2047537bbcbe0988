//! Case Management Domain
//!
//! This crate implements the case lifecycle of the assistance desk: a case is
//! referred by an insurer, reviewed through a finance entry, and settled as an
//! invoice.
//!
//! # Case Lifecycle
//!
//! ```text
//! open --[close(remark)]--> in-review --[approve]--> closed
//!                               |
//!                               +--[reject]--> open
//! ```
//!
//! Entering review snapshots the case and the insurer's fee into a
//! [`Finance`] entry. Approving it replaces the entry with an [`Invoice`];
//! rejecting it deletes the entry and reopens the case. Each of these
//! compound steps is committed through a single [`LifecyclePort`] call, so a
//! case and its finance or invoice records change together or not at all.

pub mod actor;
pub mod case;
pub mod finance;
pub mod invoice;
pub mod error;
pub mod ports;
pub mod service;
pub mod lifecycle;
pub mod reporting;

pub use actor::{Actor, Role};
pub use case::{AuxStatus, Case, CasePatch, CaseStatus, NewCase, ValidCase};
pub use finance::{Finance, FinanceDecision};
pub use invoice::{Invoice, InvoiceStatus};
pub use error::CaseError;
pub use ports::{
    CaseFilter, CasePort, ClosedCountByUser, FinancePort, InvoicePort, IssueLogPort, IssueRecord,
    LifecyclePort, MonthlyCount, ReportGroup, SequencePort,
};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::InMemoryCaseStore;
pub use service::{case_number, CaseService};
pub use lifecycle::{CaseLifecycle, FinanceOutcome, LifecycleSettings, RequestContext};
pub use reporting::{densify, MonthlySeries, ReportingService};
