//! Core Kernel - Foundational types shared by every crate of the case desk
//!
//! This crate provides the building blocks used across the domain modules:
//! - Fixed-point money for claim amounts and case fees
//! - Strongly-typed identifiers for cases, finance entries, invoices and directory records
//! - Calendar ranges and month keys used by listings and reports
//! - Port error and health-check abstractions implemented by storage adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Money, MoneyError};
pub use temporal::{DateRange, MonthKey, RangeBound, TemporalError, DEFAULT_WINDOW_MONTHS, parse_boundary};
pub use identifiers::{
    CaseId, FinanceId, InvoiceId, ClientId, ProviderId, HospitalId, UserId, IssueId,
};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
