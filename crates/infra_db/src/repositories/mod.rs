//! Repository implementations
//!
//! Each repository owns the SQL for one table and works on row types that
//! mirror its columns. Database enums are declared next to the rows that use
//! them. Writes that belong to a lifecycle commit are associated functions
//! taking a `&mut PgConnection`, so the adapter can run several of them in
//! one transaction.

pub mod directory;
pub mod cases;
pub mod finances;
pub mod invoices;
pub mod sequences;
pub mod issues;

pub use directory::DirectoryRepository;
pub use cases::CaseRepository;
pub use finances::FinanceRepository;
pub use invoices::InvoiceRepository;
pub use sequences::SequenceRepository;
pub use issues::IssueRepository;
