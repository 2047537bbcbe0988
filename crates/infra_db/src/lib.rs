//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the case desk, built on SQLx.
//!
//! # Architecture
//!
//! Repositories own the SQL and work on plain row types; adapters implement
//! the domain ports on top of them and translate rows to domain records.
//!
//! ```text
//!   domain ports (DirectoryPort, CasePort, LifecyclePort, ...)
//!                         ▲
//!   adapters  ────────────┘   PostgresDirectoryAdapter, PostgresCaseAdapter
//!       │
//!       ▼
//!   repositories              SQL, row types, database enums
//!       │
//!       ▼
//!   PgPool
//! ```
//!
//! The compound lifecycle transitions each run in a single transaction. The
//! case row is updated with a `WHERE status = <expected>` guard, so a request
//! racing another transition fails as a conflict and rolls back.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresCaseAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/case_desk")).await?;
//! run_migrations(&pool).await?;
//! let cases = PostgresCaseAdapter::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
pub use error::DatabaseError;
pub use adapters::{PostgresCaseAdapter, PostgresDirectoryAdapter};
