//! Domain Adapters
//!
//! PostgreSQL implementations of the domain ports.
//!
//! Each adapter:
//! - Implements the domain's port traits
//! - Translates between domain records and database row types
//! - Uses the repository layer for database operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresCaseAdapter, PostgresDirectoryAdapter};
//! use domain_directory::{Directory, EntityKind};
//!
//! let directory = Directory::new(
//!     Arc::new(PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Clients)),
//!     Arc::new(PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Providers)),
//!     Arc::new(PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Hospitals)),
//! );
//! let cases = Arc::new(PostgresCaseAdapter::new(pool));
//! ```

pub mod directory;
pub mod cases;

pub use directory::PostgresDirectoryAdapter;
pub use cases::PostgresCaseAdapter;

use chrono::Utc;
use sqlx::PgPool;
use std::time::Instant;

use core_kernel::{AdapterHealth, HealthCheckResult, PortError};

use crate::error::{payload_field, DatabaseError};

/// Converts database errors to port errors
pub(crate) fn db_to_port_error(e: DatabaseError) -> PortError {
    if let DatabaseError::DuplicateEntry { field, .. } = &e {
        return PortError::conflict_field(e.to_string(), payload_field(field));
    }
    match e {
        DatabaseError::NotFound { entity, id } => PortError::not_found(entity, id),
        DatabaseError::StaleWrite(msg)
        | DatabaseError::ForeignKeyViolation(msg)
        | DatabaseError::TransactionFailed(msg) => PortError::conflict(msg),
        DatabaseError::ConstraintViolation(msg) => PortError::validation(msg),
        DatabaseError::ConnectionFailed(msg) => PortError::connection(msg),
        DatabaseError::PoolExhausted => PortError::ServiceUnavailable {
            service: "database connection pool".to_string(),
        },
        DatabaseError::Timeout(_) => PortError::ServiceUnavailable {
            service: "database (statement timeout)".to_string(),
        },
        other => PortError::Internal {
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}

/// Round-trips `SELECT 1` and reports the latency
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };

    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: Utc::now(),
    }
}
