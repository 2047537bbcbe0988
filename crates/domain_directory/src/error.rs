//! Directory domain errors

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur in the directory domain
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("{kind} \"{name}\" already exists")]
    Duplicate { kind: String, name: String },

    #[error("Cannot delete {name}: it has {active_cases} active case(s)")]
    InUse { name: String, active_cases: u64 },

    #[error(transparent)]
    Store(#[from] PortError),
}

impl DirectoryError {
    pub fn not_found(kind: impl Into<String>, id: impl std::fmt::Display) -> Self {
        DirectoryError::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }
}
