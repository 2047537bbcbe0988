//! Case domain errors

use thiserror::Error;

use core_kernel::PortError;
use domain_directory::DirectoryError;

/// Errors that can occur in the case domain
#[derive(Debug, Error)]
pub enum CaseError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// A referenced case, finance entry, invoice or directory record is absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Disallowed transition, duplicate key, or a stale concurrent write
    #[error("{0}")]
    Conflict(String),

    /// Stored records reference each other inconsistently
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Upstream(PortError),
}

impl CaseError {
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        CaseError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CaseError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CaseError::Conflict(message.into())
    }
}

impl From<PortError> for CaseError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => CaseError::NotFound { entity: entity_type, id },
            PortError::Validation { message, .. } => CaseError::Validation(message),
            PortError::Conflict { message, .. } => CaseError::Conflict(message),
            other => CaseError::Upstream(other),
        }
    }
}

impl From<DirectoryError> for CaseError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::Validation(message) => CaseError::Validation(message),
            DirectoryError::NotFound { kind, id } => CaseError::NotFound { entity: kind, id },
            e @ (DirectoryError::Duplicate { .. } | DirectoryError::InUse { .. }) => {
                CaseError::Conflict(e.to_string())
            }
            DirectoryError::Store(e) => e.into(),
        }
    }
}
