//! PostgreSQL Directory Adapter
//!
//! One adapter instance serves one directory collection (`clients`,
//! `providers` or `hospitals`); the three share a table layout.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, Money, PortError};
use domain_directory::{
    Contacts, DirectoryEntry, DirectoryPort, EntityKind, EntryStatus, HospitalRelation,
};

use crate::adapters::{db_to_port_error, ping};
use crate::error::DatabaseError;
use crate::repositories::directory::{
    DirectoryRepository, DirectoryRow, EntryStatus as DbEntryStatus,
    HospitalRelation as DbHospitalRelation,
};

/// PostgreSQL-backed implementation of `DirectoryPort`
#[derive(Debug, Clone)]
pub struct PostgresDirectoryAdapter {
    kind: EntityKind,
    repository: DirectoryRepository,
    pool: PgPool,
}

impl PostgresDirectoryAdapter {
    pub fn new(pool: PgPool, kind: EntityKind) -> Self {
        Self {
            kind,
            repository: DirectoryRepository::new(pool.clone(), kind.as_str(), kind.label()),
            pool,
        }
    }

    pub fn repository(&self) -> &DirectoryRepository {
        &self.repository
    }

    fn to_entry(&self, row: DirectoryRow) -> Result<DirectoryEntry, PortError> {
        row_to_entry(self.kind, row).map_err(db_to_port_error)
    }
}

impl DomainPort for PostgresDirectoryAdapter {}

#[async_trait]
impl HealthCheckable for PostgresDirectoryAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, &format!("postgres-{}", self.kind)).await
    }
}

#[async_trait]
impl DirectoryPort for PostgresDirectoryAdapter {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn get(&self, id: Uuid) -> Result<DirectoryEntry, PortError> {
        let row = self.repository.get_by_id(id).await.map_err(db_to_port_error)?;
        self.to_entry(row)
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn find_by_name(&self, name: &str) -> Result<Option<DirectoryEntry>, PortError> {
        self.repository
            .find_by_name(name)
            .await
            .map_err(db_to_port_error)?
            .map(|row| self.to_entry(row))
            .transpose()
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn list(&self) -> Result<Vec<DirectoryEntry>, PortError> {
        let rows = self.repository.list().await.map_err(db_to_port_error)?;
        debug!(count = rows.len(), "Listed directory entries");
        rows.into_iter().map(|row| self.to_entry(row)).collect()
    }

    #[instrument(skip(self, entry), fields(kind = %self.kind, name = %entry.name))]
    async fn insert(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry, PortError> {
        let row = entry_to_row(entry).map_err(db_to_port_error)?;
        let saved = self.repository.insert(&row).await.map_err(db_to_port_error)?;
        debug!(id = %saved.id, "Directory entry created");
        self.to_entry(saved)
    }

    #[instrument(skip(self, entry), fields(kind = %self.kind, id = %entry.id))]
    async fn update(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry, PortError> {
        let row = entry_to_row(entry).map_err(db_to_port_error)?;
        let saved = self.repository.update(&row).await.map_err(db_to_port_error)?;
        self.to_entry(saved)
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn delete(&self, id: Uuid) -> Result<(), PortError> {
        self.repository.delete(id).await.map_err(db_to_port_error)
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn entry_to_row(entry: &DirectoryEntry) -> Result<DirectoryRow, DatabaseError> {
    let contacts = serde_json::to_value(&entry.contacts)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
    Ok(DirectoryRow {
        id: entry.id,
        name: entry.name.clone(),
        location: entry.location.clone(),
        address: entry.address.clone(),
        region: entry.region.clone(),
        country: entry.country.clone(),
        contacts,
        case_fee: entry.case_fee.map(|fee| fee.amount()),
        coverage: entry.coverage.clone(),
        service_type: entry.service_type.clone(),
        relation: entry.relation.map(|r| match r {
            HospitalRelation::Cash => DbHospitalRelation::Cash,
            HospitalRelation::Cashless => DbHospitalRelation::Cashless,
        }),
        status: match entry.status {
            EntryStatus::Active => DbEntryStatus::Active,
            EntryStatus::Inactive => DbEntryStatus::Inactive,
        },
        created_at: entry.created_at,
        updated_at: entry.updated_at,
    })
}

fn row_to_entry(kind: EntityKind, row: DirectoryRow) -> Result<DirectoryEntry, DatabaseError> {
    let contacts: Contacts = serde_json::from_value(row.contacts)
        .map_err(|e| DatabaseError::SerializationError(format!("contacts of {}: {}", row.id, e)))?;
    Ok(DirectoryEntry {
        id: row.id,
        kind,
        name: row.name,
        location: row.location,
        address: row.address,
        region: row.region,
        country: row.country,
        contacts,
        case_fee: row.case_fee.map(Money::new),
        coverage: row.coverage,
        service_type: row.service_type,
        relation: row.relation.map(|r| match r {
            DbHospitalRelation::Cash => HospitalRelation::Cash,
            DbHospitalRelation::Cashless => HospitalRelation::Cashless,
        }),
        status: match row.status {
            DbEntryStatus::Active => EntryStatus::Active,
            DbEntryStatus::Inactive => EntryStatus::Inactive,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
