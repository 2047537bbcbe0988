//! Directory repository implementation
//!
//! The `clients`, `providers` and `hospitals` tables share one column layout;
//! a repository instance is bound to one of them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const COLUMNS: &str = "id, name, location, address, region, country, contacts, case_fee, \
                       coverage, service_type, relation, status, created_at, updated_at";

/// Repository for one directory table
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
    table: &'static str,
    entity: &'static str,
}

impl DirectoryRepository {
    /// Binds a repository to `table`; `entity` names records in errors
    pub fn new(pool: PgPool, table: &'static str, entity: &'static str) -> Self {
        Self { pool, table, entity }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<DirectoryRow, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", self.table);
        sqlx::query_as::<_, DirectoryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(self.entity, id))
    }

    /// Exact name match
    pub async fn find_by_name(&self, name: &str) -> Result<Option<DirectoryRow>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE name = $1", self.table);
        Ok(sqlx::query_as::<_, DirectoryRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list(&self) -> Result<Vec<DirectoryRow>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM {} ORDER BY name", self.table);
        Ok(sqlx::query_as::<_, DirectoryRow>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn insert(&self, row: &DirectoryRow) -> Result<DirectoryRow, DatabaseError> {
        let sql = format!(
            "INSERT INTO {} ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}",
            self.table
        );
        Ok(sqlx::query_as::<_, DirectoryRow>(&sql)
            .bind(row.id)
            .bind(&row.name)
            .bind(&row.location)
            .bind(&row.address)
            .bind(&row.region)
            .bind(&row.country)
            .bind(&row.contacts)
            .bind(row.case_fee)
            .bind(&row.coverage)
            .bind(&row.service_type)
            .bind(row.relation)
            .bind(row.status)
            .bind(row.created_at)
            .bind(row.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Overwrites every mutable column of an existing record
    pub async fn update(&self, row: &DirectoryRow) -> Result<DirectoryRow, DatabaseError> {
        let sql = format!(
            "UPDATE {} SET name = $2, location = $3, address = $4, region = $5, country = $6, \
             contacts = $7, case_fee = $8, coverage = $9, service_type = $10, relation = $11, \
             status = $12, updated_at = $13 \
             WHERE id = $1 \
             RETURNING {COLUMNS}",
            self.table
        );
        sqlx::query_as::<_, DirectoryRow>(&sql)
            .bind(row.id)
            .bind(&row.name)
            .bind(&row.location)
            .bind(&row.address)
            .bind(&row.region)
            .bind(&row.country)
            .bind(&row.contacts)
            .bind(row.case_fee)
            .bind(&row.coverage)
            .bind(&row.service_type)
            .bind(row.relation)
            .bind(row.status)
            .bind(row.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(self.entity, row.id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(self.entity, id));
        }
        Ok(())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DirectoryRow {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub address: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    /// `{primary, secondary}` contact objects
    pub contacts: serde_json::Value,
    pub case_fee: Option<Decimal>,
    pub coverage: Vec<String>,
    pub service_type: Option<String>,
    pub relation: Option<HospitalRelation>,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "entry_status", rename_all = "lowercase")]
pub enum EntryStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "hospital_relation", rename_all = "lowercase")]
pub enum HospitalRelation {
    Cash,
    Cashless,
}
