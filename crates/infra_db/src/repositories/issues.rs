//! Issue log repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct IssueRepository {
    pool: PgPool,
}

impl IssueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &IssueRow) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO issue_log (issue_id, message, ip, data, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row.issue_id)
        .bind(&row.message)
        .bind(&row.ip)
        .bind(&row.data)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent entries first
    pub async fn recent(&self, limit: i64) -> Result<Vec<IssueRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, IssueRow>(
            "SELECT issue_id, message, ip, data, created_at FROM issue_log \
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssueRow {
    pub issue_id: Uuid,
    pub message: String,
    pub ip: Option<String>,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
