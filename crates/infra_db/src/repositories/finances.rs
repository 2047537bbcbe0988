//! Finance repository implementation
//!
//! Finance entries are only created and removed by lifecycle commits, so the
//! write paths take the caller's transaction connection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::repositories::cases::{InsuranceType, UserRole};

macro_rules! finance_columns {
    () => {
        "finance_id, case_id, case_number, insurance_type, insurance_id, insurance, \
         patient_name, claim_amount, case_fee, coverage, region, country, remarks, \
         remark_user, remark_user_role, issue_date, due_date, status, created_by_id, \
         created_by, created_at, updated_at"
    };
}

/// Repository for the `finances` table
#[derive(Debug, Clone)]
pub struct FinanceRepository {
    pool: PgPool,
}

impl FinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, finance_id: Uuid) -> Result<FinanceRow, DatabaseError> {
        sqlx::query_as::<_, FinanceRow>(concat!(
            "SELECT ",
            finance_columns!(),
            " FROM finances WHERE finance_id = $1"
        ))
        .bind(finance_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Finance entry", finance_id))
    }

    pub async fn find_by_case(&self, case_id: Uuid) -> Result<Option<FinanceRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, FinanceRow>(concat!(
            "SELECT ",
            finance_columns!(),
            " FROM finances WHERE case_id = $1"
        ))
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Entries issued within `[start, end]`, oldest first
    pub async fn list(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<FinanceRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, FinanceRow>(concat!(
            "SELECT ",
            finance_columns!(),
            " FROM finances WHERE issue_date BETWEEN $1 AND $2 ORDER BY issue_date"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn insert(conn: &mut PgConnection, row: &FinanceRow) -> Result<(), DatabaseError> {
        sqlx::query(concat!(
            "INSERT INTO finances (",
            finance_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
             $16, $17, $18, $19, $20, $21, $22)"
        ))
        .bind(row.finance_id)
        .bind(row.case_id)
        .bind(&row.case_number)
        .bind(row.insurance_type)
        .bind(row.insurance_id)
        .bind(&row.insurance)
        .bind(&row.patient_name)
        .bind(row.claim_amount)
        .bind(row.case_fee)
        .bind(&row.coverage)
        .bind(&row.region)
        .bind(&row.country)
        .bind(&row.remarks)
        .bind(&row.remark_user)
        .bind(row.remark_user_role)
        .bind(row.issue_date)
        .bind(row.due_date)
        .bind(row.status)
        .bind(row.created_by_id)
        .bind(&row.created_by)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Returns the removed entry, or NotFound if it was already consumed
    pub async fn delete(conn: &mut PgConnection, finance_id: Uuid) -> Result<FinanceRow, DatabaseError> {
        sqlx::query_as::<_, FinanceRow>(concat!(
            "DELETE FROM finances WHERE finance_id = $1 RETURNING ",
            finance_columns!()
        ))
        .bind(finance_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Finance entry", finance_id))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FinanceRow {
    pub finance_id: Uuid,
    pub case_id: Uuid,
    pub case_number: String,
    pub insurance_type: InsuranceType,
    pub insurance_id: Uuid,
    pub insurance: String,
    pub patient_name: String,
    pub claim_amount: Decimal,
    pub case_fee: Decimal,
    pub coverage: Vec<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub remarks: Option<String>,
    pub remark_user: Option<String>,
    pub remark_user_role: Option<UserRole>,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: Option<FinanceDecision>,
    pub created_by_id: Uuid,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "finance_decision", rename_all = "lowercase")]
pub enum FinanceDecision {
    Approve,
    Reject,
}
