//! Case repository implementation
//!
//! Plain reads and detail writes go through the pool. The workflow write used
//! by lifecycle commits takes a connection so that it joins the caller's
//! transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

macro_rules! case_columns {
    () => {
        "case_id, case_number, insurance_reference, insurance_type, insurance_id, insurance, \
         hospital_id, hospital, patient_name, claim_amount, service_type, coverage, \
         assistance_date, region, country, address, status, invoice_status, mr_status, \
         remarks, remark_user, remark_user_role, created_by_id, created_by, approved_by, \
         rejected_by, created_at, updated_at, closed_at"
    };
}

/// Repository for the `cases` table
#[derive(Debug, Clone)]
pub struct CaseRepository {
    pool: PgPool,
}

impl CaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &CaseRow) -> Result<CaseRow, DatabaseError> {
        let case = sqlx::query_as::<_, CaseRow>(concat!(
            "INSERT INTO cases (",
            case_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
             $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29) \
             RETURNING ",
            case_columns!()
        ))
        .bind(row.case_id)
        .bind(&row.case_number)
        .bind(&row.insurance_reference)
        .bind(row.insurance_type)
        .bind(row.insurance_id)
        .bind(&row.insurance)
        .bind(row.hospital_id)
        .bind(&row.hospital)
        .bind(&row.patient_name)
        .bind(row.claim_amount)
        .bind(&row.service_type)
        .bind(&row.coverage)
        .bind(row.assistance_date)
        .bind(&row.region)
        .bind(&row.country)
        .bind(&row.address)
        .bind(row.status)
        .bind(row.invoice_status)
        .bind(row.mr_status)
        .bind(&row.remarks)
        .bind(&row.remark_user)
        .bind(row.remark_user_role)
        .bind(row.created_by_id)
        .bind(&row.created_by)
        .bind(&row.approved_by)
        .bind(&row.rejected_by)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.closed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(case)
    }

    pub async fn get_by_id(&self, case_id: Uuid) -> Result<CaseRow, DatabaseError> {
        sqlx::query_as::<_, CaseRow>(concat!(
            "SELECT ",
            case_columns!(),
            " FROM cases WHERE case_id = $1"
        ))
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Case", case_id))
    }

    /// Cases created within `[start, end]`, oldest first
    pub async fn list(
        &self,
        status: Option<CaseStatus>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        created_by: Option<Uuid>,
    ) -> Result<Vec<CaseRow>, DatabaseError> {
        let cases = sqlx::query_as::<_, CaseRow>(concat!(
            "SELECT ",
            case_columns!(),
            " FROM cases \
             WHERE created_at BETWEEN $1 AND $2 \
               AND ($3::case_status IS NULL OR status = $3) \
               AND ($4::uuid IS NULL OR created_by_id = $4) \
             ORDER BY created_at"
        ))
        .bind(start)
        .bind(end)
        .bind(status)
        .bind(created_by)
        .fetch_all(&self.pool)
        .await?;

        Ok(cases)
    }

    /// Writes the editable fields, leaving workflow and reference columns alone
    pub async fn update_details(&self, row: &CaseRow) -> Result<CaseRow, DatabaseError> {
        sqlx::query_as::<_, CaseRow>(concat!(
            "UPDATE cases SET insurance_reference = $2, patient_name = $3, claim_amount = $4, \
             service_type = $5, coverage = $6, assistance_date = $7, region = $8, country = $9, \
             address = $10, invoice_status = $11, mr_status = $12, remarks = $13, \
             remark_user = $14, remark_user_role = $15, updated_at = $16 \
             WHERE case_id = $1 \
             RETURNING ",
            case_columns!()
        ))
        .bind(row.case_id)
        .bind(&row.insurance_reference)
        .bind(&row.patient_name)
        .bind(row.claim_amount)
        .bind(&row.service_type)
        .bind(&row.coverage)
        .bind(row.assistance_date)
        .bind(&row.region)
        .bind(&row.country)
        .bind(&row.address)
        .bind(row.invoice_status)
        .bind(row.mr_status)
        .bind(&row.remarks)
        .bind(&row.remark_user)
        .bind(row.remark_user_role)
        .bind(row.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Case", row.case_id))
    }

    /// Deletes the case only while it still has `status`
    pub async fn delete_with_status(&self, case_id: Uuid, status: CaseStatus) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM cases WHERE case_id = $1 AND status = $2")
            .bind(case_id)
            .bind(status)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Self::explain_guard_miss(&mut *tx, case_id, status).await);
        }
        tx.commit().await?;
        Ok(())
    }

    /// Moves a case to its next workflow state inside the caller's transaction
    ///
    /// Fails with `StaleWrite` if the stored status is no longer `expected`.
    pub async fn write_workflow(
        conn: &mut PgConnection,
        row: &CaseRow,
        expected: CaseStatus,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE cases SET status = $2, remarks = $3, remark_user = $4, remark_user_role = $5, \
             approved_by = $6, rejected_by = $7, closed_at = $8, updated_at = $9 \
             WHERE case_id = $1 AND status = $10",
        )
        .bind(row.case_id)
        .bind(row.status)
        .bind(&row.remarks)
        .bind(&row.remark_user)
        .bind(row.remark_user_role)
        .bind(&row.approved_by)
        .bind(&row.rejected_by)
        .bind(row.closed_at)
        .bind(row.updated_at)
        .bind(expected)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::explain_guard_miss(conn, row.case_id, expected).await);
        }
        Ok(())
    }

    // Distinguishes a vanished row from one that changed status
    async fn explain_guard_miss(conn: &mut PgConnection, case_id: Uuid, expected: CaseStatus) -> DatabaseError {
        let current = sqlx::query_scalar::<_, String>("SELECT case_number FROM cases WHERE case_id = $1")
            .bind(case_id)
            .fetch_optional(&mut *conn)
            .await;
        match current {
            Ok(None) => DatabaseError::not_found("Case", case_id),
            Ok(Some(case_number)) => DatabaseError::StaleWrite(format!(
                "Case {} is no longer {}",
                case_number,
                expected.as_str()
            )),
            Err(e) => e.into(),
        }
    }

    /// Case counts per (group, UTC calendar month)
    ///
    /// Closed cases are dated by `closed_at`, all others by `created_at`.
    /// Hospitals group on the service location name; clients and providers
    /// on the insurer name, restricted to insurers of that type.
    pub async fn monthly_counts(
        &self,
        status: Option<CaseStatus>,
        group: InsuranceType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MonthlyCountRow>, DatabaseError> {
        let date_column = if status == Some(CaseStatus::Closed) { "closed_at" } else { "created_at" };
        let (group_column, insurer_filter) = match group {
            InsuranceType::Hospitals => ("hospital", None),
            other => ("insurance", Some(other)),
        };
        let sql = format!(
            "SELECT {group_column} AS group_name, \
                    EXTRACT(YEAR FROM {date_column} AT TIME ZONE 'UTC')::INT AS year, \
                    EXTRACT(MONTH FROM {date_column} AT TIME ZONE 'UTC')::INT AS month, \
                    COUNT(*) AS count \
             FROM cases \
             WHERE {date_column} BETWEEN $1 AND $2 \
               AND ($3::case_status IS NULL OR status = $3) \
               AND ($4::insurance_type IS NULL OR insurance_type = $4) \
             GROUP BY 1, 2, 3 \
             ORDER BY 1, 2, 3"
        );

        let rows = sqlx::query_as::<_, MonthlyCountRow>(&sql)
            .bind(start)
            .bind(end)
            .bind(status)
            .bind(insurer_filter)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Closed cases per creator, highest count first
    pub async fn closed_counts_by_user(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ClosedCountRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClosedCountRow>(
            "SELECT created_by_id, MIN(created_by) AS created_by, COUNT(*) AS count \
             FROM cases \
             WHERE status = 'closed' AND closed_at BETWEEN $1 AND $2 \
             GROUP BY created_by_id \
             ORDER BY count DESC, created_by ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Open cases per entity id
    pub async fn active_counts(
        &self,
        kind: InsuranceType,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, i64)>, DatabaseError> {
        let query = match kind {
            InsuranceType::Hospitals => sqlx::query_as::<_, (Uuid, i64)>(
                "SELECT hospital_id, COUNT(*) FROM cases \
                 WHERE status = 'open' AND hospital_id = ANY($1) \
                 GROUP BY hospital_id",
            )
            .bind(ids),
            insurer => sqlx::query_as::<_, (Uuid, i64)>(
                "SELECT insurance_id, COUNT(*) FROM cases \
                 WHERE status = 'open' AND insurance_type = $2 AND insurance_id = ANY($1) \
                 GROUP BY insurance_id",
            )
            .bind(ids)
            .bind(insurer),
        };
        Ok(query.fetch_all(&self.pool).await?)
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CaseRow {
    pub case_id: Uuid,
    pub case_number: String,
    pub insurance_reference: Option<String>,
    pub insurance_type: InsuranceType,
    pub insurance_id: Uuid,
    pub insurance: String,
    pub hospital_id: Uuid,
    pub hospital: String,
    pub patient_name: String,
    pub claim_amount: Decimal,
    pub service_type: Option<String>,
    pub coverage: Vec<String>,
    pub assistance_date: Option<NaiveDate>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub status: CaseStatus,
    pub invoice_status: AuxStatus,
    pub mr_status: AuxStatus,
    pub remarks: Option<String>,
    pub remark_user: Option<String>,
    pub remark_user_role: Option<UserRole>,
    pub created_by_id: Uuid,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub rejected_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonthlyCountRow {
    pub group_name: String,
    pub year: i32,
    pub month: i32,
    pub count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClosedCountRow {
    pub created_by_id: Uuid,
    pub created_by: String,
    pub count: i64,
}

// ============================================================================
// Database enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "insurance_type", rename_all = "lowercase")]
pub enum InsuranceType {
    Clients,
    Providers,
    Hospitals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "case_status", rename_all = "kebab-case")]
pub enum CaseStatus {
    Open,
    InReview,
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::InReview => "in-review",
            CaseStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "aux_status", rename_all = "lowercase")]
pub enum AuxStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Employee,
}
