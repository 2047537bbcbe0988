//! Invoice repository implementation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

macro_rules! invoice_columns {
    () => {
        "invoice_id, finance_id, case_id, case_number, client_name, patient_name, \
         claim_amount, case_fee, issue_date, due_date, status, paid_date, updated_by, \
         created_at, updated_at"
    };
}

/// Repository for the `invoices` table
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, invoice_id: Uuid) -> Result<InvoiceRow, DatabaseError> {
        sqlx::query_as::<_, InvoiceRow>(concat!(
            "SELECT ",
            invoice_columns!(),
            " FROM invoices WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Invoice", invoice_id))
    }

    pub async fn find_by_case(&self, case_id: Uuid) -> Result<Option<InvoiceRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, InvoiceRow>(concat!(
            "SELECT ",
            invoice_columns!(),
            " FROM invoices WHERE case_id = $1"
        ))
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Invoices issued within `[start, end]`, oldest first
    pub async fn list(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<InvoiceRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, InvoiceRow>(concat!(
            "SELECT ",
            invoice_columns!(),
            " FROM invoices WHERE issue_date BETWEEN $1 AND $2 ORDER BY issue_date"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn insert(conn: &mut PgConnection, row: &InvoiceRow) -> Result<(), DatabaseError> {
        sqlx::query(concat!(
            "INSERT INTO invoices (",
            invoice_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(row.invoice_id)
        .bind(row.finance_id)
        .bind(row.case_id)
        .bind(&row.case_number)
        .bind(&row.client_name)
        .bind(&row.patient_name)
        .bind(row.claim_amount)
        .bind(row.case_fee)
        .bind(row.issue_date)
        .bind(row.due_date)
        .bind(row.status)
        .bind(row.paid_date)
        .bind(&row.updated_by)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Writes the payment columns if the stored status is still `expected`
    pub async fn update_status(&self, row: &InvoiceRow, expected: InvoiceStatus) -> Result<InvoiceRow, DatabaseError> {
        let updated = sqlx::query_as::<_, InvoiceRow>(concat!(
            "UPDATE invoices SET status = $2, paid_date = $3, updated_by = $4, updated_at = $5 \
             WHERE invoice_id = $1 AND status = $6 \
             RETURNING ",
            invoice_columns!()
        ))
        .bind(row.invoice_id)
        .bind(row.status)
        .bind(row.paid_date)
        .bind(&row.updated_by)
        .bind(row.updated_at)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(invoice) => Ok(invoice),
            None => {
                // Either gone or changed by someone else
                self.get_by_id(row.invoice_id).await?;
                Err(DatabaseError::StaleWrite(format!(
                    "Invoice is no longer {}",
                    expected.as_str()
                )))
            }
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceRow {
    pub invoice_id: Uuid,
    pub finance_id: Uuid,
    pub case_id: Uuid,
    pub case_number: String,
    pub client_name: String,
    pub patient_name: String,
    pub claim_amount: Decimal,
    pub case_fee: Decimal,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    pub paid_date: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Unpaid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Unpaid => "unpaid",
        }
    }
}
