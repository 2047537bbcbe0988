//! PostgreSQL Case Adapter
//!
//! A single adapter serves every case-side port: cases, finance entries,
//! invoices, case number sequences, the issue log, the lifecycle commits and
//! the active-case counter used by the directory.
//!
//! # Lifecycle commits
//!
//! | Commit | Statements (one transaction) |
//! |---|---|
//! | review | guarded case update (open), insert finance |
//! | approval | guarded case update (in-review), delete finance, insert invoice |
//! | rejection | guarded case update (in-review), delete finance |
//!
//! Any failing statement drops the transaction, which rolls it back.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    CaseId, DateRange, DomainPort, FinanceId, HealthCheckResult, HealthCheckable, InvoiceId,
    Money, MonthKey, PortError, UserId,
};
use domain_cases::{
    AuxStatus, Case, CaseFilter, CasePort, CaseStatus, ClosedCountByUser, Finance,
    FinanceDecision, FinancePort, Invoice, InvoicePort, InvoiceStatus, IssueLogPort, IssueRecord,
    LifecyclePort, MonthlyCount, ReportGroup, Role, SequencePort,
};
use domain_directory::{ActiveCaseCounter, EntityKind, EntityRef};

use crate::adapters::{db_to_port_error, ping};
use crate::error::DatabaseError;
use crate::repositories::cases::{
    AuxStatus as DbAuxStatus, CaseRepository, CaseRow, CaseStatus as DbCaseStatus,
    InsuranceType, UserRole,
};
use crate::repositories::finances::{FinanceDecision as DbFinanceDecision, FinanceRepository, FinanceRow};
use crate::repositories::invoices::{InvoiceRepository, InvoiceRow, InvoiceStatus as DbInvoiceStatus};
use crate::repositories::issues::{IssueRepository, IssueRow};
use crate::repositories::sequences::SequenceRepository;

/// PostgreSQL-backed implementation of the case-side ports
#[derive(Debug, Clone)]
pub struct PostgresCaseAdapter {
    cases: CaseRepository,
    finances: FinanceRepository,
    invoices: InvoiceRepository,
    sequences: SequenceRepository,
    issues: IssueRepository,
    pool: PgPool,
}

impl PostgresCaseAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            cases: CaseRepository::new(pool.clone()),
            finances: FinanceRepository::new(pool.clone()),
            invoices: InvoiceRepository::new(pool.clone()),
            sequences: SequenceRepository::new(pool.clone()),
            issues: IssueRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresCaseAdapter {}

#[async_trait]
impl HealthCheckable for PostgresCaseAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-cases").await
    }
}

#[async_trait]
impl CasePort for PostgresCaseAdapter {
    #[instrument(skip(self, case), fields(case_id = %case.id, case_number = %case.case_number))]
    async fn insert(&self, case: &Case) -> Result<Case, PortError> {
        let row = self.cases.insert(&case_to_row(case)).await.map_err(db_to_port_error)?;
        debug!("Case inserted");
        Ok(row_to_case(row))
    }

    #[instrument(skip(self))]
    async fn get(&self, id: CaseId) -> Result<Case, PortError> {
        let row = self.cases.get_by_id(*id.as_uuid()).await.map_err(db_to_port_error)?;
        Ok(row_to_case(row))
    }

    #[instrument(skip(self, filter))]
    async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, PortError> {
        let rows = self
            .cases
            .list(
                filter.status.map(case_status_to_db),
                filter.range.start(),
                filter.range.end(),
                filter.created_by.map(|u| *u.as_uuid()),
            )
            .await
            .map_err(db_to_port_error)?;
        debug!(count = rows.len(), "Listed cases");
        Ok(rows.into_iter().map(row_to_case).collect())
    }

    #[instrument(skip(self, case), fields(case_id = %case.id))]
    async fn save_details(&self, case: &Case) -> Result<Case, PortError> {
        let row = self
            .cases
            .update_details(&case_to_row(case))
            .await
            .map_err(db_to_port_error)?;
        Ok(row_to_case(row))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: CaseId, status: CaseStatus) -> Result<(), PortError> {
        self.cases
            .delete_with_status(*id.as_uuid(), case_status_to_db(status))
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, range))]
    async fn monthly_counts(
        &self,
        status: Option<CaseStatus>,
        group: ReportGroup,
        range: &DateRange,
    ) -> Result<Vec<MonthlyCount>, PortError> {
        let rows = self
            .cases
            .monthly_counts(status.map(case_status_to_db), kind_to_db(group), range.start(), range.end())
            .await
            .map_err(db_to_port_error)?;

        rows.into_iter()
            .map(|row| {
                let month = u32::try_from(row.month)
                    .ok()
                    .and_then(|m| MonthKey::new(row.year, m).ok())
                    .ok_or_else(|| PortError::internal(format!("invalid month {}-{}", row.year, row.month)))?;
                Ok(MonthlyCount {
                    group: row.group_name,
                    month,
                    count: row.count.max(0) as u64,
                })
            })
            .collect()
    }

    #[instrument(skip(self, range))]
    async fn closed_counts_by_user(&self, range: &DateRange) -> Result<Vec<ClosedCountByUser>, PortError> {
        let rows = self
            .cases
            .closed_counts_by_user(range.start(), range.end())
            .await
            .map_err(db_to_port_error)?;
        Ok(rows
            .into_iter()
            .map(|row| ClosedCountByUser {
                created_by_id: UserId::from(row.created_by_id),
                created_by: row.created_by,
                count: row.count.max(0) as u64,
            })
            .collect())
    }
}

#[async_trait]
impl ActiveCaseCounter for PostgresCaseAdapter {
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    async fn active_case_counts(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, PortError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self
            .cases
            .active_counts(kind_to_db(kind), ids)
            .await
            .map_err(db_to_port_error)?;
        Ok(rows.into_iter().map(|(id, count)| (id, count.max(0) as u64)).collect())
    }
}

#[async_trait]
impl FinancePort for PostgresCaseAdapter {
    #[instrument(skip(self))]
    async fn get(&self, id: FinanceId) -> Result<Finance, PortError> {
        let row = self.finances.get_by_id(*id.as_uuid()).await.map_err(db_to_port_error)?;
        Ok(row_to_finance(row))
    }

    async fn find_by_case(&self, case_id: CaseId) -> Result<Option<Finance>, PortError> {
        let row = self
            .finances
            .find_by_case(*case_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        Ok(row.map(row_to_finance))
    }

    #[instrument(skip(self, range))]
    async fn list(&self, range: &DateRange) -> Result<Vec<Finance>, PortError> {
        let rows = self
            .finances
            .list(range.start(), range.end())
            .await
            .map_err(db_to_port_error)?;
        Ok(rows.into_iter().map(row_to_finance).collect())
    }
}

#[async_trait]
impl InvoicePort for PostgresCaseAdapter {
    #[instrument(skip(self))]
    async fn get(&self, id: InvoiceId) -> Result<Invoice, PortError> {
        let row = self.invoices.get_by_id(*id.as_uuid()).await.map_err(db_to_port_error)?;
        Ok(row_to_invoice(row))
    }

    async fn find_by_case(&self, case_id: CaseId) -> Result<Option<Invoice>, PortError> {
        let row = self
            .invoices
            .find_by_case(*case_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        Ok(row.map(row_to_invoice))
    }

    #[instrument(skip(self, range))]
    async fn list(&self, range: &DateRange) -> Result<Vec<Invoice>, PortError> {
        let rows = self
            .invoices
            .list(range.start(), range.end())
            .await
            .map_err(db_to_port_error)?;
        Ok(rows.into_iter().map(row_to_invoice).collect())
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id, to = %invoice.status))]
    async fn update_status(&self, invoice: &Invoice, expected: InvoiceStatus) -> Result<Invoice, PortError> {
        let row = self
            .invoices
            .update_status(&invoice_to_row(invoice), invoice_status_to_db(expected))
            .await
            .map_err(db_to_port_error)?;
        Ok(row_to_invoice(row))
    }
}

#[async_trait]
impl SequencePort for PostgresCaseAdapter {
    #[instrument(skip(self))]
    async fn next_in_month(&self, month: MonthKey) -> Result<u32, PortError> {
        let seq = self
            .sequences
            .next(month.year(), month.month() as i32)
            .await
            .map_err(db_to_port_error)?;
        u32::try_from(seq).map_err(|_| PortError::internal(format!("negative case sequence {}", seq)))
    }
}

#[async_trait]
impl IssueLogPort for PostgresCaseAdapter {
    #[instrument(skip(self, issue), fields(issue_id = %issue.id))]
    async fn record(&self, issue: &IssueRecord) -> Result<(), PortError> {
        let row = IssueRow {
            issue_id: *issue.id.as_uuid(),
            message: issue.message.clone(),
            ip: issue.ip.clone(),
            data: issue.data.clone(),
            created_at: issue.created_at,
        };
        self.issues.insert(&row).await.map_err(db_to_port_error)
    }
}

#[async_trait]
impl LifecyclePort for PostgresCaseAdapter {
    #[instrument(skip(self, case, finance), fields(case_id = %case.id, finance_id = %finance.id))]
    async fn commit_review(&self, case: &Case, finance: &Finance) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_to_port_error(e.into()))?;

        CaseRepository::write_workflow(&mut *tx, &case_to_row(case), DbCaseStatus::Open)
            .await
            .map_err(db_to_port_error)?;
        FinanceRepository::insert(&mut *tx, &finance_to_row(finance))
            .await
            .map_err(db_to_port_error)?;

        tx.commit().await.map_err(|e| db_to_port_error(commit_error(e)))?;
        debug!("Review committed");
        Ok(())
    }

    #[instrument(skip(self, case, invoice), fields(case_id = %case.id, invoice_id = %invoice.id))]
    async fn commit_approval(&self, case: &Case, finance_id: FinanceId, invoice: &Invoice) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_to_port_error(e.into()))?;

        FinanceRepository::delete(&mut *tx, *finance_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        CaseRepository::write_workflow(&mut *tx, &case_to_row(case), DbCaseStatus::InReview)
            .await
            .map_err(db_to_port_error)?;
        InvoiceRepository::insert(&mut *tx, &invoice_to_row(invoice))
            .await
            .map_err(db_to_port_error)?;

        tx.commit().await.map_err(|e| db_to_port_error(commit_error(e)))?;
        debug!("Approval committed");
        Ok(())
    }

    #[instrument(skip(self, case), fields(case_id = %case.id))]
    async fn commit_rejection(&self, case: &Case, finance_id: FinanceId) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_to_port_error(e.into()))?;

        FinanceRepository::delete(&mut *tx, *finance_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        CaseRepository::write_workflow(&mut *tx, &case_to_row(case), DbCaseStatus::InReview)
            .await
            .map_err(db_to_port_error)?;

        tx.commit().await.map_err(|e| db_to_port_error(commit_error(e)))?;
        debug!("Rejection committed");
        Ok(())
    }
}

fn commit_error(e: sqlx::Error) -> DatabaseError {
    match DatabaseError::from(&e) {
        DatabaseError::QueryFailed(msg) => DatabaseError::TransactionFailed(msg),
        other => other,
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn kind_to_db(kind: EntityKind) -> InsuranceType {
    match kind {
        EntityKind::Clients => InsuranceType::Clients,
        EntityKind::Providers => InsuranceType::Providers,
        EntityKind::Hospitals => InsuranceType::Hospitals,
    }
}

fn kind_from_db(kind: InsuranceType) -> EntityKind {
    match kind {
        InsuranceType::Clients => EntityKind::Clients,
        InsuranceType::Providers => EntityKind::Providers,
        InsuranceType::Hospitals => EntityKind::Hospitals,
    }
}

fn case_status_to_db(status: CaseStatus) -> DbCaseStatus {
    match status {
        CaseStatus::Open => DbCaseStatus::Open,
        CaseStatus::InReview => DbCaseStatus::InReview,
        CaseStatus::Closed => DbCaseStatus::Closed,
    }
}

fn case_status_from_db(status: DbCaseStatus) -> CaseStatus {
    match status {
        DbCaseStatus::Open => CaseStatus::Open,
        DbCaseStatus::InReview => CaseStatus::InReview,
        DbCaseStatus::Closed => CaseStatus::Closed,
    }
}

fn aux_to_db(status: AuxStatus) -> DbAuxStatus {
    match status {
        AuxStatus::Pending => DbAuxStatus::Pending,
        AuxStatus::Completed => DbAuxStatus::Completed,
    }
}

fn aux_from_db(status: DbAuxStatus) -> AuxStatus {
    match status {
        DbAuxStatus::Pending => AuxStatus::Pending,
        DbAuxStatus::Completed => AuxStatus::Completed,
    }
}

fn role_to_db(role: Role) -> UserRole {
    match role {
        Role::Admin => UserRole::Admin,
        Role::Employee => UserRole::Employee,
    }
}

fn role_from_db(role: UserRole) -> Role {
    match role {
        UserRole::Admin => Role::Admin,
        UserRole::Employee => Role::Employee,
    }
}

fn invoice_status_to_db(status: InvoiceStatus) -> DbInvoiceStatus {
    match status {
        InvoiceStatus::Pending => DbInvoiceStatus::Pending,
        InvoiceStatus::Paid => DbInvoiceStatus::Paid,
        InvoiceStatus::Unpaid => DbInvoiceStatus::Unpaid,
    }
}

fn invoice_status_from_db(status: DbInvoiceStatus) -> InvoiceStatus {
    match status {
        DbInvoiceStatus::Pending => InvoiceStatus::Pending,
        DbInvoiceStatus::Paid => InvoiceStatus::Paid,
        DbInvoiceStatus::Unpaid => InvoiceStatus::Unpaid,
    }
}

fn case_to_row(case: &Case) -> CaseRow {
    CaseRow {
        case_id: *case.id.as_uuid(),
        case_number: case.case_number.clone(),
        insurance_reference: case.insurance_reference.clone(),
        insurance_type: kind_to_db(case.insurer.kind()),
        insurance_id: case.insurer.id(),
        insurance: case.insurance.clone(),
        hospital_id: case.hospital_id,
        hospital: case.hospital.clone(),
        patient_name: case.patient_name.clone(),
        claim_amount: case.claim_amount.amount(),
        service_type: case.service_type.clone(),
        coverage: case.coverage.clone(),
        assistance_date: case.assistance_date,
        region: case.region.clone(),
        country: case.country.clone(),
        address: case.address.clone(),
        status: case_status_to_db(case.status),
        invoice_status: aux_to_db(case.invoice_status),
        mr_status: aux_to_db(case.mr_status),
        remarks: case.remarks.clone(),
        remark_user: case.remark_user.clone(),
        remark_user_role: case.remark_user_role.map(role_to_db),
        created_by_id: *case.created_by_id.as_uuid(),
        created_by: case.created_by.clone(),
        approved_by: case.approved_by.clone(),
        rejected_by: case.rejected_by.clone(),
        created_at: case.created_at,
        updated_at: case.updated_at,
        closed_at: case.closed_at,
    }
}

fn row_to_case(row: CaseRow) -> Case {
    Case {
        id: CaseId::from(row.case_id),
        case_number: row.case_number,
        insurance_reference: row.insurance_reference,
        insurer: EntityRef::from_parts(kind_from_db(row.insurance_type), row.insurance_id),
        insurance: row.insurance,
        hospital_id: row.hospital_id,
        hospital: row.hospital,
        patient_name: row.patient_name,
        claim_amount: Money::new(row.claim_amount),
        service_type: row.service_type,
        coverage: row.coverage,
        assistance_date: row.assistance_date,
        region: row.region,
        country: row.country,
        address: row.address,
        status: case_status_from_db(row.status),
        invoice_status: aux_from_db(row.invoice_status),
        mr_status: aux_from_db(row.mr_status),
        remarks: row.remarks,
        remark_user: row.remark_user,
        remark_user_role: row.remark_user_role.map(role_from_db),
        created_by_id: UserId::from(row.created_by_id),
        created_by: row.created_by,
        approved_by: row.approved_by,
        rejected_by: row.rejected_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
        closed_at: row.closed_at,
    }
}

fn finance_to_row(finance: &Finance) -> FinanceRow {
    FinanceRow {
        finance_id: *finance.id.as_uuid(),
        case_id: *finance.case_id.as_uuid(),
        case_number: finance.case_number.clone(),
        insurance_type: kind_to_db(finance.insurer.kind()),
        insurance_id: finance.insurer.id(),
        insurance: finance.insurance.clone(),
        patient_name: finance.patient_name.clone(),
        claim_amount: finance.claim_amount.amount(),
        case_fee: finance.case_fee.amount(),
        coverage: finance.coverage.clone(),
        region: finance.region.clone(),
        country: finance.country.clone(),
        remarks: finance.remarks.clone(),
        remark_user: finance.remark_user.clone(),
        remark_user_role: finance.remark_user_role.map(role_to_db),
        issue_date: finance.issue_date,
        due_date: finance.due_date,
        status: finance.status.map(|d| match d {
            FinanceDecision::Approve => DbFinanceDecision::Approve,
            FinanceDecision::Reject => DbFinanceDecision::Reject,
        }),
        created_by_id: *finance.created_by_id.as_uuid(),
        created_by: finance.created_by.clone(),
        created_at: finance.created_at,
        updated_at: finance.updated_at,
    }
}

fn row_to_finance(row: FinanceRow) -> Finance {
    Finance {
        id: FinanceId::from(row.finance_id),
        case_id: CaseId::from(row.case_id),
        case_number: row.case_number,
        insurer: EntityRef::from_parts(kind_from_db(row.insurance_type), row.insurance_id),
        insurance: row.insurance,
        patient_name: row.patient_name,
        claim_amount: Money::new(row.claim_amount),
        case_fee: Money::new(row.case_fee),
        coverage: row.coverage,
        region: row.region,
        country: row.country,
        remarks: row.remarks,
        remark_user: row.remark_user,
        remark_user_role: row.remark_user_role.map(role_from_db),
        issue_date: row.issue_date,
        due_date: row.due_date,
        status: row.status.map(|d| match d {
            DbFinanceDecision::Approve => FinanceDecision::Approve,
            DbFinanceDecision::Reject => FinanceDecision::Reject,
        }),
        created_by_id: UserId::from(row.created_by_id),
        created_by: row.created_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn invoice_to_row(invoice: &Invoice) -> InvoiceRow {
    InvoiceRow {
        invoice_id: *invoice.id.as_uuid(),
        finance_id: *invoice.finance_id.as_uuid(),
        case_id: *invoice.case_id.as_uuid(),
        case_number: invoice.case_number.clone(),
        client_name: invoice.client_name.clone(),
        patient_name: invoice.patient_name.clone(),
        claim_amount: invoice.claim_amount.amount(),
        case_fee: invoice.case_fee.amount(),
        issue_date: invoice.issue_date,
        due_date: invoice.due_date,
        status: invoice_status_to_db(invoice.status),
        paid_date: invoice.paid_date,
        updated_by: invoice.updated_by.clone(),
        created_at: invoice.created_at,
        updated_at: invoice.updated_at,
    }
}

fn row_to_invoice(row: InvoiceRow) -> Invoice {
    Invoice {
        id: InvoiceId::from(row.invoice_id),
        finance_id: FinanceId::from(row.finance_id),
        case_id: CaseId::from(row.case_id),
        case_number: row.case_number,
        client_name: row.client_name,
        patient_name: row.patient_name,
        claim_amount: Money::new(row.claim_amount),
        case_fee: Money::new(row.case_fee),
        issue_date: row.issue_date,
        due_date: row.due_date,
        status: invoice_status_from_db(row.status),
        paid_date: row.paid_date,
        updated_by: row.updated_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_cases::{Actor, NewCase};
    use domain_directory::{DirectoryEntry, NewEntry};
    use rust_decimal_macros::dec;

    fn sample_case() -> Case {
        let insurer = DirectoryEntry::from_new(
            EntityKind::Providers,
            NewEntry {
                name: "Gulf Assist".to_string(),
                region: Some("GCC".to_string()),
                ..Default::default()
            },
        );
        let hospital = DirectoryEntry::from_new(
            EntityKind::Hospitals,
            NewEntry {
                name: "City General".to_string(),
                ..Default::default()
            },
        );
        let valid = NewCase {
            patient_name: Some("Jane Roe".to_string()),
            insurance_type: Some("providers".to_string()),
            insurance_id: Some(insurer.id),
            hospital: Some(hospital.name.clone()),
            hospital_id: Some(hospital.id),
            claim_amount: Some(Money::new(dec!(980.25))),
            coverage: vec!["inpatient".to_string()],
            ..Default::default()
        }
        .validate()
        .unwrap();
        let actor = Actor::new(UserId::new(), "Sam", Role::Employee);
        Case::open(valid, &insurer, &hospital, "CMA25-0701".to_string(), &actor)
    }

    #[test]
    fn test_case_row_round_trip() {
        let case = sample_case();
        let row = case_to_row(&case);
        assert_eq!(row.insurance_type, InsuranceType::Providers);
        assert_eq!(row.claim_amount, dec!(980.25));
        assert_eq!(row.status, DbCaseStatus::Open);
        assert_eq!(row_to_case(row), case);
    }

    #[test]
    fn test_kind_mapping_is_bijective() {
        for kind in EntityKind::ALL {
            assert_eq!(kind_from_db(kind_to_db(kind)), kind);
        }
    }

    #[test]
    fn test_invoice_status_mapping() {
        for status in [InvoiceStatus::Pending, InvoiceStatus::Paid, InvoiceStatus::Unpaid] {
            assert_eq!(invoice_status_from_db(invoice_status_to_db(status)), status);
        }
    }
}
