//! Case Domain Ports
//!
//! Storage is split by record type ([`CasePort`], [`FinancePort`],
//! [`InvoicePort`]) for reads and simple writes. Every write that must move a
//! case together with its finance or invoice records goes through
//! [`LifecyclePort`], whose methods are each a single atomic commit: the
//! PostgreSQL adapter runs them in one transaction, and the in-memory store
//! applies them under one lock.
//!
//! Case updates inside a commit are guarded by the status the case had when
//! it was read. If another request moved the case in the meantime the commit
//! fails with `PortError::Conflict` and nothing is written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use core_kernel::{
    CaseId, DateRange, DomainPort, FinanceId, HealthCheckable, InvoiceId, IssueId, MonthKey,
    PortError, UserId,
};
use domain_directory::EntityKind;

use crate::case::{Case, CaseStatus};
use crate::finance::Finance;
use crate::invoice::{Invoice, InvoiceStatus};

/// Directory kind used as the grouping key of monthly reports
pub type ReportGroup = EntityKind;

/// Filter for case listings
#[derive(Debug, Clone)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    /// Applied to `createdAt`
    pub range: DateRange,
    /// Restricts to cases created by this user
    pub created_by: Option<UserId>,
}

/// One (group, month) bucket as counted by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyCount {
    pub group: String,
    pub month: MonthKey,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedCountByUser {
    pub created_by_id: UserId,
    pub created_by: String,
    pub count: u64,
}

/// An entry of the issue log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRecord {
    pub id: IssueId,
    pub message: String,
    pub ip: Option<String>,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl IssueRecord {
    pub fn new(message: impl Into<String>, ip: Option<String>, data: serde_json::Value) -> Self {
        Self {
            id: IssueId::new_v7(),
            message: message.into(),
            ip,
            data,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait CasePort: DomainPort + HealthCheckable {
    /// Inserts a new case; a reused insurance reference is `PortError::Conflict`
    async fn insert(&self, case: &Case) -> Result<Case, PortError>;

    async fn get(&self, id: CaseId) -> Result<Case, PortError>;

    async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, PortError>;

    /// Writes the non-workflow fields of a case
    ///
    /// Status, audit and reference columns are left untouched.
    async fn save_details(&self, case: &Case) -> Result<Case, PortError>;

    /// Deletes the case if it still has `status`
    async fn delete(&self, id: CaseId, status: CaseStatus) -> Result<(), PortError>;

    /// Cases per group and calendar month
    ///
    /// The month is taken from `closedAt` when `status` is closed and from
    /// `createdAt` otherwise. Hospitals are grouped by service location name,
    /// clients and providers by insurer name.
    async fn monthly_counts(
        &self,
        status: Option<CaseStatus>,
        group: ReportGroup,
        range: &DateRange,
    ) -> Result<Vec<MonthlyCount>, PortError>;

    /// Closed cases per creator, counted on `closedAt`
    async fn closed_counts_by_user(&self, range: &DateRange) -> Result<Vec<ClosedCountByUser>, PortError>;
}

#[async_trait]
pub trait FinancePort: DomainPort {
    async fn get(&self, id: FinanceId) -> Result<Finance, PortError>;

    async fn find_by_case(&self, case_id: CaseId) -> Result<Option<Finance>, PortError>;

    /// Entries whose `issueDate` falls in the range
    async fn list(&self, range: &DateRange) -> Result<Vec<Finance>, PortError>;
}

#[async_trait]
pub trait InvoicePort: DomainPort {
    async fn get(&self, id: InvoiceId) -> Result<Invoice, PortError>;

    async fn find_by_case(&self, case_id: CaseId) -> Result<Option<Invoice>, PortError>;

    /// Invoices whose `issueDate` falls in the range
    async fn list(&self, range: &DateRange) -> Result<Vec<Invoice>, PortError>;

    /// Writes status, paid date and editor if the stored status is still `expected`
    async fn update_status(&self, invoice: &Invoice, expected: InvoiceStatus) -> Result<Invoice, PortError>;
}

/// Per-month counter behind case numbers
#[async_trait]
pub trait SequencePort: DomainPort {
    /// Increments and returns the counter of the given month, starting at 1
    async fn next_in_month(&self, month: MonthKey) -> Result<u32, PortError>;
}

#[async_trait]
pub trait IssueLogPort: DomainPort {
    async fn record(&self, issue: &IssueRecord) -> Result<(), PortError>;
}

/// Atomic commits of the compound case transitions
#[async_trait]
pub trait LifecyclePort: DomainPort {
    /// open -> in-review: inserts the finance entry and writes the case
    async fn commit_review(&self, case: &Case, finance: &Finance) -> Result<(), PortError>;

    /// in-review -> closed: inserts the invoice, deletes the finance entry, writes the case
    async fn commit_approval(&self, case: &Case, finance_id: FinanceId, invoice: &Invoice) -> Result<(), PortError>;

    /// in-review -> open: deletes the finance entry and writes the case
    async fn commit_rejection(&self, case: &Case, finance_id: FinanceId) -> Result<(), PortError>;
}

/// In-memory store for tests and local runs
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::{AdapterHealth, HealthCheckResult};
    use domain_directory::ActiveCaseCounter;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;
    use uuid::Uuid;

    #[derive(Debug, Default)]
    struct State {
        cases: HashMap<CaseId, Case>,
        finances: HashMap<FinanceId, Finance>,
        invoices: HashMap<InvoiceId, Invoice>,
        sequences: HashMap<MonthKey, u32>,
        issues: Vec<IssueRecord>,
    }

    impl State {
        // The workflow columns a lifecycle commit writes
        fn write_workflow(&mut self, case: &Case, expected: CaseStatus) -> Result<(), PortError> {
            let stored = self
                .cases
                .get_mut(&case.id)
                .ok_or_else(|| PortError::not_found("Case", case.id))?;
            if stored.status != expected {
                return Err(PortError::conflict(format!(
                    "Case {} is no longer {}",
                    case.case_number, expected
                )));
            }
            stored.status = case.status;
            stored.remarks = case.remarks.clone();
            stored.remark_user = case.remark_user.clone();
            stored.remark_user_role = case.remark_user_role;
            stored.approved_by = case.approved_by.clone();
            stored.rejected_by = case.rejected_by.clone();
            stored.closed_at = case.closed_at;
            stored.updated_at = case.updated_at;
            Ok(())
        }

        fn check_workflow(&self, case: &Case, expected: CaseStatus) -> Result<(), PortError> {
            match self.cases.get(&case.id) {
                None => Err(PortError::not_found("Case", case.id)),
                Some(stored) if stored.status != expected => Err(PortError::conflict(format!(
                    "Case {} is no longer {}",
                    case.case_number, expected
                ))),
                Some(_) => Ok(()),
            }
        }
    }

    /// Single-lock store implementing every case-side port
    #[derive(Debug, Default)]
    pub struct InMemoryCaseStore {
        state: RwLock<State>,
        fail_commits: AtomicBool,
    }

    impl InMemoryCaseStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every lifecycle commit fail with a connection error
        pub fn fail_commits(&self, fail: bool) {
            self.fail_commits.store(fail, Ordering::SeqCst);
        }

        pub async fn finance_count(&self) -> usize {
            self.state.read().await.finances.len()
        }

        pub async fn invoice_count(&self) -> usize {
            self.state.read().await.invoices.len()
        }

        pub async fn issues(&self) -> Vec<IssueRecord> {
            self.state.read().await.issues.clone()
        }

        /// Removes a case without touching its finance entry
        pub async fn remove_case_unchecked(&self, id: CaseId) {
            self.state.write().await.cases.remove(&id);
        }

        fn check_available(&self) -> Result<(), PortError> {
            if self.fail_commits.load(Ordering::SeqCst) {
                return Err(PortError::connection("in-memory store unavailable"));
            }
            Ok(())
        }
    }

    impl DomainPort for InMemoryCaseStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryCaseStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "memory-cases".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: None,
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl CasePort for InMemoryCaseStore {
        async fn insert(&self, case: &Case) -> Result<Case, PortError> {
            let mut state = self.state.write().await;
            if let Some(reference) = &case.insurance_reference {
                if state
                    .cases
                    .values()
                    .any(|c| c.insurance_reference.as_ref() == Some(reference))
                {
                    return Err(PortError::conflict_field(
                        format!("InsuranceReference \"{}\" is already in use.", reference),
                        "insuranceReference",
                    ));
                }
            }
            state.cases.insert(case.id, case.clone());
            Ok(case.clone())
        }

        async fn get(&self, id: CaseId) -> Result<Case, PortError> {
            self.state
                .read()
                .await
                .cases
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Case", id))
        }

        async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, PortError> {
            let state = self.state.read().await;
            let mut cases: Vec<Case> = state
                .cases
                .values()
                .filter(|c| filter.status.map_or(true, |s| c.status == s))
                .filter(|c| filter.created_by.map_or(true, |u| c.created_by_id == u))
                .filter(|c| filter.range.contains(c.created_at))
                .cloned()
                .collect();
            cases.sort_by_key(|c| c.created_at);
            Ok(cases)
        }

        async fn save_details(&self, case: &Case) -> Result<Case, PortError> {
            let mut state = self.state.write().await;
            if let Some(reference) = &case.insurance_reference {
                if state
                    .cases
                    .values()
                    .any(|c| c.id != case.id && c.insurance_reference.as_ref() == Some(reference))
                {
                    return Err(PortError::conflict_field(
                        format!("InsuranceReference \"{}\" is already in use.", reference),
                        "insuranceReference",
                    ));
                }
            }
            let stored = state
                .cases
                .get_mut(&case.id)
                .ok_or_else(|| PortError::not_found("Case", case.id))?;
            let mut updated = case.clone();
            updated.status = stored.status;
            updated.approved_by = stored.approved_by.clone();
            updated.rejected_by = stored.rejected_by.clone();
            updated.closed_at = stored.closed_at;
            *stored = updated.clone();
            Ok(updated)
        }

        async fn delete(&self, id: CaseId, status: CaseStatus) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            match state.cases.get(&id) {
                None => Err(PortError::not_found("Case", id)),
                Some(c) if c.status != status => {
                    Err(PortError::conflict(format!("Case {} is no longer {}", c.case_number, status)))
                }
                Some(_) => {
                    state.cases.remove(&id);
                    Ok(())
                }
            }
        }

        async fn monthly_counts(
            &self,
            status: Option<CaseStatus>,
            group: ReportGroup,
            range: &DateRange,
        ) -> Result<Vec<MonthlyCount>, PortError> {
            let state = self.state.read().await;
            let mut buckets: BTreeMap<(String, MonthKey), u64> = BTreeMap::new();
            for case in state.cases.values() {
                if status.is_some_and(|s| case.status != s) {
                    continue;
                }
                let at = if status == Some(CaseStatus::Closed) {
                    match case.closed_at {
                        Some(at) => at,
                        None => continue,
                    }
                } else {
                    case.created_at
                };
                if !range.contains(at) {
                    continue;
                }
                let name = match group {
                    EntityKind::Hospitals => &case.hospital,
                    kind if case.insurer.kind() == kind => &case.insurance,
                    _ => continue,
                };
                *buckets.entry((name.clone(), MonthKey::of(at))).or_default() += 1;
            }
            Ok(buckets
                .into_iter()
                .map(|((group, month), count)| MonthlyCount { group, month, count })
                .collect())
        }

        async fn closed_counts_by_user(&self, range: &DateRange) -> Result<Vec<ClosedCountByUser>, PortError> {
            let state = self.state.read().await;
            let mut counts: HashMap<UserId, ClosedCountByUser> = HashMap::new();
            for case in state.cases.values() {
                let closed_in_range = case.status == CaseStatus::Closed
                    && case.closed_at.is_some_and(|at| range.contains(at));
                if !closed_in_range {
                    continue;
                }
                counts
                    .entry(case.created_by_id)
                    .or_insert_with(|| ClosedCountByUser {
                        created_by_id: case.created_by_id,
                        created_by: case.created_by.clone(),
                        count: 0,
                    })
                    .count += 1;
            }
            let mut counts: Vec<_> = counts.into_values().collect();
            counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.created_by.cmp(&b.created_by)));
            Ok(counts)
        }
    }

    #[async_trait]
    impl ActiveCaseCounter for InMemoryCaseStore {
        async fn active_case_counts(
            &self,
            kind: EntityKind,
            ids: &[Uuid],
        ) -> Result<HashMap<Uuid, u64>, PortError> {
            let state = self.state.read().await;
            let mut counts = HashMap::new();
            for case in state.cases.values().filter(|c| c.is_active()) {
                let id = match kind {
                    EntityKind::Hospitals => case.hospital_id,
                    kind if case.insurer.kind() == kind => case.insurer.id(),
                    _ => continue,
                };
                if ids.contains(&id) {
                    *counts.entry(id).or_insert(0) += 1;
                }
            }
            Ok(counts)
        }
    }

    #[async_trait]
    impl FinancePort for InMemoryCaseStore {
        async fn get(&self, id: FinanceId) -> Result<Finance, PortError> {
            self.state
                .read()
                .await
                .finances
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Finance entry", id))
        }

        async fn find_by_case(&self, case_id: CaseId) -> Result<Option<Finance>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .finances
                .values()
                .find(|f| f.case_id == case_id)
                .cloned())
        }

        async fn list(&self, range: &DateRange) -> Result<Vec<Finance>, PortError> {
            let mut finances: Vec<_> = self
                .state
                .read()
                .await
                .finances
                .values()
                .filter(|f| range.contains(f.issue_date))
                .cloned()
                .collect();
            finances.sort_by_key(|f| f.issue_date);
            Ok(finances)
        }
    }

    #[async_trait]
    impl InvoicePort for InMemoryCaseStore {
        async fn get(&self, id: InvoiceId) -> Result<Invoice, PortError> {
            self.state
                .read()
                .await
                .invoices
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        async fn find_by_case(&self, case_id: CaseId) -> Result<Option<Invoice>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .invoices
                .values()
                .find(|i| i.case_id == case_id)
                .cloned())
        }

        async fn list(&self, range: &DateRange) -> Result<Vec<Invoice>, PortError> {
            let mut invoices: Vec<_> = self
                .state
                .read()
                .await
                .invoices
                .values()
                .filter(|i| range.contains(i.issue_date))
                .cloned()
                .collect();
            invoices.sort_by_key(|i| i.issue_date);
            Ok(invoices)
        }

        async fn update_status(&self, invoice: &Invoice, expected: InvoiceStatus) -> Result<Invoice, PortError> {
            let mut state = self.state.write().await;
            let stored = state
                .invoices
                .get_mut(&invoice.id)
                .ok_or_else(|| PortError::not_found("Invoice", invoice.id))?;
            if stored.status != expected {
                return Err(PortError::conflict(format!("Invoice is no longer {}", expected)));
            }
            stored.status = invoice.status;
            stored.paid_date = invoice.paid_date;
            stored.updated_by = invoice.updated_by.clone();
            stored.updated_at = invoice.updated_at;
            Ok(stored.clone())
        }
    }

    #[async_trait]
    impl SequencePort for InMemoryCaseStore {
        async fn next_in_month(&self, month: MonthKey) -> Result<u32, PortError> {
            let mut state = self.state.write().await;
            let seq = state.sequences.entry(month).or_insert(0);
            *seq += 1;
            Ok(*seq)
        }
    }

    #[async_trait]
    impl IssueLogPort for InMemoryCaseStore {
        async fn record(&self, issue: &IssueRecord) -> Result<(), PortError> {
            self.state.write().await.issues.push(issue.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl LifecyclePort for InMemoryCaseStore {
        async fn commit_review(&self, case: &Case, finance: &Finance) -> Result<(), PortError> {
            self.check_available()?;
            let mut state = self.state.write().await;
            state.check_workflow(case, CaseStatus::Open)?;
            if state.finances.values().any(|f| f.case_id == case.id) {
                return Err(PortError::conflict_field(
                    format!("Case \"{}\" is already in use.", case.case_number),
                    "case",
                ));
            }
            state.write_workflow(case, CaseStatus::Open)?;
            state.finances.insert(finance.id, finance.clone());
            Ok(())
        }

        async fn commit_approval(&self, case: &Case, finance_id: FinanceId, invoice: &Invoice) -> Result<(), PortError> {
            self.check_available()?;
            let mut state = self.state.write().await;
            if !state.finances.contains_key(&finance_id) {
                return Err(PortError::not_found("Finance entry", finance_id));
            }
            state.check_workflow(case, CaseStatus::InReview)?;
            state.write_workflow(case, CaseStatus::InReview)?;
            state.finances.remove(&finance_id);
            state.invoices.insert(invoice.id, invoice.clone());
            Ok(())
        }

        async fn commit_rejection(&self, case: &Case, finance_id: FinanceId) -> Result<(), PortError> {
            self.check_available()?;
            let mut state = self.state.write().await;
            if !state.finances.contains_key(&finance_id) {
                return Err(PortError::not_found("Finance entry", finance_id));
            }
            state.check_workflow(case, CaseStatus::InReview)?;
            state.write_workflow(case, CaseStatus::InReview)?;
            state.finances.remove(&finance_id);
            Ok(())
        }
    }
}
