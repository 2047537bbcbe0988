//! Case lifecycle engine
//!
//! Drives the compound transitions that fan a case out into finance and
//! invoice records:
//!
//! | Operation | Case | Finance | Invoice |
//! |---|---|---|---|
//! | [`CaseLifecycle::close_case`] | open -> in-review | created | |
//! | approve ([`CaseLifecycle::update_finance_status`]) | in-review -> closed | deleted | created |
//! | reject ([`CaseLifecycle::update_finance_status`]) | in-review -> open | deleted | |
//!
//! Each transition prepares the new records in memory, then hands them to a
//! single [`LifecyclePort`] commit. A failed commit leaves every record as it
//! was, and a second approval of the same finance entry fails with NotFound.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use core_kernel::{CaseId, DateRange, FinanceId, InvoiceId};
use domain_directory::Directory;

use crate::actor::Actor;
use crate::case::{Case, CaseStatus};
use crate::error::CaseError;
use crate::finance::{Finance, FinanceDecision};
use crate::invoice::{Invoice, InvoiceStatus};
use crate::ports::{CasePort, FinancePort, InvoicePort, IssueLogPort, IssueRecord, LifecyclePort};
use crate::service::{resolve_insurer, resolve_location};

/// Tunables of the lifecycle engine
#[derive(Debug, Clone, Copy)]
pub struct LifecycleSettings {
    /// Days between a finance entry's issue date and its due date
    pub invoice_due_days: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self { invoice_due_days: 30 }
    }
}

/// Caller details recorded with integrity issues
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip: Option<String>,
}

/// Result of deciding on a finance entry
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum FinanceOutcome {
    Approved { case: Case, invoice: Invoice },
    Rejected { case: Case },
}

#[derive(Clone)]
pub struct CaseLifecycle {
    cases: Arc<dyn CasePort>,
    finances: Arc<dyn FinancePort>,
    invoices: Arc<dyn InvoicePort>,
    commits: Arc<dyn LifecyclePort>,
    issues: Arc<dyn IssueLogPort>,
    directory: Directory,
    settings: LifecycleSettings,
}

impl CaseLifecycle {
    pub fn new(
        cases: Arc<dyn CasePort>,
        finances: Arc<dyn FinancePort>,
        invoices: Arc<dyn InvoicePort>,
        commits: Arc<dyn LifecyclePort>,
        issues: Arc<dyn IssueLogPort>,
        directory: Directory,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            cases,
            finances,
            invoices,
            commits,
            issues,
            directory,
            settings,
        }
    }

    /// open -> in-review, creating the finance entry
    #[instrument(skip(self, remark, actor), fields(actor = %actor.id))]
    pub async fn close_case(
        &self,
        case_id: CaseId,
        remark: Option<String>,
        actor: &Actor,
    ) -> Result<Case, CaseError> {
        let mut case = self.cases.get(case_id).await?;
        if !actor.can_access(case.created_by_id) {
            return Err(CaseError::not_found("Case", case_id));
        }
        let from = case.status;
        if let Err(e) = case.begin_review(remark, actor) {
            warn!(case_id = %case_id, status = %from, "Review refused");
            return Err(e);
        }

        let insurer = resolve_insurer(&self.directory, case.insurer).await?;
        resolve_location(&self.directory, case.hospital_id).await?;
        let finance = Finance::snapshot(&case, &insurer, actor, Utc::now(), self.settings.invoice_due_days)?;

        self.commits.commit_review(&case, &finance).await?;
        info!(
            case_id = %case_id,
            finance_id = %finance.id,
            from = %from,
            to = %case.status,
            actor = %actor.name,
            "Case sent to review"
        );
        Ok(case)
    }

    /// Approves or rejects a pending finance entry
    #[instrument(skip(self, remark, actor, ctx), fields(actor = %actor.id))]
    pub async fn update_finance_status(
        &self,
        finance_id: FinanceId,
        decision: FinanceDecision,
        remark: Option<String>,
        actor: &Actor,
        ctx: &RequestContext,
    ) -> Result<FinanceOutcome, CaseError> {
        if !actor.is_admin() {
            warn!(user = %actor.id, finance_id = %finance_id, "Non-admin attempted finance decision");
            return Err(CaseError::Forbidden("Only admins can approve or reject finance entries".to_string()));
        }

        let finance = self.finances.get(finance_id).await?;
        let mut case = self.parent_case(&finance, ctx).await?;

        match decision {
            FinanceDecision::Approve => {
                case.approve(actor)?;
                let invoice = Invoice::from_finance(&finance, Utc::now());
                self.commits.commit_approval(&case, finance.id, &invoice).await?;
                info!(
                    case_id = %case.id,
                    finance_id = %finance_id,
                    invoice_id = %invoice.id,
                    from = %CaseStatus::InReview,
                    to = %case.status,
                    actor = %actor.name,
                    "Finance approved"
                );
                Ok(FinanceOutcome::Approved { case, invoice })
            }
            FinanceDecision::Reject => {
                case.reject(remark, actor)?;
                self.commits.commit_rejection(&case, finance.id).await?;
                info!(
                    case_id = %case.id,
                    finance_id = %finance_id,
                    from = %CaseStatus::InReview,
                    to = %case.status,
                    actor = %actor.name,
                    "Finance rejected"
                );
                Ok(FinanceOutcome::Rejected { case })
            }
        }
    }

    /// Sets an invoice to paid or unpaid
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn update_invoice_status(
        &self,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
        actor: &Actor,
    ) -> Result<Invoice, CaseError> {
        if !actor.is_admin() {
            warn!(user = %actor.id, invoice_id = %invoice_id, "Non-admin attempted invoice status change");
            return Err(CaseError::Forbidden("Only admins can change invoice status".to_string()));
        }
        if status == InvoiceStatus::Pending {
            return Err(CaseError::validation("Invalid status 'pending'. Must be 'paid' or 'unpaid'"));
        }

        let mut invoice = self.invoices.get(invoice_id).await?;
        let previous = invoice.status;
        invoice.set_status(status, actor)?;
        let saved = self.invoices.update_status(&invoice, previous).await?;
        info!(invoice_id = %invoice_id, from = %previous, to = %saved.status, "Invoice status changed");
        Ok(saved)
    }

    pub async fn list_finances(&self, range: DateRange) -> Result<Vec<Finance>, CaseError> {
        Ok(self.finances.list(&range).await?)
    }

    pub async fn list_invoices(&self, range: DateRange) -> Result<Vec<Invoice>, CaseError> {
        Ok(self.invoices.list(&range).await?)
    }

    pub async fn get_finance(&self, id: FinanceId) -> Result<Finance, CaseError> {
        Ok(self.finances.get(id).await?)
    }

    pub async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, CaseError> {
        Ok(self.invoices.get(id).await?)
    }

    // A finance entry must point at a case that is in review
    async fn parent_case(&self, finance: &Finance, ctx: &RequestContext) -> Result<Case, CaseError> {
        let problem = match self.cases.get(finance.case_id).await {
            Ok(case) if case.status == CaseStatus::InReview => return Ok(case),
            Ok(case) => format!("Finance entry references a case in status {}", case.status),
            Err(e) if e.is_not_found() => "Associated case not found".to_string(),
            Err(e) => return Err(e.into()),
        };

        error!(finance_id = %finance.id, case_id = %finance.case_id, "{}", problem);
        let issue = IssueRecord::new(
            problem.clone(),
            ctx.ip.clone(),
            json!({
                "financeId": finance.id.to_string(),
                "caseId": finance.case_id.to_string(),
                "caseNumber": finance.case_number,
            }),
        );
        if let Err(e) = self.issues.record(&issue).await {
            error!(error = %e, "Failed to write issue log");
        }
        Err(CaseError::Integrity(problem))
    }
}
