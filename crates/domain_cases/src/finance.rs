//! Finance entries: approval-pending snapshots of cases in review

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use core_kernel::{CaseId, FinanceId, Money, UserId};
use domain_directory::{DirectoryEntry, EntityRef};

use crate::actor::{Actor, Role};
use crate::case::Case;
use crate::error::CaseError;

/// Disposition of a finance entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinanceDecision {
    Approve,
    Reject,
}

impl FromStr for FinanceDecision {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(FinanceDecision::Approve),
            "reject" => Ok(FinanceDecision::Reject),
            other => Err(CaseError::validation(format!(
                "Invalid status '{}'. Must be 'approve' or 'reject'",
                other
            ))),
        }
    }
}

/// Snapshot of a case taken when it enters review
///
/// Lives only while the case is in review: approval replaces it with an
/// invoice and rejection deletes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finance {
    pub id: FinanceId,
    pub case_id: CaseId,
    pub case_number: String,
    pub insurer: EntityRef,
    pub insurance: String,
    pub patient_name: String,
    pub claim_amount: Money,
    /// Insurer's fee at the time the case entered review
    pub case_fee: Money,
    pub coverage: Vec<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub remarks: Option<String>,
    pub remark_user: Option<String>,
    pub remark_user_role: Option<Role>,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    /// `None` while pending
    pub status: Option<FinanceDecision>,
    pub created_by_id: UserId,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Finance {
    /// Snapshots a case that is entering review
    ///
    /// Region, country and coverage fall back to the insurer's record when
    /// the case leaves them empty.
    pub fn snapshot(
        case: &Case,
        insurer: &DirectoryEntry,
        actor: &Actor,
        issued_at: DateTime<Utc>,
        due_days: u32,
    ) -> Result<Self, CaseError> {
        let case_fee = insurer.case_fee.ok_or_else(|| {
            CaseError::validation(format!(
                "{} \"{}\" has no caseFee configured",
                insurer.kind.label(),
                insurer.name
            ))
        })?;
        let coverage = if case.coverage.is_empty() {
            insurer.coverage.clone()
        } else {
            case.coverage.clone()
        };

        Ok(Self {
            id: FinanceId::new_v7(),
            case_id: case.id,
            case_number: case.case_number.clone(),
            insurer: case.insurer,
            insurance: insurer.name.clone(),
            patient_name: case.patient_name.clone(),
            claim_amount: case.claim_amount,
            case_fee,
            coverage,
            region: case.region.clone().or_else(|| insurer.region.clone()),
            country: case.country.clone().or_else(|| insurer.country.clone()),
            remarks: case.remarks.clone(),
            remark_user: case.remark_user.clone(),
            remark_user_role: case.remark_user_role,
            issue_date: issued_at,
            due_date: issued_at + Duration::days(i64::from(due_days)),
            status: None,
            created_by_id: actor.id,
            created_by: actor.name.clone(),
            created_at: issued_at,
            updated_at: issued_at,
        })
    }
}
