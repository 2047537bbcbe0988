//! Invoices: the permanent billable record of an approved case

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CaseId, FinanceId, InvoiceId, Money};

use crate::actor::Actor;
use crate::error::CaseError;
use crate::finance::Finance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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

    /// Parses a status a caller may set; `pending` is only ever the initial state
    pub fn parse_update(s: &str) -> Result<Self, CaseError> {
        match s {
            "paid" => Ok(InvoiceStatus::Paid),
            "unpaid" => Ok(InvoiceStatus::Unpaid),
            other => Err(CaseError::validation(format!(
                "Invalid status '{}'. Must be 'paid' or 'unpaid'",
                other
            ))),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            other => InvoiceStatus::parse_update(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub finance_id: FinanceId,
    pub case_id: CaseId,
    pub case_number: String,
    pub client_name: String,
    pub patient_name: String,
    pub claim_amount: Money,
    pub case_fee: Money,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    /// Set only while the invoice is paid
    pub paid_date: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Bills an approved finance entry
    pub fn from_finance(finance: &Finance, now: DateTime<Utc>) -> Self {
        Self {
            id: InvoiceId::new_v7(),
            finance_id: finance.id,
            case_id: finance.case_id,
            case_number: finance.case_number.clone(),
            client_name: finance.insurance.clone(),
            patient_name: finance.patient_name.clone(),
            claim_amount: finance.claim_amount,
            case_fee: finance.case_fee,
            issue_date: finance.issue_date,
            due_date: finance.due_date,
            status: InvoiceStatus::Pending,
            paid_date: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves between pending/unpaid and paid
    pub fn set_status(&mut self, target: InvoiceStatus, actor: &Actor) -> Result<(), CaseError> {
        if self.status == target {
            return Err(CaseError::conflict(format!("Invoice is already {}", target)));
        }
        let now = Utc::now();
        self.paid_date = match target {
            InvoiceStatus::Paid => Some(now),
            InvoiceStatus::Pending | InvoiceStatus::Unpaid => None,
        };
        self.status = target;
        self.updated_by = Some(actor.name.clone());
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;
    use chrono::Duration;
    use core_kernel::UserId;
    use domain_directory::{EntityKind, EntityRef};
    use rust_decimal_macros::dec;

    fn invoice() -> Invoice {
        let now = Utc::now();
        let finance = Finance {
            id: FinanceId::new_v7(),
            case_id: CaseId::new_v7(),
            case_number: "CMA24-0301".into(),
            insurer: EntityRef::from_parts(EntityKind::Clients, uuid::Uuid::new_v4()),
            insurance: "Acme".into(),
            patient_name: "A".into(),
            claim_amount: Money::new(dec!(1200)),
            case_fee: Money::new(dec!(150)),
            coverage: vec![],
            region: None,
            country: None,
            remarks: None,
            remark_user: None,
            remark_user_role: None,
            issue_date: now,
            due_date: now + Duration::days(30),
            status: None,
            created_by_id: UserId::new(),
            created_by: "Dana".into(),
            created_at: now,
            updated_at: now,
        };
        Invoice::from_finance(&finance, now)
    }

    fn admin() -> Actor {
        Actor::new(UserId::new(), "Root", Role::Admin)
    }

    #[test]
    fn test_invoice_copies_finance_snapshot() {
        let invoice = invoice();
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.claim_amount, Money::new(dec!(1200)));
        assert_eq!(invoice.case_fee, Money::new(dec!(150)));
        assert!(invoice.due_date > invoice.issue_date);
    }

    #[test]
    fn test_paid_stamps_and_unpaid_clears_date() {
        let mut invoice = invoice();
        invoice.set_status(InvoiceStatus::Paid, &admin()).unwrap();
        assert!(invoice.paid_date.is_some());

        invoice.set_status(InvoiceStatus::Unpaid, &admin()).unwrap();
        assert!(invoice.paid_date.is_none());
        assert_eq!(invoice.updated_by.as_deref(), Some("Root"));
    }

    #[test]
    fn test_same_status_is_conflict() {
        let mut invoice = invoice();
        invoice.set_status(InvoiceStatus::Paid, &admin()).unwrap();
        assert!(matches!(
            invoice.set_status(InvoiceStatus::Paid, &admin()),
            Err(CaseError::Conflict(_))
        ));
    }

    #[test]
    fn test_pending_cannot_be_requested() {
        assert!(InvoiceStatus::parse_update("pending").is_err());
        assert!(InvoiceStatus::parse_update("overdue").is_err());
        assert_eq!("pending".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Pending);
    }
}
