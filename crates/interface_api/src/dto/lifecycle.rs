//! Finance and invoice DTOs

use serde::Deserialize;

use domain_cases::{FinanceDecision, InvoiceStatus};

use crate::error::ApiError;

/// Body of `PUT /finances/:id/status`
#[derive(Debug, Clone, Deserialize)]
pub struct FinanceStatusRequest {
    /// `approve` or `reject`
    pub status: String,
    pub remark: Option<String>,
}

impl FinanceStatusRequest {
    pub fn decision(&self) -> Result<FinanceDecision, ApiError> {
        Ok(self.status.trim().parse()?)
    }
}

/// Body of `PUT /invoices/:id/status`
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceStatusRequest {
    /// `paid` or `unpaid`
    pub status: String,
}

impl InvoiceStatusRequest {
    pub fn target(&self) -> Result<InvoiceStatus, ApiError> {
        Ok(InvoiceStatus::parse_update(self.status.trim())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finance_decision_values() {
        let approve = FinanceStatusRequest {
            status: "approve".to_string(),
            remark: None,
        };
        assert_eq!(approve.decision().unwrap(), FinanceDecision::Approve);

        let bad = FinanceStatusRequest {
            status: "approved".to_string(),
            remark: None,
        };
        assert!(matches!(bad.decision(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_pending_is_not_settable() {
        let pending = InvoiceStatusRequest {
            status: "pending".to_string(),
        };
        assert!(pending.target().is_err());
    }
}
