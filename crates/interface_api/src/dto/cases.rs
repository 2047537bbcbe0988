//! Case DTOs

use serde::Deserialize;

use domain_cases::CaseStatus;
use domain_directory::EntityKind;

use crate::dto::common::{non_empty, RangeQuery};
use crate::error::ApiError;

/// `GET /cases?status=&startDate=&endDate=`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseListQuery {
    pub status: Option<String>,
    #[serde(flatten)]
    pub range: RangeQuery,
}

impl CaseListQuery {
    pub fn status(&self) -> Result<Option<CaseStatus>, ApiError> {
        parse_status(&self.status)
    }
}

/// `GET /cases/monthly-entity-counts?entityType=&status=&startDate=&endDate=`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCountsQuery {
    pub entity_type: Option<String>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub range: RangeQuery,
}

impl MonthlyCountsQuery {
    pub fn entity_type(&self) -> Result<EntityKind, ApiError> {
        let raw = non_empty(&self.entity_type)
            .ok_or_else(|| ApiError::Validation("entityType is required".to_string()))?;
        Ok(raw.parse()?)
    }

    pub fn status(&self) -> Result<Option<CaseStatus>, ApiError> {
        parse_status(&self.status)
    }
}

/// Body of `PUT /cases/:id/in-review`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InReviewRequest {
    pub remark: Option<String>,
}

impl InReviewRequest {
    /// An empty body carries no remark; any other body must be valid JSON
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
    }
}

fn parse_status(status: &Option<String>) -> Result<Option<CaseStatus>, ApiError> {
    Ok(non_empty(status).map(str::parse).transpose()?)
}
