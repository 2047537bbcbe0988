//! Finance handlers

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use core_kernel::FinanceId;
use domain_cases::{Actor, Finance, FinanceOutcome};

use crate::dto::lifecycle::FinanceStatusRequest;
use crate::dto::RangeQuery;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::ClientContext;
use crate::{error::ApiError, AppState};

/// Finance entries issued in the window
pub async fn list_finances(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<Json<Vec<Finance>>, ApiError> {
    let range = query.resolve(Utc::now())?;
    Ok(Json(state.lifecycle.list_finances(range).await?))
}

pub async fn get_finance(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Finance>, ApiError> {
    Ok(Json(state.lifecycle.get_finance(FinanceId::from_uuid(id)).await?))
}

/// Approves or rejects a pending finance entry (admin only)
pub async fn update_finance_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ClientContext(ctx): ClientContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<FinanceStatusRequest>,
) -> Result<Json<FinanceOutcome>, ApiError> {
    let decision = request.decision()?;
    let outcome = state
        .lifecycle
        .update_finance_status(FinanceId::from_uuid(id), decision, request.remark, &actor, &ctx)
        .await?;
    Ok(Json(outcome))
}
