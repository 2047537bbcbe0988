//! Case handlers

use axum::{body::Bytes, extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use core_kernel::CaseId;
use domain_cases::{Actor, Case, CasePatch, ClosedCountByUser, MonthlySeries, NewCase};

use crate::dto::cases::{CaseListQuery, InReviewRequest, MonthlyCountsQuery};
use crate::dto::RangeQuery;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::{error::ApiError, AppState};

/// Lists cases created in the window; employees see only their own
pub async fn list_cases(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<CaseListQuery>,
) -> Result<Json<Vec<Case>>, ApiError> {
    let range = query.range.resolve(Utc::now())?;
    let cases = state.cases.list(query.status()?, range, &actor).await?;
    Ok(Json(cases))
}

pub async fn create_case(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(request): ApiJson<NewCase>,
) -> Result<(StatusCode, Json<Case>), ApiError> {
    let case = state.cases.create(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn get_case(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Case>, ApiError> {
    Ok(Json(state.cases.get(CaseId::from_uuid(id), &actor).await?))
}

/// Partial update; the workflow status and references are not editable here
pub async fn update_case(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<CasePatch>,
) -> Result<Json<Case>, ApiError> {
    Ok(Json(state.cases.update(CaseId::from_uuid(id), patch, &actor).await?))
}

pub async fn delete_case(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.cases.delete(CaseId::from_uuid(id), &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Sends an open case to review, creating its finance entry
///
/// The body is optional; when present it must parse.
pub async fn move_to_review(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    body: Bytes,
) -> Result<Json<Case>, ApiError> {
    let remark = InReviewRequest::from_body(&body)?.remark;
    let case = state.lifecycle.close_case(CaseId::from_uuid(id), remark, &actor).await?;
    Ok(Json(case))
}

/// `{ [entityName]: number[] }`, one slot per month of the window
pub async fn monthly_entity_counts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MonthlyCountsQuery>,
) -> Result<Json<MonthlySeries>, ApiError> {
    let range = query.range.resolve(Utc::now())?;
    let series = state
        .reporting
        .monthly_counts_grouped(query.status()?, query.entity_type()?, range)
        .await?;
    Ok(Json(series))
}

pub async fn closed_case_count(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<Json<Vec<ClosedCountByUser>>, ApiError> {
    let range = query.resolve(Utc::now())?;
    Ok(Json(state.reporting.closed_case_counts_by_user(range).await?))
}
