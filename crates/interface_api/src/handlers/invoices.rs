//! Invoice handlers

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use core_kernel::InvoiceId;
use domain_cases::{Actor, Invoice};

use crate::dto::lifecycle::InvoiceStatusRequest;
use crate::dto::RangeQuery;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::{error::ApiError, AppState};

pub async fn list_invoices(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
    let range = query.resolve(Utc::now())?;
    Ok(Json(state.lifecycle.list_invoices(range).await?))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Invoice>, ApiError> {
    Ok(Json(state.lifecycle.get_invoice(InvoiceId::from_uuid(id)).await?))
}

/// Marks an invoice paid or unpaid (admin only)
pub async fn update_invoice_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<InvoiceStatusRequest>,
) -> Result<Json<Invoice>, ApiError> {
    let target = request.target()?;
    let invoice = state
        .lifecycle
        .update_invoice_status(InvoiceId::from_uuid(id), target, &actor)
        .await?;
    Ok(Json(invoice))
}
