//! Client, provider and hospital handlers
//!
//! The three collections share one set of handlers; the router binds each
//! set to its [`EntityKind`].

use axum::{extract::State, http::StatusCode, routing::get, Extension, Json, Router};
use uuid::Uuid;

use domain_cases::Actor;
use domain_directory::{DirectoryEntry, EntityKind, EntryPatch, EntryWithCaseload, NewEntry};

use crate::auth::require_admin;
use crate::extract::{ApiJson, ApiPath};
use crate::{error::ApiError, AppState};

/// Routes of one collection, to be nested under its plural name
pub fn routes(kind: EntityKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |state: State<AppState>| list(state, kind))
                .post(move |state: State<AppState>, body: ApiJson<NewEntry>| create(state, body, kind)),
        )
        .route(
            "/:id",
            get(move |state: State<AppState>, id: ApiPath<Uuid>| fetch(state, id, kind))
                .put(move |state: State<AppState>, id: ApiPath<Uuid>, body: ApiJson<EntryPatch>| {
                    update(state, id, body, kind)
                })
                .delete(
                    move |state: State<AppState>, actor: Extension<Actor>, id: ApiPath<Uuid>| {
                        remove(state, actor, id, kind)
                    },
                ),
        )
}

/// Every record with its number of open cases
pub async fn list(State(state): State<AppState>, kind: EntityKind) -> Result<Json<Vec<EntryWithCaseload>>, ApiError> {
    Ok(Json(state.directory.list(kind).await?))
}

pub async fn fetch(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    kind: EntityKind,
) -> Result<Json<DirectoryEntry>, ApiError> {
    Ok(Json(state.directory.get(kind, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewEntry>,
    kind: EntityKind,
) -> Result<(StatusCode, Json<DirectoryEntry>), ApiError> {
    let entry = state.directory.create(kind, request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<EntryPatch>,
    kind: EntityKind,
) -> Result<Json<DirectoryEntry>, ApiError> {
    Ok(Json(state.directory.update(kind, id, patch).await?))
}

/// Admin only; refused while the record has open cases
pub async fn remove(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    kind: EntityKind,
) -> Result<StatusCode, ApiError> {
    require_admin(&actor, &format!("delete {}", kind))?;
    state.directory.delete(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
