//! Form helper handlers

use axum::{extract::State, Json};

use domain_directory::DropdownData;

use crate::{error::ApiError, AppState};

/// Id/name pairs of every client, provider and hospital
pub async fn dropdown_data(State(state): State<AppState>) -> Result<Json<DropdownData>, ApiError> {
    Ok(Json(state.directory.dropdown().await?))
}
