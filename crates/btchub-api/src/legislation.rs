use axum::{Json, extract::State};
use tracing::warn;

use btchub_feeds::UploadError;
use btchub_feeds::legislation::crypto_catalysts;
use btchub_types::api::{AdminUploadRequest, AdminUploadResponse};
use btchub_types::legislation::{CatalystsData, LegislationData};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

pub async fn get_legislation(State(state): State<AppState>) -> Json<LegislationData> {
    Json(state.legislation.data().await)
}

pub async fn refresh(State(state): State<AppState>) -> Json<LegislationData> {
    Json(state.legislation.refresh().await)
}

pub async fn catalysts() -> Json<CatalystsData> {
    Json(crypto_catalysts())
}

/// Replace the served bills with an admin-curated set.
pub async fn admin_upload(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AdminUploadRequest>,
) -> Result<Json<AdminUploadResponse>, ApiError> {
    let data = state
        .legislation
        .admin_upload(&req.password, req.data)
        .map_err(|e| match e {
            UploadError::Disabled | UploadError::WrongPassword => {
                warn!(reason = %e, "rejected legislation upload");
                ApiError::Unauthorized("Unauthorized".into())
            }
            other => ApiError::bad_request(other.to_string()),
        })?;

    Ok(Json(AdminUploadResponse {
        success: true,
        message: format!("Successfully uploaded {} bills", data.bills.len()),
        data,
    }))
}
