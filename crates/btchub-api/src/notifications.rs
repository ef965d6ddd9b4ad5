use axum::{
    Json,
    extract::{Path, State},
};

use btchub_types::api::SuccessResponse;
use btchub_types::models::Notification;

use crate::state::AppState;

pub async fn list_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.notifications.filtered_notifications().await)
}

/// Reading a notification dismisses it.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<SuccessResponse> {
    state.notifications.remove(&id);
    Json(SuccessResponse {
        success: true,
        message: "Notification marked as read and removed".into(),
    })
}

pub async fn clear_all(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.notifications.clear_all();
    Json(SuccessResponse {
        success: true,
        message: "All notifications cleared".into(),
    })
}
