use crate::controller::ApiResponse;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use service::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct HealthStatus {
    status: &'static str,
    /// Number of chat streams currently registered with the broadcaster
    subscribers: usize,
}

/// GET the health of the server and its broadcaster
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is up and the broadcaster is accepting messages", body = String),
        (status = 503, description = "Broadcaster has been shut down")
    )
)]
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    let broadcaster = app_state.broadcaster_ref();
    let (status_code, status) = if broadcaster.is_running() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting down")
    };

    (
        status_code,
        Json(ApiResponse::new(
            status_code.into(),
            HealthStatus {
                status,
                subscribers: broadcaster.subscriber_count(),
            },
        )),
    )
}
