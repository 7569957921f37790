use crate::error::{Error, Result as WebResult};
use crate::params::chat::ChatForm;
use axum::body::Bytes;
use axum::extract::rejection::StringRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use log::*;
use service::AppState;

/// POST a chat line as the raw request body.
///
/// Every listener on `/chat` receives the body verbatim, and every listener on
/// `/htmx/chat` receives it HTML-escaped.
#[utoipa::path(
    post,
    path = "/chat",
    request_body(content = String, content_type = "text/plain"),
    responses(
        (status = 200, description = "Message accepted for broadcast"),
        (status = 400, description = "Body is not valid UTF-8 text"),
        (status = 503, description = "Broadcaster is saturated or shut down")
    )
)]
pub async fn publish(
    State(app_state): State<AppState>,
    body: Result<String, StringRejection>,
) -> WebResult<impl IntoResponse> {
    let chat = body.map_err(|rejection| {
        Error::MalformedRequest(format!("could not read body: {}", rejection.body_text()))
    })?;

    broadcast(&app_state, chat)
}

/// POST a chat line as a URL-form-encoded `chat` field.
#[utoipa::path(
    post,
    path = "/htmx/chat",
    request_body(content = ChatForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Message accepted for broadcast"),
        (status = 400, description = "Body has no `chat` field"),
        (status = 503, description = "Broadcaster is saturated or shut down")
    )
)]
pub async fn publish_form(
    State(app_state): State<AppState>,
    body: Bytes,
) -> WebResult<impl IntoResponse> {
    let form = ChatForm::parse(&body)?;

    broadcast(&app_state, form.chat)
}

fn broadcast(app_state: &AppState, chat: String) -> WebResult<StatusCode> {
    debug!("Publishing chat message: {chat:?}");
    app_state.broadcaster.publish(chat)?;

    Ok(StatusCode::OK)
}
