use crate::sse::flavor::Flavor;
use async_stream::stream;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use log::*;
use service::AppState;
use std::convert::Infallible;
use std::time::Duration;

/// GET a live stream of chat messages, one unnamed event per message
#[utoipa::path(
    get,
    path = "/chat",
    responses(
        (status = 200, description = "Event stream of chat messages, data is the raw message text", content_type = "text/event-stream", body = String),
    )
)]
pub(crate) async fn chat_stream(
    State(app_state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    stream_messages(app_state, Flavor::Plain)
}

/// GET a live stream of chat messages framed for the htmx SSE extension
#[utoipa::path(
    get,
    path = "/htmx/chat",
    responses(
        (status = 200, description = "Event stream of `chat` events, data is the HTML-escaped message wrapped in <p>", content_type = "text/event-stream", body = String),
    )
)]
pub(crate) async fn htmx_chat_stream(
    State(app_state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    stream_messages(app_state, Flavor::Htmx)
}

/// Establishes a long-lived stream for one listener.
///
/// The subscription is registered before the response is returned, so the client
/// sees every message published after its request was handled. When the client
/// disconnects, axum drops the stream and the subscription with it, which
/// unregisters the listener.
fn stream_messages(
    app_state: AppState,
    flavor: Flavor,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = app_state.broadcaster.subscribe();
    let subscriber_id = subscription.id().clone();
    info!(
        "Opened {} chat stream {} ({} active)",
        flavor.name(),
        subscriber_id,
        app_state.broadcaster.subscriber_count()
    );

    let stream = stream! {
        while let Some(message) = subscription.recv().await {
            yield Ok::<_, Infallible>(flavor.event(&message));
        }

        // Only reached when the broadcaster closes the subscription
        debug!("Chat stream {subscriber_id} closed by the broadcaster");
    };

    let keep_alive_interval = Duration::from_secs(app_state.config.keep_alive_interval_secs.max(1));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive_interval))
}
