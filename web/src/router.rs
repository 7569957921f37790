use crate::controller::{chat_controller, health_check_controller};
use crate::params::chat::ChatForm;
use crate::sse::handler;
use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use log::*;
use service::config::Config;
use service::AppState;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Chatroom API"
        ),
        paths(
            chat_controller::publish,
            chat_controller::publish_form,
            handler::chat_stream,
            handler::htmx_chat_stream,
            health_check_controller::health_check,
        ),
        components(
            schemas(ChatForm)
        ),
        tags(
            (name = "chatroom", description = "Real-time chat fan-out over Server-Sent Events")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config);
    let index_file = app_state.config.index_file().to_path_buf();

    Router::new()
        .merge(chat_routes(app_state.clone()))
        .merge(htmx_chat_routes(app_state.clone()))
        .merge(health_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .merge(static_routes(index_file))
        .layer(cors)
}

/// Plain flavor: raw text bodies in, raw text events out
fn chat_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/chat",
            get(handler::chat_stream).post(chat_controller::publish),
        )
        .with_state(app_state)
}

/// Htmx flavor: form-encoded bodies in, named HTML fragment events out
fn htmx_chat_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/htmx/chat",
            get(handler::htmx_chat_stream).post(chat_controller::publish_form),
        )
        .with_state(app_state)
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

// Serves the chat page that drives both flavors from a browser
fn static_routes(index_file: PathBuf) -> Router {
    Router::new().route_service("/", ServeFile::new(index_file))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use clap::Parser;
    use http_body_util::BodyExt;
    use ::sse::{BroadcastOptions, Broadcaster};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tower::ServiceExt;

    const WAIT: Duration = Duration::from_secs(5);

    fn test_config(args: &[&str]) -> Config {
        let index_file = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../assets/index.html");
        Config::try_parse_from(std::iter::once("chatroom").chain(args.iter().copied()))
            .unwrap()
            .set_index_file(index_file)
    }

    fn test_app(args: &[&str]) -> (Router, Arc<Broadcaster>) {
        let config = test_config(args);
        let broadcaster = Arc::new(Broadcaster::spawn(BroadcastOptions::default()));
        let app_state = AppState::new(config, &broadcaster);
        (define_routes(app_state), broadcaster)
    }

    async fn open_stream(app: &Router, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        response
    }

    async fn post(app: &Router, uri: &str, content_type: &str, body: &'static str) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    async fn next_event(body: &mut Body) -> String {
        loop {
            let frame = timeout(WAIT, body.frame())
                .await
                .expect("timed out waiting for an event")
                .expect("stream ended")
                .unwrap();
            if let Ok(data) = frame.into_data() {
                return String::from_utf8(data.to_vec()).unwrap();
            }
        }
    }

    async fn read_body(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn plain_post_reaches_an_open_plain_stream() {
        let (app, _broadcaster) = test_app(&[]);
        let mut stream = open_stream(&app, "/chat").await.into_body();

        assert_eq!(post(&app, "/chat", "text/plain", "hello").await, StatusCode::OK);

        assert_eq!(next_event(&mut stream).await, "data: hello\n\n");
    }

    #[tokio::test]
    async fn form_post_reaches_an_open_htmx_stream_decoded_and_wrapped() {
        let (app, _broadcaster) = test_app(&[]);
        let mut stream = open_stream(&app, "/htmx/chat").await.into_body();

        let status = post(
            &app,
            "/htmx/chat",
            "application/x-www-form-urlencoded",
            "chat=hi%20there",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let event = next_event(&mut stream).await;
        assert!(event.contains("event: chat\n"), "unexpected event {event:?}");
        assert!(event.contains("data: <p>hi there</p>\n"), "unexpected event {event:?}");
    }

    #[tokio::test]
    async fn both_flavors_share_one_broadcaster() {
        let (app, broadcaster) = test_app(&[]);
        let mut plain = open_stream(&app, "/chat").await.into_body();
        let mut htmx = open_stream(&app, "/htmx/chat").await.into_body();
        assert_eq!(broadcaster.subscriber_count(), 2);

        assert_eq!(post(&app, "/chat", "text/plain", "a < b").await, StatusCode::OK);

        assert_eq!(next_event(&mut plain).await, "data: a < b\n\n");
        assert!(next_event(&mut htmx).await.contains("data: <p>a &lt; b</p>\n"));
    }

    #[tokio::test]
    async fn form_post_without_chat_field_is_rejected_and_not_delivered() {
        let (app, _broadcaster) = test_app(&[]);
        let mut stream = open_stream(&app, "/htmx/chat").await.into_body();

        let status = post(
            &app,
            "/htmx/chat",
            "application/x-www-form-urlencoded",
            "bogus=1",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // The next event on the stream is the following valid message.
        post(&app, "/htmx/chat", "application/x-www-form-urlencoded", "chat=next").await;
        assert!(next_event(&mut stream).await.contains("<p>next</p>"));
    }

    #[tokio::test]
    async fn form_post_does_not_require_a_content_type() {
        let (app, _broadcaster) = test_app(&[]);
        let mut stream = open_stream(&app, "/chat").await.into_body();

        let request = Request::builder()
            .method("POST")
            .uri("/htmx/chat")
            .body(Body::from("chat=no+header"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(next_event(&mut stream).await, "data: no header\n\n");
    }

    #[tokio::test]
    async fn plain_post_with_invalid_utf8_is_rejected() {
        let (app, _broadcaster) = test_app(&[]);
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(vec![0xff, 0xfe, 0xfd]))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_without_listeners_succeeds() {
        let (app, broadcaster) = test_app(&[]);
        assert_eq!(broadcaster.subscriber_count(), 0);

        assert_eq!(post(&app, "/chat", "text/plain", "anyone?").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn dropping_the_response_unregisters_the_listener() {
        let (app, broadcaster) = test_app(&[]);
        let stream = open_stream(&app, "/chat").await;
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(stream);

        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_ends_open_streams_and_rejects_posts() {
        let (app, broadcaster) = test_app(&[]);
        let mut stream = open_stream(&app, "/chat").await.into_body();

        broadcaster.shutdown().await;

        let end = timeout(WAIT, stream.frame()).await.expect("stream did not end");
        assert!(end.is_none());
        assert_eq!(
            post(&app, "/chat", "text/plain", "late").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn health_reports_subscriber_count() {
        let (app, _broadcaster) = test_app(&[]);
        let _stream = open_stream(&app, "/chat").await;

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&read_body(response).await).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "status_code": 200,
                "data": { "status": "healthy", "subscribers": 1 }
            })
        );
    }

    #[tokio::test]
    async fn index_page_is_served_at_the_root() {
        let (app, _broadcaster) = test_app(&[]);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(read_body(response).await.contains("/htmx/chat"));
    }

    #[tokio::test]
    async fn openapi_document_lists_the_chat_endpoints() {
        let (app, _broadcaster) = test_app(&[]);
        let request = Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let document = read_body(response).await;
        assert!(document.contains("\"/chat\""));
        assert!(document.contains("\"/htmx/chat\""));
    }

    #[tokio::test]
    async fn wildcard_origin_is_allowed_by_default() {
        let (app, _broadcaster) = test_app(&[]);
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://elsewhere.example")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn configured_origins_are_echoed_only_when_listed() {
        let (app, _broadcaster) = test_app(&["--allowed-origins", "http://localhost:3000"]);

        let allowed = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(allowed).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );

        let denied = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://elsewhere.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(denied).await.unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
