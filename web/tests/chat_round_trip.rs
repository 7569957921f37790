//! End-to-end tests that run the chat server on a real socket.

use anyhow::{bail, Context, Result};
use event_reader::EventReader;
use clap::Parser;
use service::config::Config;
use service::AppState;
use sse::Broadcaster;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    base_url: String,
    broadcaster: Arc<Broadcaster>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<io::Result<()>>,
}

impl TestServer {
    async fn start() -> Result<Self> {
        let config = Config::try_parse_from(["chatroom"])?;
        let broadcaster = Arc::new(Broadcaster::spawn(config.broadcast_options()));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let (stop, stopped) = oneshot::channel::<()>();
        let shutdown_broadcaster = Arc::clone(&broadcaster);
        let shutdown = async move {
            let _ = stopped.await;
            shutdown_broadcaster.shutdown().await;
        };

        let app_state = AppState::new(config, &broadcaster);
        let handle = tokio::spawn(web::serve(listener, app_state, shutdown));

        Ok(Self {
            base_url,
            broadcaster,
            stop: Some(stop),
            handle,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn stop(mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        timeout(WAIT, self.handle)
            .await
            .context("server did not shut down")???;
        Ok(())
    }
}

/// Minimal SSE reader over a streaming reqwest response.
mod event_reader {
    use anyhow::{bail, Result};
    use axum::body::Bytes;
    use futures_util::stream::BoxStream;
    use futures_util::StreamExt;

    pub struct EventReader {
        chunks: BoxStream<'static, reqwest::Result<Bytes>>,
        buffer: String,
    }

    impl EventReader {
        pub fn new(response: reqwest::Response) -> Self {
            Self {
                chunks: response.bytes_stream().boxed(),
                buffer: String::new(),
            }
        }

        /// Returns the next complete event, skipping keep-alive comments.
        pub async fn next_event(&mut self) -> Result<String> {
            loop {
                if let Some(end) = self.buffer.find("\n\n") {
                    let event: String = self.buffer.drain(..end + 2).collect();
                    if event.starts_with(':') {
                        continue;
                    }
                    return Ok(event);
                }

                match self.chunks.next().await {
                    Some(chunk) => self.buffer.push_str(std::str::from_utf8(&chunk?)?),
                    None => bail!("stream ended"),
                }
            }
        }

        /// Resolves once the server closes the stream.
        pub async fn wait_for_end(&mut self) -> Result<()> {
            while let Some(chunk) = self.chunks.next().await {
                chunk?;
            }
            Ok(())
        }
    }
}

async fn open_stream(client: &reqwest::Client, url: &str) -> Result<EventReader> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(EventReader::new(response))
}

#[tokio::test]
async fn posted_message_reaches_a_listener_over_http() -> Result<()> {
    let server = TestServer::start().await?;
    let client = reqwest::Client::new();
    let mut stream = open_stream(&client, &server.url("/chat")).await?;

    let status = client
        .post(server.url("/chat"))
        .body("hello")
        .send()
        .await?
        .status();
    assert!(status.is_success());

    let event = timeout(WAIT, stream.next_event()).await??;
    assert_eq!(event, "data: hello\n\n");

    server.stop().await
}

#[tokio::test]
async fn form_message_reaches_htmx_listener_and_bogus_form_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let client = reqwest::Client::new();
    let mut stream = open_stream(&client, &server.url("/htmx/chat")).await?;

    let rejected = client
        .post(server.url("/htmx/chat"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("bogus=1")
        .send()
        .await?;
    assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);

    client
        .post(server.url("/htmx/chat"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("chat=hi%20there")
        .send()
        .await?
        .error_for_status()?;

    let event = timeout(WAIT, stream.next_event()).await??;
    assert!(event.contains("event: chat\n"), "unexpected event {event:?}");
    assert!(event.contains("data: <p>hi there</p>\n"), "unexpected event {event:?}");

    server.stop().await
}

#[tokio::test]
async fn disconnected_client_is_unregistered() -> Result<()> {
    let server = TestServer::start().await?;
    let client = reqwest::Client::new();
    let stream = open_stream(&client, &server.url("/chat")).await?;
    assert_eq!(server.broadcaster.subscriber_count(), 1);

    drop(stream);

    // hyper sees the EOF and drops the response stream without any write.
    let deadline = Instant::now() + WAIT;
    while server.broadcaster.subscriber_count() > 0 {
        if Instant::now() > deadline {
            bail!("listener was never unregistered");
        }
        sleep(Duration::from_millis(10)).await;
    }

    server.stop().await
}

#[tokio::test]
async fn graceful_shutdown_closes_open_streams() -> Result<()> {
    let server = TestServer::start().await?;
    let client = reqwest::Client::new();
    let mut plain = open_stream(&client, &server.url("/chat")).await?;
    let mut htmx = open_stream(&client, &server.url("/htmx/chat")).await?;

    let broadcaster = Arc::clone(&server.broadcaster);
    server.stop().await?;

    timeout(WAIT, plain.wait_for_end()).await??;
    timeout(WAIT, htmx.wait_for_end()).await??;
    assert!(!broadcaster.is_running());
    assert_eq!(broadcaster.subscriber_count(), 0);
    Ok(())
}
