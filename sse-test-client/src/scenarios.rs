use crate::api_client::ApiClient;
use crate::flavor::Flavor;
use crate::sse_client::Connection;
use anyhow::Result;
use colored::*;
use log::*;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use uuid::Uuid;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct TestResult {
    pub scenario_name: String,
    pub passed: bool,
    pub message: Option<String>,
    pub duration: Duration,
}

impl TestResult {
    fn pass(scenario_name: &str, started: Instant) -> Self {
        Self {
            scenario_name: scenario_name.to_string(),
            passed: true,
            message: None,
            duration: started.elapsed(),
        }
    }

    fn fail(scenario_name: &str, started: Instant, message: String) -> Self {
        println!("{} {}", "✗".red(), message);
        Self {
            scenario_name: scenario_name.to_string(),
            passed: false,
            message: Some(message),
            duration: started.elapsed(),
        }
    }
}

/// Both listeners show up in the server's subscriber count.
pub async fn test_connection(
    api_client: &ApiClient,
    sse1: &Connection,
    sse2: &Connection,
) -> Result<TestResult> {
    let name = "connection_test";
    let started = Instant::now();
    println!("\n{} Running {}", "→".blue(), name.bold());

    loop {
        let health = api_client.health().await?;
        debug!(
            "Server reports {} with {} subscribers",
            health.status, health.subscribers
        );

        if health.subscribers >= 2 {
            println!(
                "{} {} and {} registered ({} active)",
                "✓".green(),
                sse1.label,
                sse2.label,
                health.subscribers
            );
            return Ok(TestResult::pass(name, started));
        }

        if started.elapsed() > EVENT_TIMEOUT {
            return Ok(TestResult::fail(
                name,
                started,
                format!(
                    "Expected at least 2 subscribers, server reports {}",
                    health.subscribers
                ),
            ));
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// A published message reaches every listener, framed for the flavor.
pub async fn test_round_trip(
    flavor: Flavor,
    api_client: &ApiClient,
    sse1: &mut Connection,
    sse2: &mut Connection,
) -> Result<TestResult> {
    let name = "round_trip";
    let started = Instant::now();
    println!("\n{} Running {}", "→".blue(), name.bold());

    let text = format!("round trip {} <b>&</b>", Uuid::new_v4());
    let expected = flavor.expected_data(&text);

    api_client.post_chat(flavor, &text).await?;
    println!("{} Published {:?}", "✓".green(), text);

    for connection in [sse1, sse2] {
        match connection
            .wait_for_data(flavor.event_type(), &expected, EVENT_TIMEOUT)
            .await
        {
            Ok(event) => {
                let latency = event.timestamp.duration_since(started);
                println!(
                    "{} {} received it after {:?}",
                    "✓".green(),
                    connection.label,
                    latency
                );
            }
            Err(e) => {
                return Ok(TestResult::fail(
                    name,
                    started,
                    format!("{} never received {:?}: {}", connection.label, expected, e),
                ));
            }
        }
    }

    Ok(TestResult::pass(name, started))
}

/// A malformed publish gets 400 and nothing reaches the listeners.
///
/// Assumes no one else is chatting on the server while it runs.
pub async fn test_form_rejection(
    flavor: Flavor,
    api_client: &ApiClient,
    sse1: &mut Connection,
) -> Result<TestResult> {
    let name = "form_rejection";
    let started = Instant::now();
    println!("\n{} Running {}", "→".blue(), name.bold());

    let status = match flavor {
        Flavor::Plain => api_client.post_raw(flavor, vec![0xff, 0xfe, 0xfd]).await?,
        Flavor::Htmx => api_client.post_form(&[("bogus", "1")]).await?,
    };

    if status != StatusCode::BAD_REQUEST {
        return Ok(TestResult::fail(
            name,
            started,
            format!("Expected 400 for a malformed publish, got {}", status),
        ));
    }
    println!("{} Malformed publish rejected with {}", "✓".green(), status);

    let text = format!("after rejection {}", Uuid::new_v4());
    api_client.post_chat(flavor, &text).await?;

    match sse1.next_event(flavor.event_type(), EVENT_TIMEOUT).await {
        Ok(event) if event.data == flavor.expected_data(&text) => {
            println!(
                "{} {} saw only the valid message",
                "✓".green(),
                sse1.label
            );
            Ok(TestResult::pass(name, started))
        }
        Ok(event) => Ok(TestResult::fail(
            name,
            started,
            format!("{} received unexpected data {:?}", sse1.label, event.data),
        )),
        Err(e) => Ok(TestResult::fail(
            name,
            started,
            format!("{} never received the valid message: {}", sse1.label, e),
        )),
    }
}
