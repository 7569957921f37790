use crate::flavor::Flavor;
use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub data: String,
    pub timestamp: Instant,
}

pub struct Connection {
    pub label: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    pub async fn establish(base_url: &str, flavor: Flavor, label: String) -> Result<Self> {
        let url = format!("{}{}", base_url, flavor.path());
        let (tx, rx) = mpsc::unbounded_channel();

        let client = es::ClientBuilder::for_url(&url)?.build();

        let task_label = label.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => {
                        trace!("{} received {}: {:?}", task_label, event.event_type, event.data);
                        let sse_event = Event {
                            event_type: event.event_type,
                            data: event.data,
                            timestamp: Instant::now(),
                        };

                        if tx.send(sse_event).is_err() {
                            debug!("SSE receiver dropped for {}", task_label);
                            break;
                        }
                    }
                    Some(Ok(es::SSE::Comment(_))) => {
                        // Keep-alive
                    }
                    Some(Err(e)) => {
                        warn!("SSE error for {}: {}", task_label, e);
                    }
                    None => {
                        debug!("SSE stream ended for {}", task_label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            label,
            event_rx: rx,
            _handle: handle,
        })
    }

    /// Waits for the next event of `event_type`, skipping any other type.
    pub async fn next_event(&mut self, event_type: &str, timeout: Duration) -> Result<Event> {
        self.wait_for(event_type, timeout, |_| true).await
    }

    /// Waits for an event of `event_type` whose data contains `needle`.
    ///
    /// Unrelated chat traffic on a shared server is skipped.
    pub async fn wait_for_data(
        &mut self,
        event_type: &str,
        needle: &str,
        timeout: Duration,
    ) -> Result<Event> {
        self.wait_for(event_type, timeout, |event| event.data.contains(needle))
            .await
    }

    async fn wait_for<F>(&mut self, event_type: &str, timeout: Duration, matches: F) -> Result<Event>
    where
        F: Fn(&Event) -> bool,
    {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event: {}", event_type);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event)) if event.event_type == event_type && matches(&event) => {
                    return Ok(event);
                }
                Ok(Some(_)) => {
                    continue;
                }
                Ok(None) => {
                    anyhow::bail!("SSE connection closed");
                }
                Err(_) => {
                    anyhow::bail!("Timeout waiting for event: {}", event_type);
                }
            }
        }
    }
}
