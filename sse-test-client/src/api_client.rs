use crate::flavor::Flavor;
use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    data: Health,
}

#[derive(Debug, Deserialize)]
pub struct Health {
    pub status: String,
    pub subscribers: usize,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Publishes `text` the way the given flavor's clients do and fails on a non-2xx reply.
    pub async fn post_chat(&self, flavor: Flavor, text: &str) -> Result<()> {
        let status = match flavor {
            Flavor::Plain => self.post_raw(flavor, text.as_bytes().to_vec()).await?,
            Flavor::Htmx => self.post_form(&[("chat", text)]).await?,
        };

        if !status.is_success() {
            anyhow::bail!("Failed to publish chat message: {}", status);
        }

        Ok(())
    }

    /// Sends an arbitrary body to the flavor's publish endpoint and returns the status.
    pub async fn post_raw(&self, flavor: Flavor, body: Vec<u8>) -> Result<StatusCode> {
        let url = format!("{}{}", self.base_url, flavor.path());
        let content_type = match flavor {
            Flavor::Plain => "text/plain",
            Flavor::Htmx => "application/x-www-form-urlencoded",
        };

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .context("Failed to post chat message")?;

        Ok(response.status())
    }

    /// Sends `fields` URL-form-encoded to `/htmx/chat` and returns the status.
    pub async fn post_form(&self, fields: &[(&str, &str)]) -> Result<StatusCode> {
        let url = format!("{}{}", self.base_url, Flavor::Htmx.path());

        let response = self
            .client
            .post(&url)
            .form(fields)
            .send()
            .await
            .context("Failed to post chat form")?;

        Ok(response.status())
    }

    pub async fn health(&self) -> Result<Health> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach health endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("Health check failed: {}", response.status());
        }

        let health: HealthResponse = response.json().await.context("Failed to parse response")?;
        Ok(health.data)
    }
}
