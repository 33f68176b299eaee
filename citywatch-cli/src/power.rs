use anyhow::{Context, Result};
use async_trait::async_trait;
use citywatch_core::PowerGridProvider;
use reqwest::Client;
use serde_json::Value;

/// Power-grid collaborator backed by two JSON feeds.
///
/// An unconfigured feed yields `null` rather than an error.
#[derive(Debug, Clone)]
pub struct FeedPowerGrid {
    http: Client,
    data_url: Option<String>,
    generation_url: Option<String>,
}

impl FeedPowerGrid {
    pub fn new(http: Client, data_url: Option<String>, generation_url: Option<String>) -> Self {
        Self {
            http,
            data_url,
            generation_url,
        }
    }

    async fn fetch(&self, url: Option<&str>) -> Result<Value> {
        let Some(url) = url else {
            return Ok(Value::Null);
        };

        self.http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to power feed {url}"))?
            .error_for_status()
            .with_context(|| format!("Power feed {url} returned an error status"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse power feed {url}"))
    }
}

#[async_trait]
impl PowerGridProvider for FeedPowerGrid {
    async fn power_data(&self) -> Result<Value> {
        self.fetch(self.data_url.as_deref()).await
    }

    async fn generation_breakdown(&self) -> Result<Value> {
        self.fetch(self.generation_url.as_deref()).await
    }
}
