//! Image description for inbound messages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EnrichmentConfig;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("describer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("describer returned an empty description")]
    Empty,

    #[error("enrichment disabled")]
    Disabled,
}

/// Turns an image reference into a short textual description.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn describe_image(&self, image_url: &str) -> Result<String, EnrichError>;
}

/// Describe an image, swallowing any failure into `placeholder`.
pub async fn describe_or_placeholder(
    enricher: &dyn Enricher,
    image_url: &str,
    placeholder: &str,
) -> String {
    match enricher.describe_image(image_url).await {
        Ok(description) => description,
        Err(EnrichError::Disabled) => placeholder.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, image_url, "Image description failed, using placeholder");
            metrics::record_enrichment_failure();
            placeholder.to_string()
        }
    }
}

#[derive(Serialize)]
struct DescribeRequest<'a> {
    image_url: &'a str,
}

#[derive(Deserialize)]
struct DescribeResponse {
    description: String,
}

/// Describer reached over HTTP.
#[derive(Clone)]
pub struct HttpEnricher {
    client: Client,
    endpoint: String,
    enabled: bool,
}

impl HttpEnricher {
    pub fn new(config: &EnrichmentConfig) -> Result<Self, EnrichError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            enabled: config.enabled,
        })
    }
}

#[async_trait]
impl Enricher for HttpEnricher {
    async fn describe_image(&self, image_url: &str) -> Result<String, EnrichError> {
        if !self.enabled {
            return Err(EnrichError::Disabled);
        }

        let response: DescribeResponse = self
            .client
            .post(&self.endpoint)
            .json(&DescribeRequest { image_url })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let description = response.description.trim();
        if description.is_empty() {
            return Err(EnrichError::Empty);
        }
        Ok(description.to_string())
    }
}
