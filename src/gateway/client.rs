//! HTTP client for the remote image-generation API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::config::GatewayConfig;
use super::wire::{build_request, interpret_http, is_success};
use super::ImageEditor;
use crate::error::{EditError, EditResult};
use crate::session::ImageAsset;

/// [`ImageEditor`] backed by the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    client: Client,
    config: GatewayConfig,
}

impl GeminiGateway {
    /// Creates a gateway. Fails with [`EditError::Configuration`] when no
    /// credential is configured.
    pub fn new(config: GatewayConfig) -> EditResult<Self> {
        config.require_api_key()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EditError::unknown(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Creates a gateway from environment variables.
    pub fn from_env() -> EditResult<Self> {
        Self::new(GatewayConfig::from_env())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[async_trait]
impl ImageEditor for GeminiGateway {
    async fn edit_image(
        &self,
        source: &ImageAsset,
        instruction: &str,
        inspiration: Option<&ImageAsset>,
    ) -> EditResult<ImageAsset> {
        let api_key = self.config.require_api_key()?;
        let body = build_request(source, instruction, inspiration);

        debug!(
            model = %self.config.model,
            has_inspiration = inspiration.is_some(),
            "sending edit request"
        );

        let resp = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| EditError::unknown(format!("failed to read response: {e}")))?;

        if !is_success(status) {
            warn!(status, message = %body, "edit request rejected");
        }

        interpret_http(status, &body, source)
    }
}

fn classify_transport_error(err: reqwest::Error) -> EditError {
    warn!(error = %err, "edit request failed");
    match err.status() {
        Some(status) => EditError::from_status(status.as_u16()),
        None => EditError::unknown(err.to_string()),
    }
}
