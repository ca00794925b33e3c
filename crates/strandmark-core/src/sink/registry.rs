//! Remote registration of constellation signatures.
//!
//! Fire-and-forget: the pipeline never waits on or retries a registration.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::config::{GeneralConfig, RegistrationConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::ProcessedImage;

/// Body posted to the registry.
///
/// The constellation is embedded verbatim so the registry sees exactly the
/// bytes written to `constellation_<N>.json`.
#[derive(Debug, Serialize)]
pub struct RegistrationPayload {
    /// Image id, sent as a string
    pub image_id: String,
    pub author: String,
    pub device_model: String,
    pub timestamp: String,
    pub constellation: Box<RawValue>,
}

impl RegistrationPayload {
    /// Build the payload for a processed image.
    pub fn new(image: &ProcessedImage, general: &GeneralConfig) -> PipelineResult<Self> {
        let constellation =
            RawValue::from_string(image.constellation.to_json()).map_err(|e| {
                PipelineError::Remote {
                    message: format!("Invalid constellation JSON: {e}"),
                    status_code: None,
                }
            })?;

        Ok(Self {
            image_id: image.record.id.to_string(),
            author: general.author.clone(),
            device_model: general.device_model.clone(),
            timestamp: image.captured_at.clone(),
            constellation,
        })
    }
}

/// Anything that can accept a constellation registration.
#[async_trait]
pub trait Registrar: Send + Sync {
    async fn register(&self, payload: &RegistrationPayload) -> PipelineResult<()>;
}

/// Registrar that POSTs JSON to an HTTP endpoint.
pub struct HttpRegistrar {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRegistrar {
    pub fn new(config: &RegistrationConfig) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| PipelineError::Remote {
                message: format!("Failed to build HTTP client: {e}"),
                status_code: None,
            })?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Registrar for HttpRegistrar {
    async fn register(&self, payload: &RegistrationPayload) -> PipelineResult<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("accept", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| PipelineError::Remote {
                message: format!("Registry request failed: {e}"),
                status_code: None,
            })?;

        // Only 200 counts as accepted, not any 2xx
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Remote {
                message: format!("Registry HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        tracing::debug!(image_id = %payload.image_id, "Constellation registered");
        Ok(())
    }
}
