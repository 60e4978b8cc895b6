use crate::{
    config::{BackendConfig, Credentials},
    error::{ConfigurationError, RemoteServiceError},
    objects::{DetectionResult, ErrorEnvelope},
};
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, StatusCode, Url};
use std::time::Duration;
use tonic::async_trait;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Outbound half of a detection: one image in, the backend's result out.
#[async_trait]
pub trait VisionBackend: Send + Sync + 'static {
    async fn detect_objects_in_stream(
        &self,
        image: Bytes,
    ) -> Result<DetectionResult, RemoteServiceError>;
}

/// Client for the Computer Vision `detect` REST operation.
///
/// Construction checks the key and endpoint locally and never touches the
/// network. A key the backend does not accept surfaces on the first call.
#[derive(Debug, Clone)]
pub struct ComputerVisionClient {
    http: reqwest::Client,
    detect_url: Url,
    api_key: String,
}

impl ComputerVisionClient {
    pub fn new(
        credentials: &Credentials,
        backend_config: &BackendConfig,
    ) -> Result<Self, ConfigurationError> {
        if credentials.api_key.trim().is_empty() {
            return Err(ConfigurationError::InvalidCredentials(
                "API key is empty".to_string(),
            ));
        }

        let detect_url = detect_url(&credentials.endpoint, &backend_config.api_version)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(backend_config.timeout_secs))
            .build()?;

        tracing::info!("Vision client targets {}", detect_url);

        Ok(Self {
            http,
            detect_url,
            api_key: credentials.api_key.clone(),
        })
    }

    pub fn detect_url(&self) -> &Url {
        &self.detect_url
    }
}

fn detect_url(endpoint: &str, api_version: &str) -> Result<Url, ConfigurationError> {
    let invalid = |reason: String| {
        ConfigurationError::InvalidCredentials(format!(
            "endpoint `{}` is not usable: {}",
            endpoint, reason
        ))
    };

    let base = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", base.scheme())));
    }
    if base.cannot_be_a_base() || base.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    let url = format!(
        "{}/vision/{}/detect",
        base.as_str().trim_end_matches('/'),
        api_version
    );
    Url::parse(&url).map_err(|e| invalid(e.to_string()))
}

pub(crate) fn remote_error(status: StatusCode, body: &[u8]) -> RemoteServiceError {
    let reason = status.canonical_reason().unwrap_or("Unknown");

    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: Some(error),
        }) => RemoteServiceError::Backend {
            status: status.as_u16(),
            code: if error.code.is_empty() {
                reason.to_string()
            } else {
                error.code
            },
            message: error.message,
        },
        _ => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            RemoteServiceError::Backend {
                status: status.as_u16(),
                code: reason.to_string(),
                message: if text.is_empty() {
                    reason.to_string()
                } else {
                    text
                },
            }
        }
    }
}

#[async_trait]
impl VisionBackend for ComputerVisionClient {
    async fn detect_objects_in_stream(
        &self,
        image: Bytes,
    ) -> Result<DetectionResult, RemoteServiceError> {
        let response = self
            .http
            .post(self.detect_url.clone())
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = remote_error(status, &body);
            tracing::warn!("Detect call failed: {}", err);
            return Err(err);
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
