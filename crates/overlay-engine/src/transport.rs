//! HTTP transport abstraction with cooperative cancellation.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use overlay_common::OverlayError;
use wfs_protocol::RawResponse;

/// The network boundary of the overlay engine.
///
/// Implementations must resolve to [`OverlayError::Aborted`] when the token
/// is cancelled mid-request and to [`OverlayError::Timeout`] when their own
/// request timeout fires. Non-2xx responses are returned as responses, not
/// errors; the scheduler decides what to do with the status.
#[async_trait]
pub trait FeatureTransport: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, OverlayError>;
}

/// Production transport backed by a pooled reqwest client.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

#[async_trait]
impl FeatureTransport for ReqwestTransport {
    async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, OverlayError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let body = response.text().await.map_err(map_reqwest_error)?;

            Ok(RawResponse {
                status,
                content_type,
                body,
            })
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(OverlayError::Aborted),
            result = request => result,
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> OverlayError {
    if e.is_timeout() {
        OverlayError::Timeout
    } else {
        OverlayError::Network(e.to_string())
    }
}
