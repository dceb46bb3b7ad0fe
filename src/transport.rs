//! Single-shot HTTP calls against the SignalFx API.
//!
//! No retries and no timeout beyond the client default. Every HTTP status,
//! including 4xx and 5xx, comes back as `Ok`; judging it is up to the
//! lifecycle layer.

use crate::error::ProviderError;
use reqwest::{header, Client, Method};
use tracing::debug;

/// Header carrying the SignalFx token.
pub const AUTH_HEADER: &str = "X-SF-Token";

/// Status and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Full response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Body as lossy UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Shared HTTP client.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    client: Client,
}

impl Transport {
    /// Transport over a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport over a caller built client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Issue one request and return whatever the server answered.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, ProviderError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(AUTH_HEADER, token);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|source| ProviderError::Transport {
            method: method.to_string(),
            source,
        })?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|source| ProviderError::Transport {
                method: method.to_string(),
                source,
            })?;
        debug!(%method, %url, status, bytes = body.len(), "SignalFx responded");

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}
