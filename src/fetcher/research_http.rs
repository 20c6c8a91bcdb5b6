//! HTTP client for the research API
//!
//! One POST per call: bearer token, JSON body, field list in the query
//! string. The client does not retry; [`RetryGate`](crate::fetcher::retry::RetryGate)
//! decides what happens on failure.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::fetcher::auth::TokenProvider;
use crate::fetcher::{
    ApiConnector, ApiResponse, Endpoint, FetcherError, FetcherResult, ResearchApi,
};
use crate::metrics;

/// Production API base URL
pub const DEFAULT_API_BASE: &str = "https://open.tiktokapis.com";

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds) - overall time for the entire request
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Build the shared HTTP client.
///
/// Configured with explicit timeouts so a stalled connection surfaces as a
/// transport error instead of hanging the pass.
pub fn build_http_client() -> FetcherResult<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| FetcherError::Transport(format!("Failed to build HTTP client: {e}")))
}

/// Authenticated research API client
pub struct ResearchHttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ResearchHttpClient {
    /// Create a client for `base_url` using a bearer `token`
    pub fn new(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Request URL of `endpoint`, including its field list
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!(
            "{}/v2/research/{}/?fields={}",
            self.base_url,
            endpoint.path(),
            endpoint.fields()
        )
    }
}

#[async_trait]
impl ResearchApi for ResearchHttpClient {
    async fn post(&self, endpoint: Endpoint, body: &Value) -> FetcherResult<ApiResponse> {
        let url = self.endpoint_url(endpoint);
        debug!(endpoint = %endpoint, request = %body, "Sending request");

        let response = match self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                metrics::record_api_request(endpoint.path(), "transport_error");
                return Err(FetcherError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            metrics::record_api_request(endpoint.path(), "transport_error");
            FetcherError::Transport(format!("Failed to read response body: {e}"))
        })?;

        // Error codes live in the envelope, so the HTTP status is only logged
        match ApiResponse::from_body(&text) {
            Ok(parsed) => {
                metrics::record_api_request(endpoint.path(), parsed.error.code.as_str());
                debug!(
                    endpoint = %endpoint,
                    http_status = status.as_u16(),
                    code = %parsed.error.code,
                    log_id = %parsed.error.log_id,
                    response = %text,
                    "Received response"
                );
                Ok(parsed)
            }
            Err(e) => {
                metrics::record_api_request(endpoint.path(), "parse_error");
                debug!(endpoint = %endpoint, http_status = status.as_u16(), response = %text, "Undecodable response");
                Err(e)
            }
        }
    }
}

/// Connector that fetches a token and builds a [`ResearchHttpClient`]
pub struct HttpConnector {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpConnector {
    /// Connector for `base_url` using `tokens` for authentication
    pub fn new(client: Client, base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            tokens,
        }
    }
}

#[async_trait]
impl ApiConnector for HttpConnector {
    async fn connect(&self) -> FetcherResult<Arc<dyn ResearchApi>> {
        let token = self.tokens.access_token().await?;
        info!("Connected to research API at {}", self.base_url);
        Ok(Arc::new(ResearchHttpClient::new(
            self.client.clone(),
            self.base_url.clone(),
            token,
        )))
    }
}
