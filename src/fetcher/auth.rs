//! Client-credentials token acquisition

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::fetcher::{FetcherError, FetcherResult};

/// OAuth token endpoint below the API base URL
pub const TOKEN_PATH: &str = "/v2/oauth/token/";

/// Source of bearer tokens for the research API
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a fresh access token
    async fn access_token(&self) -> FetcherResult<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// `grant_type=client_credentials` token request
#[derive(Clone)]
pub struct ClientCredentials {
    client: Client,
    token_url: String,
    client_key: String,
    client_secret: String,
}

impl ClientCredentials {
    /// Credentials for the API rooted at `base_url`
    pub fn new(
        client: Client,
        base_url: &str,
        client_key: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: format!("{}{}", base_url.trim_end_matches('/'), TOKEN_PATH),
            client_key: client_key.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Full token endpoint URL
    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url)
            .field("client_key", &self.client_key)
            .field("client_secret", &"***")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for ClientCredentials {
    async fn access_token(&self) -> FetcherResult<String> {
        debug!("Requesting access token from {}", self.token_url);

        let form = [
            ("client_key", self.client_key.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .header("Cache-Control", "no-cache")
            .form(&form)
            .send()
            .await
            .map_err(|e| FetcherError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetcherError::Auth(format!("token response unreadable: {e}")))?;

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            FetcherError::Auth(format!("token response is not JSON (HTTP {status}): {e}"))
        })?;

        match parsed.access_token {
            Some(token) if !token.is_empty() => {
                info!(expires_in = ?parsed.expires_in, "Obtained access token");
                Ok(token)
            }
            _ => Err(FetcherError::Auth(format!(
                "no access_token in response (HTTP {status}): {} {}",
                parsed.error.unwrap_or_default(),
                parsed.error_description.unwrap_or_default()
            ))),
        }
    }
}

/// Provider that hands out a fixed token
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> FetcherResult<String> {
        Ok(self.0.clone())
    }
}
