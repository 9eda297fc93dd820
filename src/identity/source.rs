use async_trait::async_trait;
use reqwest::Client;

use crate::config::CollectorConfig;
use crate::error::IdentityError;

/// Raw answer from the identity endpoint. Interpreting it is the resolver's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can be asked "who is the current user".
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// One attempt. `Err` only for transport-level failure; any HTTP status
    /// comes back as `Ok`.
    async fn fetch(&self) -> Result<HttpReply, IdentityError>;
}

/// Asks the hub's user endpoint over HTTP.
#[derive(Clone)]
pub struct HubIdentitySource {
    client: Client,
    url: String,
    api_token: Option<String>,
}

impl HubIdentitySource {
    pub fn new(config: &CollectorConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            url: config.user_endpoint(),
            api_token: config.api_token.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IdentitySource for HubIdentitySource {
    async fn fetch(&self) -> Result<HttpReply, IdentityError> {
        let mut request = self.client.get(&self.url);
        // Credentials only ever go to the configured origin.
        if let Some(token) = &self.api_token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {}", token));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}
