//! Client for the external query service.

use std::time::Duration;

use async_trait::async_trait;
use pdfchat_core::config::ServiceConfig;
use pdfchat_core::types::{ChatRequest, ChatResponse};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Client;

use crate::error::DispatchError;

/// One request/response cycle against the query service.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Send `query` and return the assistant's textual reply.
    async fn query(&self, query: &str) -> Result<String, DispatchError>;
}

/// `POST {base_url}/api/chat` with a JSON `{ "query": ... }` body.
#[derive(Debug, Clone)]
pub struct HttpQueryClient {
    client: Client,
    url: String,
}

impl HttpQueryClient {
    /// Create a client for the endpoint at `url`, without a timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Create a client from the `[service]` configuration section.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, DispatchError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        Ok(Self {
            client: builder.build()?,
            url: config.chat_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn query(&self, query: &str) -> Result<String, DispatchError> {
        let request = ChatRequest {
            query: query.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_reply(&body)
    }
}

/// Extract the textual `response` field from a success body.
///
/// Invalid JSON is `MalformedBody`; valid JSON that is not an object with a
/// string `response` is `MissingResponse`.
pub fn parse_reply(body: &str) -> Result<String, DispatchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| DispatchError::MalformedBody(e.to_string()))?;
    if !value.is_object() {
        return Err(DispatchError::MissingResponse);
    }
    let reply: ChatResponse =
        serde_json::from_value(value).map_err(|_| DispatchError::MissingResponse)?;
    Ok(reply.response)
}
