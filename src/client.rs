//! HTTP client for a running `ftl-mcp serve` instance.
//!
//! Configuration is via environment variables:
//! - `FTL_MCP_URL` - Base URL (default: `http://localhost:17020/api/v1`)
//! - `FTL_MCP_API_KEY` - Bearer token, if the server requires one

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::mcp::{InventoryStatus, PlaybookResponse, RecordTaskResponse, StateStats};
use crate::models::RecordTaskInput;

pub const DEFAULT_URL: &str = "http://localhost:17020/api/v1";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
struct PlaybookRequest<'a> {
    name: &'a str,
    include_failed: bool,
}

#[derive(Debug, Clone)]
pub struct ControlClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl ControlClient {
    pub fn from_env() -> Self {
        let base_url = std::env::var("FTL_MCP_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(base_url, std::env::var("FTL_MCP_API_KEY").ok())
    }

    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(body),
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
                ClientError::Rejected(body)
            }
            _ => ClientError::Server(format!("{}: {}", status, body)),
        })
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        let response = self.request(Method::GET, "/health").send().await?;
        Self::decode(response).await
    }

    pub async fn stats(&self) -> Result<StateStats, ClientError> {
        let response = self.request(Method::GET, "/stats").send().await?;
        Self::decode(response).await
    }

    pub async fn inventory_status(&self) -> Result<InventoryStatus, ClientError> {
        let response = self.request(Method::GET, "/inventory").send().await?;
        Self::decode(response).await
    }

    pub async fn record_task(&self, input: &RecordTaskInput) -> Result<RecordTaskResponse, ClientError> {
        let response = self
            .request(Method::POST, "/tasks")
            .json(input)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn generate_playbook(
        &self,
        name: &str,
        include_failed: bool,
    ) -> Result<PlaybookResponse, ClientError> {
        let response = self
            .request(Method::POST, "/playbook")
            .json(&PlaybookRequest {
                name,
                include_failed,
            })
            .send()
            .await?;
        Self::decode(response).await
    }
}
