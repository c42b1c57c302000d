use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::types::{
    BotSession, CommandAck, MarketStatus, OrderRecord, Position, StartBotRequest, WatchEntry,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response whose body carried the server's `{"error": ...}` text.
    #[error("{0}")]
    Server(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The fixed endpoint set the dashboard consumes. A trait seam so the command
/// dispatcher and loaders can be exercised against a mock in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn start_bot(&self, request: &StartBotRequest) -> ApiResult<CommandAck>;
    async fn stop_bot(&self, session_id: i64) -> ApiResult<CommandAck>;
    async fn market_status(&self) -> ApiResult<MarketStatus>;
    async fn active_bots(&self) -> ApiResult<Vec<BotSession>>;
    async fn positions(&self) -> ApiResult<Vec<Position>>;
    async fn recent_orders(&self, limit: u32) -> ApiResult<Vec<OrderRecord>>;
    async fn market_watch(&self) -> ApiResult<Vec<WatchEntry>>;
}

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    /// Error bodies are `{"error": "..."}` with a non-2xx status; surface the
    /// server's text instead of the bare status code when it is present.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        let status = response.status();
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("error")
                .and_then(|e| e.as_str())
                .map(|e| e.to_string()),
            Err(_) => None,
        };
        Err(ApiError::Server(
            message.unwrap_or_else(|| format!("server returned {}", status)),
        ))
    }
}

#[async_trait]
impl BotApi for HttpApi {
    async fn start_bot(&self, request: &StartBotRequest) -> ApiResult<CommandAck> {
        let url = format!("{}/api/start_bot", self.base_url);
        debug!("POST {} strategy={}", url, request.strategy);
        let response = self.client.post(&url).json(request).send().await?;
        Self::decode(response).await
    }

    async fn stop_bot(&self, session_id: i64) -> ApiResult<CommandAck> {
        self.get_json(&format!("/api/stop_bot/{}", session_id)).await
    }

    async fn market_status(&self) -> ApiResult<MarketStatus> {
        self.get_json("/api/market_status").await
    }

    async fn active_bots(&self) -> ApiResult<Vec<BotSession>> {
        self.get_json("/api/active_bots").await
    }

    async fn positions(&self) -> ApiResult<Vec<Position>> {
        self.get_json("/api/positions").await
    }

    async fn recent_orders(&self, limit: u32) -> ApiResult<Vec<OrderRecord>> {
        self.get_json(&format!("/api/orders?limit={}", limit)).await
    }

    async fn market_watch(&self) -> ApiResult<Vec<WatchEntry>> {
        self.get_json("/api/market_watch").await
    }
}
