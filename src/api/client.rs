use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::types::{
    ChatRequest, ChatResponse, ClearOrdersResponse, NewSessionRequest, OrdersResponse,
    SessionResponse,
};
use crate::util::{is_local_endpoint_url, join_endpoint};
use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;
use std::time::Duration;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, session_id: &str, message: &str) -> Result<ByteStream>;
}

/// HTTP client for the burger chat backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_url: String,
    request_timeout: Duration,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        // Only connecting is bounded here; a streamed reply may legitimately stay open longer.
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            api_url: config.api_url.trim().to_string(),
            request_timeout: config.request_timeout(),
            #[cfg(test)]
            mock_stream_producer: None,
        })
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            // Discard port: non-stream requests from a mocked client fail fast.
            api_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(5),
            mock_stream_producer: Some(mock_producer),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Start (or restart) a session on the backend. Returns the greeting, if the backend sends one.
    pub async fn new_session(&self, session_id: &str) -> Result<Option<String>> {
        let request_url = join_endpoint(&self.api_url, "new_session");
        let body = NewSessionRequest {
            session_id: session_id.to_string(),
        };
        let response: SessionResponse = self.post_json(&request_url, &body).await?;
        if let Some(error) = response.error {
            bail!("session creation failed: {error}");
        }
        tracing::info!(session_id, message = ?response.message, "session started");
        Ok(response.greeting)
    }

    /// Submit a chat turn and return the raw streamed response body.
    pub async fn create_chat_stream(&self, session_id: &str, message: &str) -> Result<ByteStream> {
        let message = validate_message(message)?;

        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(session_id, message);
            }
        }

        let request_url = join_endpoint(&self.api_url, "chat");
        let body = ChatRequest {
            message: message.to_string(),
            session_id: session_id.to_string(),
            streaming: true,
        };
        if debug_payload_enabled() {
            emit_debug_payload(&request_url, &serde_json::to_value(&body)?);
        }

        let response = self
            .http
            .post(&request_url)
            .json(&body)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(&request_url, status, &text));
        }

        tracing::debug!(url = %request_url, session_id, "chat stream opened");
        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_api_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }

    /// Submit a chat turn and wait for the whole reply.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatResponse> {
        let message = validate_message(message)?;
        let request_url = join_endpoint(&self.api_url, "chat");
        let body = ChatRequest {
            message: message.to_string(),
            session_id: session_id.to_string(),
            streaming: false,
        };
        let response: ChatResponse = self.post_json(&request_url, &body).await?;
        if let Some(error) = &response.error {
            bail!("chat request failed: {error}");
        }
        Ok(response)
    }

    pub async fn orders(&self, session_id: &str) -> Result<OrdersResponse> {
        let request_url = join_endpoint(&self.api_url, &format!("orders/{session_id}"));
        let response = self
            .http
            .get(&request_url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;
        let orders: OrdersResponse = read_json(response, &request_url).await?;
        if let Some(error) = &orders.error {
            bail!("order lookup failed: {error}");
        }
        Ok(orders)
    }

    /// Clear the session's orders on the backend. Returns the confirmation message.
    pub async fn clear_orders(&self, session_id: &str) -> Result<String> {
        let request_url = join_endpoint(&self.api_url, &format!("clear_orders/{session_id}"));
        let response = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;
        let cleared: ClearOrdersResponse = read_json(response, &request_url).await?;
        if let Some(error) = cleared.error {
            bail!("clearing orders failed: {error}");
        }
        Ok(cleared.message.unwrap_or_default())
    }

    async fn post_json<B, T>(&self, request_url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if debug_payload_enabled() {
            emit_debug_payload(request_url, &serde_json::to_value(body)?);
        }
        let response = self
            .http
            .post(request_url)
            .json(body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, request_url))?;
        read_json(response, request_url).await
    }
}

fn validate_message(message: &str) -> Result<&str> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        bail!("message is empty");
    }
    Ok(trimmed)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, request_url: &str) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|error| map_api_request_error(error, request_url))?;
    if !status.is_success() {
        return Err(status_error(request_url, status, &text));
    }
    serde_json::from_str(&text)
        .with_context(|| format!("API endpoint '{request_url}' returned an unexpected body"))
}

fn status_error(request_url: &str, status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    let server_error = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string));
    match server_error {
        Some(error) => anyhow!(
            "API endpoint '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        ),
        None => anyhow!("API endpoint '{}' returned HTTP {}", request_url, status),
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local chat server '{}': {}. Start the server or update BURGERBOT_API_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach chat server '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!(
            "API endpoint '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        );
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}
