use super::order_book::OrderBook;
use crate::api::ApiClient;
use crate::runtime::{run_turn, TurnOutcome};
use crate::types::StreamEvent;
use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const SESSION_ID_PREFIX: &str = "session_";
const SESSION_ID_SUFFIX_LEN: usize = 9;

pub fn generate_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{SESSION_ID_PREFIX}{}", &suffix[..SESSION_ID_SUFFIX_LEN])
}

/// One customer's conversation with the ordering bot.
pub struct ChatSession {
    client: ApiClient,
    session_id: String,
    orders: OrderBook,
    streaming: bool,
}

impl ChatSession {
    pub fn new(client: ApiClient, session_id: Option<String>) -> Self {
        Self {
            client,
            session_id: session_id.unwrap_or_else(generate_session_id),
            orders: OrderBook::new(),
            streaming: true,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn orders(&self) -> &OrderBook {
        &self.orders
    }

    /// Open the session on the backend. The backend starts a fresh conversation, so the
    /// local order book is reset as well.
    pub async fn start(&mut self) -> Result<Option<String>> {
        let greeting = self.client.new_session(&self.session_id).await?;
        self.orders.clear();
        Ok(greeting)
    }

    /// Send one message and run the reply to completion.
    pub async fn send(
        &mut self,
        message: &str,
        cancel: &CancellationToken,
        updates: Option<&mpsc::UnboundedSender<StreamEvent>>,
    ) -> Result<TurnOutcome> {
        let outcome = if self.streaming {
            let stream = self
                .client
                .create_chat_stream(&self.session_id, message)
                .await?;
            run_turn(stream, cancel, updates).await?
        } else {
            self.send_buffered(message, updates).await?
        };

        if outcome.error.is_none() && !outcome.cancelled {
            if let Some(summary) = &outcome.order_summary {
                self.apply_turn_summary(summary).await;
            }
        }
        Ok(outcome)
    }

    // A completion without a summary means "ask the backend"; a failed lookup keeps the old one.
    async fn apply_turn_summary(&mut self, summary: &str) {
        if !summary.trim().is_empty() {
            self.orders.set_summary(summary);
            return;
        }

        let previous = self.orders.clone();
        if let Err(error) = self.refresh_orders().await {
            tracing::warn!(%error, "turn completed without a summary and order lookup failed");
            self.orders = previous;
        }
    }

    async fn send_buffered(
        &mut self,
        message: &str,
        updates: Option<&mpsc::UnboundedSender<StreamEvent>>,
    ) -> Result<TurnOutcome> {
        let response = self.client.chat(&self.session_id, message).await?;
        if let Some(orders_json) = response.orders.as_deref() {
            if let Err(error) = self.orders.merge_orders_json(orders_json) {
                tracing::warn!(%error, "ignoring unreadable orders in chat reply");
            }
        }

        let text = response.response.unwrap_or_default();
        let summary = response.order_summary.unwrap_or_default();
        if let Some(tx) = updates {
            let _ = tx.send(StreamEvent::Delta { text: text.clone() });
            let _ = tx.send(StreamEvent::Complete {
                summary: summary.clone(),
            });
        }

        Ok(TurnOutcome {
            text,
            order_summary: Some(summary),
            error: None,
            cancelled: false,
        })
    }

    /// Pull the backend's current orders into the local book.
    pub async fn refresh_orders(&mut self) -> Result<&OrderBook> {
        let response = self.client.orders(&self.session_id).await?;
        if let Some(summary) = response.order_summary {
            self.orders.set_summary(summary);
        }
        if let Some(orders_json) = response.orders.as_deref() {
            let added = self.orders.merge_orders_json(orders_json)?;
            tracing::debug!(added, "merged orders from backend");
        }
        Ok(&self.orders)
    }

    pub async fn clear_orders(&mut self) -> Result<String> {
        let message = self.client.clear_orders(&self.session_id).await?;
        self.orders.clear();
        Ok(message)
    }
}
