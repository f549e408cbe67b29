use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One typed event decoded from a streamed chat response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental fragment of assistant text.
    Delta { text: String },
    /// End of the turn, carrying the backend's order summary.
    Complete { summary: String },
    /// Server-reported failure for the turn.
    Error { message: String },
}

impl StreamEvent {
    /// Map one `data:` payload object to events, in the order error, chunk, complete.
    pub fn from_record(record: &Map<String, Value>) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(error) = record.get("error").filter(|v| is_truthy(v)) {
            events.push(StreamEvent::Error {
                message: value_to_text(error),
            });
        }

        if let Some(chunk) = record.get("chunk").filter(|v| is_truthy(v)) {
            events.push(StreamEvent::Delta {
                text: value_to_text(chunk),
            });
        }

        if record.get("complete").is_some_and(is_truthy) {
            let summary = record
                .get("order_summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            events.push(StreamEvent::Complete { summary });
        }

        events
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionResponse {
    pub message: Option<String>,
    pub greeting: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    pub streaming: bool,
}

/// Body of a non-streaming `/chat` reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    pub response: Option<String>,
    /// JSON-encoded list of [`OrderEntry`].
    pub orders: Option<String>,
    pub order_summary: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersResponse {
    pub orders: Option<String>,
    pub order_summary: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearOrdersResponse {
    pub message: Option<String>,
    pub error: Option<String>,
}

/// One order as the backend serializes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderEntry {
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub burger: Option<MenuItem>,
    #[serde(default)]
    pub side: Option<MenuItem>,
    #[serde(default)]
    pub drink: Option<MenuItem>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
}

impl MenuItem {
    /// "name size", or just the name when no size is set.
    pub fn label(&self) -> String {
        match self.size.as_deref().map(str::trim) {
            Some(size) if !size.is_empty() => format!("{} {}", self.name, size).trim().to_string(),
            _ => self.name.trim().to_string(),
        }
    }
}
