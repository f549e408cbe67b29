use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;

const DEBUG_PAYLOAD_ENV: &str = "BURGERBOT_DEBUG_PAYLOAD";
const API_LOG_PATH_ENV: &str = "BURGERBOT_API_LOG_PATH";

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .and_then(|v| crate::util::parse_bool_str(&v))
        .unwrap_or(false)
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    let message = format!(
        "BURGERBOT_API DEBUG payload_request url={request_url}\npayload:\n{formatted_payload}\n"
    );
    emit_log_message(&message);
}

/// Record a dropped stream record so the raw payload can be inspected later.
pub fn emit_record_parse_error(json_data: &str, parse_error: &serde_json::Error) {
    let Some(path) = resolve_log_path() else {
        return;
    };
    let message =
        format!("BURGERBOT_API ERROR record_parse_failed error={parse_error}\ndata:\n{json_data}\n");
    if let Err(error) = append_log_file(&path, &message) {
        tracing::debug!(%error, path = %path, "could not append to api log");
    }
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    tracing::debug!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(API_LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
