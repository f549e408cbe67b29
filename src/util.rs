use reqwest::Url;

/// Parses a `BURGERBOT_*` on/off switch. Takes the `String` straight from
/// `std::env::var(..).ok()` so it slots into `and_then`.
pub fn parse_bool_flag(raw: String) -> Option<bool> {
    parse_bool_str(&raw)
}

/// Accepts true/false, 1/0, yes/no and on/off, ignoring case and surrounding blanks.
/// Anything else is `None` so callers fall back to their default.
pub fn parse_bool_str(raw: &str) -> Option<bool> {
    let normalized = raw.trim().to_ascii_lowercase();
    if ["true", "1", "yes", "on"].contains(&normalized.as_str()) {
        Some(true)
    } else if ["false", "0", "no", "off"].contains(&normalized.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Whether the chat server lives on this machine. Used to hint at starting the
/// local server when a connection is refused.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    matches!(host, "localhost" | "[::1]" | "0.0.0.0") || host.starts_with("127.")
}

/// Join a base URL and an endpoint path without doubling or dropping the slash.
pub fn join_endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
