use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const LOG_LEVEL_ENV: &str = "BURGERBOT_LOG_LEVEL";
const DEFAULT_FILTER: &str = "warn";

static INIT: OnceLock<()> = OnceLock::new();

fn resolve_env_filter() -> tracing_subscriber::EnvFilter {
    if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
        if let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level) {
            return filter;
        }
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER))
}

/// Install the process-wide log subscriber once.
///
/// `BURGERBOT_LOG_LEVEL` wins over `RUST_LOG`; without either only warnings are shown.
/// Logs go to stderr so stdout carries nothing but the conversation.
pub fn init_logging() {
    INIT.get_or_init(|| {
        let console_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr);
        let _ = tracing_subscriber::registry()
            .with(resolve_env_filter())
            .with(console_layer)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_env_overrides_default() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(LOG_LEVEL_ENV, "debug");
        let filter = resolve_env_filter();
        std::env::remove_var(LOG_LEVEL_ENV);
        assert!(filter.to_string().contains("debug"));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
