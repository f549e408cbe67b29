use tokio::sync::Mutex as AsyncMutex;

/// Serialises tests that touch `BURGERBOT_*` environment variables.
/// Sync tests take it with `.blocking_lock()`, async tests with `.lock().await`.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());
