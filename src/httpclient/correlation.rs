use chrono::Utc;
use rand::Rng;

/// Header carrying the correlation ID on every outbound call
pub const CORRELATION_HEADER: &str = "X-Correlation-Id";

/// Generate a correlation ID: `prefix-<epoch_ms>-<random_suffix>`.
///
/// Generated once per logical call; all retries of that call reuse the
/// same value.
pub fn generate(prefix: &str) -> String {
    let epoch_ms = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}-{}-{:08x}", prefix, epoch_ms, suffix)
}
