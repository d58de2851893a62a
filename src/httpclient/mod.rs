//! Resilient outbound HTTP client.
//!
//! Every call to an external service (supplier backends, the AI
//! enhancement endpoint) goes through [`ResilientHttpClient`]: one
//! correlation ID per logical call, a per-call timeout, capped retries
//! with strictly increasing backoff, and structured error classification.

pub mod correlation;
pub mod error;

pub use correlation::{generate as generate_correlation_id, CORRELATION_HEADER};
pub use error::{ErrorKind, HttpClientError};

use crate::error::{AppError, Result};
use parking_lot::RwLock;
use rand::Rng;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Attempts are capped at this policy level regardless of configuration
const MAX_ATTEMPT_CAP: u32 = 3;

/// Status codes the retry policy treats as transient
const RETRYABLE_STATUSES: [u16; 3] = [429, 500, 503];

/// Configuration for the resilient client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Default request timeout (seconds)
    pub timeout_secs: u64,

    /// Maximum attempts per logical call (1 initial + retries), capped at 3
    pub max_attempts: u32,

    /// First backoff delay (milliseconds)
    pub initial_backoff_ms: u64,

    /// Backoff growth factor between attempts
    pub backoff_multiplier: f64,

    /// Upper bound on added jitter (milliseconds); kept below
    /// `initial_backoff_ms` so successive delays strictly increase
    pub max_jitter_ms: u64,

    /// Correlation ID prefix
    pub correlation_prefix: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 3,
            initial_backoff_ms: 1500,
            backoff_multiplier: 2.0,
            max_jitter_ms: 500,
            correlation_prefix: "enr".to_string(),
        }
    }
}

/// One outbound request
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Per-call timeout override
    pub timeout: Option<Duration>,
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
            timeout: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Successful outcome of a logical call
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,
    pub body: String,
    /// Correlation ID shared by all attempts of this call
    pub correlation_id: String,
    /// Attempts actually made (1 when the first try succeeded)
    pub attempts: u32,
    pub duration_ms: u64,
}

impl ClientResponse {
    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| AppError::Serialization(format!("Failed to parse response body: {}", e)))
    }
}

/// Aggregate client telemetry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientStats {
    /// Logical calls started
    pub total_requests: u64,
    /// Individual attempts made (including retries)
    pub total_attempts: u64,
    /// Retries only (attempts beyond the first per call)
    pub total_retries: u64,
    /// Terminal failures by error kind
    pub failures_by_kind: HashMap<String, u64>,
}

/// Outbound call wrapper with timeout, retry and correlation
#[derive(Clone)]
pub struct ResilientHttpClient {
    client: reqwest::Client,
    config: HttpClientConfig,
    stats: Arc<RwLock<ClientStats>>,
}

impl ResilientHttpClient {
    /// Create a new client from configuration
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        if config.backoff_multiplier <= 1.0 {
            return Err(AppError::Configuration(
                "backoff_multiplier must be greater than 1.0".to_string(),
            ));
        }
        if config.initial_backoff_ms == 0 {
            return Err(AppError::Configuration(
                "initial_backoff_ms must be positive".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("bom-enricher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            stats: Arc::new(RwLock::new(ClientStats::default())),
        })
    }

    /// Execute one logical call, retrying transient failures.
    ///
    /// Retries on 429/500/503 and transport errors only; at most 3
    /// attempts; every attempt carries the same correlation ID.
    pub async fn execute(
        &self,
        request: OutboundRequest,
    ) -> std::result::Result<ClientResponse, HttpClientError> {
        let correlation_id = correlation::generate(&self.config.correlation_prefix);
        let max_attempts = self.config.max_attempts.clamp(1, MAX_ATTEMPT_CAP);
        let started = Instant::now();

        self.stats.write().total_requests += 1;

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.record_attempt(attempt);

            match self.send_once(&request, &correlation_id).await {
                AttemptOutcome::Success { status, body } => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    debug!(
                        correlation_id = %correlation_id,
                        status,
                        attempts = attempt,
                        duration_ms,
                        "Outbound call succeeded"
                    );
                    crate::metrics::record_http_call(attempt, true);
                    return Ok(ClientResponse {
                        status,
                        body,
                        correlation_id,
                        attempts: attempt,
                        duration_ms,
                    });
                }
                AttemptOutcome::HttpError { status, body } => {
                    if RETRYABLE_STATUSES.contains(&status) && attempt < max_attempts {
                        let delay = self.backoff_delay(attempt);
                        warn!(
                            correlation_id = %correlation_id,
                            status,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Transient HTTP error, retrying"
                        );
                        sleep(delay).await;
                        continue;
                    }

                    let kind = ErrorKind::classify(status, &body);
                    return Err(self.terminal_failure(
                        kind,
                        format!("HTTP {}: {}", status, truncate(&body, 200)),
                        correlation_id,
                        Some(status),
                        attempt,
                    ));
                }
                AttemptOutcome::Transport { kind, message } => {
                    if attempt < max_attempts {
                        let delay = self.backoff_delay(attempt);
                        warn!(
                            correlation_id = %correlation_id,
                            error = %message,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Transport error, retrying"
                        );
                        sleep(delay).await;
                        continue;
                    }

                    return Err(self.terminal_failure(kind, message, correlation_id, None, attempt));
                }
            }
        }
    }

    /// Snapshot of aggregate telemetry
    pub fn stats(&self) -> ClientStats {
        self.stats.read().clone()
    }

    /// Backoff before the attempt after `completed_attempts`.
    ///
    /// Base delay grows by `backoff_multiplier` each attempt; jitter is
    /// bounded below the gap to the next base delay, so successive
    /// delays strictly increase.
    fn backoff_delay(&self, completed_attempts: u32) -> Duration {
        let base = self.config.initial_backoff_ms as f64
            * self
                .config
                .backoff_multiplier
                .powi(completed_attempts as i32 - 1);

        let gap = (base * (self.config.backoff_multiplier - 1.0)) as u64;
        let jitter_bound = self.config.max_jitter_ms.min(gap.saturating_sub(1));
        let jitter = if jitter_bound > 0 {
            rand::thread_rng().gen_range(0..jitter_bound)
        } else {
            0
        };

        Duration::from_millis(base as u64 + jitter)
    }

    async fn send_once(&self, request: &OutboundRequest, correlation_id: &str) -> AttemptOutcome {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(CORRELATION_HEADER, correlation_id);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                if (200..300).contains(&status) {
                    AttemptOutcome::Success { status, body }
                } else {
                    AttemptOutcome::HttpError { status, body }
                }
            }
            Err(e) => {
                let kind = if e.is_timeout() {
                    ErrorKind::Timeout
                } else {
                    ErrorKind::Network
                };
                AttemptOutcome::Transport {
                    kind,
                    message: e.to_string(),
                }
            }
        }
    }

    fn record_attempt(&self, attempt: u32) {
        let mut stats = self.stats.write();
        stats.total_attempts += 1;
        if attempt > 1 {
            stats.total_retries += 1;
        }
    }

    fn terminal_failure(
        &self,
        kind: ErrorKind,
        message: String,
        correlation_id: String,
        status: Option<u16>,
        attempts: u32,
    ) -> HttpClientError {
        warn!(
            correlation_id = %correlation_id,
            kind = %kind,
            attempts,
            error = %message,
            "Outbound call failed"
        );

        *self
            .stats
            .write()
            .failures_by_kind
            .entry(kind.to_string())
            .or_insert(0) += 1;
        crate::metrics::record_http_call(attempts, false);

        HttpClientError::new(kind, message, correlation_id, status, attempts)
    }
}

enum AttemptOutcome {
    Success { status: u16, body: String },
    HttpError { status: u16, body: String },
    Transport { kind: ErrorKind, message: String },
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
