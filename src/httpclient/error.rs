use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Classification of a terminal outbound-call failure.
///
/// Callers branch on the kind, never on raw status codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    RateLimited,
    Timeout,
    Network,
    ServerError,
    Unknown,
}

impl ErrorKind {
    /// Classify a non-success HTTP response.
    ///
    /// Ambiguous codes (412/422/500) are disambiguated by response-body
    /// content.
    pub fn classify(status: u16, body: &str) -> Self {
        let body_lower = body.to_lowercase();

        match status {
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            400 => ErrorKind::Validation,
            408 => ErrorKind::Timeout,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            412 => {
                if body_lower.contains("invalid") || body_lower.contains("validation") {
                    ErrorKind::Validation
                } else {
                    ErrorKind::Conflict
                }
            }
            422 => {
                if body_lower.contains("duplicate") || body_lower.contains("already exists") {
                    ErrorKind::Conflict
                } else {
                    ErrorKind::Validation
                }
            }
            500 => {
                if body_lower.contains("timed out") || body_lower.contains("timeout") {
                    ErrorKind::Timeout
                } else if body_lower.contains("connection") || body_lower.contains("unreachable") {
                    ErrorKind::Network
                } else {
                    ErrorKind::ServerError
                }
            }
            501..=599 => ErrorKind::ServerError,
            _ => ErrorKind::Unknown,
        }
    }

    /// Kinds the retry policy considers transient.
    ///
    /// `unknown` is deliberately non-retryable so unclassified failures
    /// cannot loop.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::Timeout | ErrorKind::Network | ErrorKind::ServerError
        )
    }
}

/// Terminal failure of one logical outbound call.
///
/// Carries the correlation ID shared by all attempts of the call and the
/// number of attempts actually made.
#[derive(Debug, Clone, Error)]
#[error("{kind} ({correlation_id}): {message}")]
pub struct HttpClientError {
    pub kind: ErrorKind,
    pub message: String,
    pub correlation_id: String,
    pub status: Option<u16>,
    pub attempts: u32,
}

impl HttpClientError {
    pub fn new(
        kind: ErrorKind,
        message: String,
        correlation_id: String,
        status: Option<u16>,
        attempts: u32,
    ) -> Self {
        Self {
            kind,
            message,
            correlation_id,
            status,
            attempts,
        }
    }
}
