//! Error types for the remote gateway
//!
//! Two layers:
//! - [`TransportError`]: raised by a [`crate::Transport`] before a response
//!   body could be obtained
//! - [`GatewayError`]: what callers of [`crate::Gateway`] see after retry and
//!   envelope decoding

/// Failure to obtain a response body
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection or timeout failure; worth retrying
    #[error("transient transport failure: {0}")]
    Transient(String),

    /// Any other failure (bad URL, TLS setup, undecodable body)
    #[error("transport failure: {0}")]
    Fatal(String),
}

impl TransportError {
    /// Whether the retry policy applies
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// One entry of the envelope's `errors` list
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RemoteErrorDetail {
    /// Human-readable message
    pub message: String,
    /// Optional machine code
    #[serde(default)]
    pub code: Option<String>,
}

impl std::fmt::Display for RemoteErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Gateway errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transient failures on every allowed attempt
    #[error("giving up after {attempts} attempts: {last}")]
    TransientExhausted { attempts: u32, last: String },

    /// Response carried a non-empty `errors` list
    #[error("remote rejected {path}: {}", join_details(.errors))]
    RemoteApplication {
        path: String,
        errors: Vec<RemoteErrorDetail>,
    },

    /// Non-retryable transport failure
    #[error("transport error on {path}: {message}")]
    Transport { path: String, message: String },

    /// Body was not a response envelope
    #[error("malformed response from {path}: {message}")]
    MalformedResponse { path: String, message: String },

    /// `data` did not match the expected shape
    #[error("unexpected payload from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    /// Whether the failure came from exhausting transient retries
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientExhausted { .. })
    }
}

fn join_details(errors: &[RemoteErrorDetail]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
