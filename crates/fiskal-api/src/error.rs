use thiserror::Error;

use crate::payload::Payload;
use crate::provisioning::ProvisionStep;

/// Top-level error type for the `fiskal-api` crate.
///
/// Configuration and operation-name failures are raised before any request
/// leaves the process. Transport and status failures come straight from the
/// dispatcher. The provisioning workflow folds everything into
/// [`Error::Workflow`] while keeping the original error as its source.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// One or more required settings are absent or empty.
    #[error("Missing configuration: {}", .missing.join(", "))]
    Configuration { missing: Vec<&'static str> },

    // ── Dispatch ────────────────────────────────────────────────────
    /// Unknown verb in a symbolic call, or unknown bulk operation name.
    #[error("Unsupported operation: {name}")]
    UnsupportedOperation { name: String },

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Invalid header name or value supplied by the caller.
    #[error("Invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// A JSON-shaped body failed to parse, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A request body could not be encoded as JSON.
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    // ── Provisioning ────────────────────────────────────────────────
    /// A device came back in a state the workflow cannot continue from.
    #[error("Unexpected TSS state: expected {expected}, got {actual}")]
    UnexpectedState {
        expected: &'static str,
        actual: String,
    },

    /// A provisioning step failed. `record` holds the local TSS record as it
    /// was when the step failed (absent if creation itself failed).
    #[error("TSS provisioning failed during {step}: {source}")]
    Workflow {
        step: ProvisionStep,
        record: Option<Box<Payload>>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// HTTP status carried by this error, looking through workflow wrapping.
    pub fn status(&self) -> Option<u16> {
        match self.root_cause() {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The innermost error, unwrapping any [`Error::Workflow`] layers.
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Self::Workflow { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns `true` if the service rejected the bearer token or credentials.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if the error was raised before any network activity.
    pub fn is_local(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::Configuration { .. } | Self::UnsupportedOperation { .. } | Self::InvalidHeader { .. }
        )
    }
}
