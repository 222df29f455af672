//! Error types for nfsn-dns.

use thiserror::Error;

/// Result type alias for nfsn-dns.
pub type Result<T> = std::result::Result<T, NfsnError>;

/// Error taxonomy shared by the API client, IP resolver and reconcile engine.
#[derive(Error, Debug)]
pub enum NfsnError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection, DNS resolution or timeout failure on an outbound call.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status.
    #[error("Protocol error (HTTP {status}): {message}")]
    Protocol { status: u16, message: String },

    /// Error payload embedded in an otherwise successful provider response.
    ///
    /// The client only logs these; callers opt into raising them through
    /// [`ApiResponse::into_result`](crate::nfsn::ApiResponse::into_result).
    #[error("Application error: {code}{}", debug_suffix(.debug))]
    Application { code: String, debug: Option<String> },

    /// Malformed IP literal, zone line or response shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn debug_suffix(debug: &Option<String>) -> String {
    debug
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

impl From<reqwest::Error> for NfsnError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => NfsnError::Protocol {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => NfsnError::Transport(e.to_string()),
        }
    }
}

impl From<hickory_resolver::ResolveError> for NfsnError {
    fn from(e: hickory_resolver::ResolveError) -> Self {
        NfsnError::Transport(e.to_string())
    }
}

impl From<std::net::AddrParseError> for NfsnError {
    fn from(e: std::net::AddrParseError) -> Self {
        NfsnError::Parse(e.to_string())
    }
}

impl From<toml::de::Error> for NfsnError {
    fn from(e: toml::de::Error) -> Self {
        NfsnError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for NfsnError {
    fn from(e: serde_json::Error) -> Self {
        NfsnError::Parse(e.to_string())
    }
}
