use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure modes of a remote read, as the retry policy needs to see them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited until {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("request failed: {0}")]
    Fatal(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

/// How an HTTP error status should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    NotFound,
    RateLimited,
    Transient,
    Fatal,
}

pub fn classify_status(status: u16, message: &str) -> StatusClass {
    match status {
        404 => StatusClass::NotFound,
        429 => StatusClass::RateLimited,
        403 if message.to_lowercase().contains("rate limit") => StatusClass::RateLimited,
        500 | 502 | 503 | 504 => StatusClass::Transient,
        _ => StatusClass::Fatal,
    }
}

const TRANSPORT_MARKERS: &[&str] = &[
    "connection reset",
    "connection refused",
    "connection closed",
    "timed out",
    "timeout",
    "tls",
    "ssl",
    "handshake",
    "dns",
    "failed to lookup",
    "resolve",
    "socket",
    "broken pipe",
];

/// First line of each error in the source chain. Some errors (octocrab's
/// included) append a backtrace to their `Display` after a line break.
fn chain_headlines(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = Some(error);
    while let Some(err) = current {
        let text = err.to_string();
        let headline = text.lines().next().unwrap_or_default().trim().to_string();
        if !headline.is_empty() {
            chain.push(headline);
        }
        current = err.source();
    }
    chain
}

/// One-line description of an error and its causes, without backtraces.
pub fn describe_error(error: &(dyn std::error::Error + 'static)) -> String {
    let mut parts: Vec<String> = Vec::new();
    for headline in chain_headlines(error) {
        // Wrappers often repeat their source's message verbatim.
        if !parts.iter().any(|seen| seen.contains(&headline)) {
            parts.push(headline);
        }
    }
    parts.join(": ")
}

/// Whether a non-HTTP failure looks like a network or TLS hiccup.
pub fn is_transport_failure(error: &(dyn std::error::Error + 'static)) -> bool {
    chain_headlines(error).iter().any(|headline| {
        let headline = headline.to_lowercase();
        TRANSPORT_MARKERS.iter().any(|marker| headline.contains(marker))
    })
}
