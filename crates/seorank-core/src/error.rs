//! Error types for measurement and ranking

use thiserror::Error;

/// Fatal errors raised while measuring a page.
///
/// Soft failures (page snapshot, robots.txt, sitemap) never surface here; they are folded into
/// the report as result objects instead.
#[derive(Error, Debug)]
pub enum MeasureError {
    #[error("Empty URL")]
    EmptyUrl,

    #[error("Invalid URL {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Unable to reach {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("PageSpeed request failed with status {status}: {detail}")]
    Upstream { status: u16, detail: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid PageSpeed response: {0}")]
    InvalidResponse(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Errors reported by a key/value backend.
#[derive(Error, Debug)]
pub enum KvError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure reported by a store outside this crate, such as a remote KV service
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors raised by the ranking store.
#[derive(Error, Debug)]
pub enum RankingError {
    #[error("Key/value error: {0}")]
    Kv(#[from] KvError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
