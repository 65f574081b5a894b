use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::MeasureError;
use crate::types::Scope;

static RE_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z]+://").expect("invalid scheme regex"));

/// Query fragments that mark a URL as carrying tracking parameters.
pub const TRACKING_PATTERNS: &[&str] = &["utm_", "ref=", "source=", "campaign="];

/// Trim user input, default the scheme to https and parse it.
pub fn normalize_url(raw: &str) -> Result<Url, MeasureError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MeasureError::EmptyUrl);
    }

    let prefixed = if RE_SCHEME.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    Url::parse(&prefixed).map_err(|e| MeasureError::InvalidUrl {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })
}

/// Scheme, host and optional port, without a trailing slash
pub fn origin_of(url: &Url) -> String {
    url.origin()
        .ascii_serialization()
        .trim_end_matches('/')
        .to_string()
}

pub fn scope_of(url: &Url) -> Scope {
    match url.path() {
        "" | "/" => Scope::Root,
        _ => Scope::Page,
    }
}

pub fn has_tracking_parameters(url: &str) -> bool {
    TRACKING_PATTERNS.iter().any(|pattern| url.contains(pattern))
}
