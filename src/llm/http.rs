//! Shared HTTP client and SSE parsing utilities.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::PulseError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Parse an SSE "data:" line, returning None for "[DONE]".
pub fn parse_sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data: ")?;
    if data == "[DONE]" {
        return None;
    }
    Some(data)
}

/// Map an HTTP status code to the corresponding error.
pub fn status_to_error(status: u16, body: &str) -> PulseError {
    match status {
        401 | 403 => PulseError::Authentication(body.to_string()),
        429 => PulseError::RateLimited {
            retry_after_ms: None,
        },
        _ => PulseError::api(status, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_data_lines_parse() {
        assert_eq!(parse_sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(parse_sse_data("data: [DONE]"), None);
        assert_eq!(parse_sse_data("event: message"), None);
    }

    #[test]
    fn status_codes_map_to_errors() {
        assert!(matches!(
            status_to_error(401, "nope"),
            PulseError::Authentication(_)
        ));
        assert!(matches!(
            status_to_error(429, "slow"),
            PulseError::RateLimited { .. }
        ));
        assert!(matches!(
            status_to_error(500, "boom"),
            PulseError::Api { status: 500, .. }
        ));
    }
}
