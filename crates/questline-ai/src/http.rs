//! Shared request plumbing for the service clients.

use std::time::Duration;

use questline_verification::ServiceError;

/// Longest slice of an error body kept in a `ServiceError::Status`.
const ERROR_BODY_LIMIT: usize = 100;

/// Builds a client with a whole-request timeout.
///
/// # Errors
///
/// Returns `ServiceError::Transport` if the TLS backend cannot be
/// initialised.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::Transport(format!("failed to build HTTP client: {e}")))
}

/// Maps a `reqwest` failure onto the service error model.
#[must_use]
pub fn transport_error(error: &reqwest::Error, timeout: Duration) -> ServiceError {
    if error.is_timeout() {
        ServiceError::Timeout(timeout)
    } else if error.is_decode() {
        ServiceError::Malformed(error.to_string())
    } else {
        ServiceError::Transport(error.to_string())
    }
}

/// Passes a successful response through; anything else becomes
/// `ServiceError::Status` carrying the start of the body.
///
/// # Errors
///
/// Returns `ServiceError::Status` for a non-success status code.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_LIMIT).collect(),
    })
}

/// Joins a base URL and a path without doubling the slash.
#[must_use]
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(
            endpoint("http://llm.local/", "/v1/chat/completions"),
            "http://llm.local/v1/chat/completions"
        );
        assert_eq!(endpoint("http://tts", "v1/x"), "http://tts/v1/x");
    }
}
