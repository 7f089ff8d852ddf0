//! Mapping of HTTP failures onto the core error taxonomy.

use deadline_core::error::{DeadlineError, DeadlineResult};
use reqwest::{Response, StatusCode};

use crate::types::ErrorResponse;

const RATE_LIMIT_REASONS: [&str; 2] = ["rateLimitExceeded", "userRateLimitExceeded"];

/// Pass successful responses through, turn everything else into an error.
pub(crate) async fn check(response: Response) -> DeadlineResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(from_status(status, &body))
}

pub(crate) fn from_status(status: StatusCode, body: &str) -> DeadlineError {
    let detail = serde_json::from_str::<ErrorResponse>(body).ok().map(|r| r.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let rate_limited = detail.as_ref().is_some_and(|d| {
        d.errors
            .iter()
            .any(|e| RATE_LIMIT_REASONS.contains(&e.reason.as_str()))
    });

    match status {
        StatusCode::TOO_MANY_REQUESTS => DeadlineError::RateLimited(message),
        StatusCode::FORBIDDEN if rate_limited => DeadlineError::RateLimited(message),
        StatusCode::UNAUTHORIZED => DeadlineError::Auth(message),
        _ => DeadlineError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

pub(crate) fn from_transport(e: reqwest::Error) -> DeadlineError {
    if e.is_decode() {
        DeadlineError::Serialization(e.to_string())
    } else if let Some(status) = e.status() {
        from_status(status, "")
    } else {
        // Timeouts, refused connections, DNS and TLS trouble.
        DeadlineError::Transient(e.to_string())
    }
}
