use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum FailureKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    Server,
    Network,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::Validation => "validation",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Forbidden => "forbidden",
            FailureKind::NotFound => "not found",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Server => "server",
            FailureKind::Network => "network",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload shape used by the backend. Either field may carry the text.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    /// Pull a human-readable message out of an error body, falling back to the
    /// raw (truncated) text when it is not the usual JSON shape.
    fn message_from_body(body: &str) -> String {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message.or(parsed.error))
            .filter(|m| !m.trim().is_empty());
        Self::truncate_body(message.as_deref().unwrap_or(body))
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::message_from_body(body);
        match status.as_u16() {
            400 | 422 => ApiError::Validation(message),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Validation(_) => FailureKind::Validation,
            ApiError::Unauthorized => FailureKind::Unauthorized,
            ApiError::AccessDenied(_) => FailureKind::Forbidden,
            ApiError::NotFound(_) => FailureKind::NotFound,
            ApiError::RateLimited => FailureKind::RateLimited,
            ApiError::ServerError(_) | ApiError::InvalidResponse(_) => FailureKind::Server,
            ApiError::NetworkError(_) => FailureKind::Network,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::NetworkError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_classification() {
        assert_eq!(
            ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "").kind(),
            FailureKind::Validation
        );
        assert_eq!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "expired"),
            ApiError::Unauthorized
        );
        assert_eq!(
            ApiError::from_status(StatusCode::FORBIDDEN, "").kind(),
            FailureKind::Forbidden
        );
        assert_eq!(
            ApiError::from_status(StatusCode::NOT_FOUND, "").kind(),
            FailureKind::NotFound
        );
        assert_eq!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        );
        assert_eq!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "").kind(),
            FailureKind::Server
        );
        assert_eq!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, "").kind(),
            FailureKind::Server
        );
    }

    #[test]
    fn test_message_prefers_json_field() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"message":"Title is required"}"#,
        );
        assert_eq!(err, ApiError::Validation("Title is required".to_string()));

        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"error":"Tour not found"}"#);
        assert_eq!(err, ApiError::NotFound("Tour not found".to_string()));
    }

    #[test]
    fn test_message_falls_back_to_body() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded");
        assert_eq!(err, ApiError::ServerError("upstream exploded".to_string()));
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 100);
        let ApiError::ServerError(message) =
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body)
        else {
            panic!("expected server error");
        };
        assert!(message.contains("truncated, 600 total bytes"));
        assert!(message.len() < body.len());
    }
}
