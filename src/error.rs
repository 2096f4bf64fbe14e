//! HTTP-facing error taxonomy.
//!
//! Component errors ([`TokenError`], [`DirectoryError`]) convert into
//! [`AppError`], which renders as a JSON `{"detail": "..."}` body. Upstream
//! and internal failures are logged with their detail and answered with a
//! fixed message.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::identity::DirectoryError;
use crate::token::TokenError;

const UPSTREAM_MESSAGE: &str = "Identity service is temporarily unavailable";
const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Request body is too large")]
    PayloadTooLarge,

    #[error("Request timed out")]
    Timeout,

    /// Identity directory unreachable or misbehaving. Detail is logged only.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Bugs and signing failures. Detail is logged only.
    #[error("internal failure: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated() -> Self {
        Self::Authentication("Could not validate credentials".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Upstream(_) => UPSTREAM_MESSAGE.to_string(),
            Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Upstream(detail) => {
                tracing::error!(name: "http.error.upstream", detail = %detail, "Identity directory failure");
            }
            Self::Internal(detail) => {
                tracing::error!(name: "http.error.internal", detail = %detail, "Internal error");
            }
            _ => {}
        }

        let status = self.status();
        let body = Json(json!({ "detail": self.public_message() }));
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::Authentication("Token has expired".to_string()),
            TokenError::Signing(e) => Self::Internal(format!("token signing failed: {e}")),
            TokenError::LifetimeOutOfRange => {
                Self::Internal("token lifetime is out of range".to_string())
            }
            _ => Self::Authentication("Invalid authentication credentials".to_string()),
        }
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation(msg) => Self::Validation(msg),
            DirectoryError::Conflict => {
                Self::Conflict("An account with this email already exists".to_string())
            }
            DirectoryError::NotFound => Self::NotFound("User not found".to_string()),
            DirectoryError::InvalidCredentials => {
                Self::Authentication("Invalid email or password".to_string())
            }
            DirectoryError::Disabled => Self::Authentication("Account is disabled".to_string()),
            DirectoryError::Upstream(detail) => Self::Upstream(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_detail_not_exposed() {
        let err = AppError::Upstream("connect to 10.0.0.4:443 refused".to_string());
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.public_message(), UPSTREAM_MESSAGE);
    }

    #[test]
    fn test_directory_error_mapping() {
        assert_eq!(
            AppError::from(DirectoryError::Conflict).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(DirectoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(DirectoryError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(DirectoryError::Validation("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_timeout_renders_as_json() {
        let response = AppError::Timeout.into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = AppError::unauthenticated().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
