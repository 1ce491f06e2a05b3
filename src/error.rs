//! Error types for Gatehouse
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Callback state does not match a pending login nonce (anti-CSRF)
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Provider reported denial or an error instead of an authorization code
    #[error("Provider denied authorization: {0}")]
    ProviderDenied(String),

    /// Token endpoint returned non-2xx, timed out, or sent a malformed payload
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// User-info endpoint returned non-2xx or timed out
    #[error("User info fetch failed: {0}")]
    UserInfoFetch(String),

    /// User-info payload is missing required identity fields
    #[error("Malformed user info: {0}")]
    MalformedUserInfo(String),

    /// Callback for a provider that is not configured
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// API access without an authenticated session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Session exists but passed its idle or absolute timeout
    #[error("Session expired")]
    SessionExpired,

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Whether this error belongs to the login flow.
    ///
    /// Login-flow errors never surface as HTTP error payloads; they are
    /// absorbed at the flow boundary and turned into a redirect to the
    /// login page with an error indicator. No partial session exists by
    /// the time any of these is raised.
    pub fn is_login_flow(&self) -> bool {
        matches!(
            self,
            AppError::StateMismatch
                | AppError::ProviderDenied(_)
                | AppError::TokenExchange(_)
                | AppError::UserInfoFetch(_)
                | AppError::MalformedUserInfo(_)
                | AppError::UnknownProvider(_)
        )
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Login-flow failures redirect to `/login?error=true`. Missing or
    /// expired sessions on API endpoints answer with the JSON body
    /// `{"error": "Not authenticated"}` and HTTP 200 — this matches the
    /// behavior clients of the original system already depend on; switching
    /// to 401 would be a one-line change here (see DESIGN.md). Everything
    /// else maps to a 5xx JSON error.
    fn into_response(self) -> Response {
        use axum::Json;

        if self.is_login_flow() {
            tracing::warn!(error = %self, "login flow failed");
            return Redirect::to("/login?error=true").into_response();
        }

        let (status, error_message) = match &self {
            AppError::NotAuthenticated | AppError::SessionExpired => {
                (StatusCode::OK, "Not authenticated".to_string())
            }
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            // is_login_flow() variants are handled above
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
