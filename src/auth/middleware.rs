//! Authentication middleware
//!
//! The route guard runs ahead of handler dispatch on every request: public
//! paths pass through, API paths pass through for the handlers to answer
//! with their JSON error body, and any other path without a live session is
//! redirected to the login page before it can reach a handler.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::session::Session;
use crate::AppState;
use crate::error::AppError;

/// Name of the session cookie; carries only the opaque session id
pub const SESSION_COOKIE: &str = "SESSION_ID";

fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
}

async fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    let session_id = session_id_from_headers(headers).ok_or(AppError::NotAuthenticated)?;
    state.sessions.get(&session_id).await
}

/// Route authorization guard
///
/// Evaluated before dispatch for every inbound request. A valid session's
/// principal is attached to the request either way, so public pages can
/// still greet a signed-in user.
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    match authenticate(request.headers(), &state).await {
        Ok(session) => {
            request.extensions_mut().insert(session.principal);
        }
        Err(_) => {
            let is_api = path == "/api" || path.starts_with("/api/");
            if !state.policy.is_public(&path) && !is_api {
                tracing::debug!(path = %path, "unauthenticated request, redirecting to login");
                return Redirect::to("/login").into_response();
            }
        }
    }

    next.run(request).await
}

/// Extractor for the current authenticated principal
///
/// Use in handlers that require a session.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(principal): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", principal.email_or_id())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub super::provider::Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<super::provider::Principal>().cloned() {
            return Ok(CurrentUser(principal));
        }

        let state = AppState::from_ref(state);
        let session = authenticate(&parts.headers, &state).await?;
        parts.extensions.insert(session.principal.clone());

        Ok(CurrentUser(session.principal))
    }
}

/// Optional principal extractor
///
/// Returns None if not authenticated, instead of rejecting. API handlers
/// use this to report `{"error": "Not authenticated"}` themselves.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<super::provider::Principal>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<super::provider::Principal>().cloned() {
            return Ok(MaybeUser(Some(principal)));
        }

        let app_state = AppState::from_ref(state);
        let principal = authenticate(&parts.headers, &app_state)
            .await
            .ok()
            .map(|session| session.principal);

        if let Some(principal) = &principal {
            parts.extensions.insert(principal.clone());
        }

        Ok(MaybeUser(principal))
    }
}
