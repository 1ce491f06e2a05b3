//! OAuth2 authorization-code flow
//!
//! Implements the login sequencing: redirect to the provider with a fresh
//! state nonce, then handle the callback — state check, code-for-token
//! exchange, user loading, session installation. Every failure on the way
//! surfaces as a redirect to `/login?error=true` (see `error.rs`); no
//! partial session is ever created.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;

use super::middleware::SESSION_COOKIE;
use super::provider::{Provider, ProviderRegistration};
use super::user_loader::load_user;

/// Correlation cookie tying a login attempt to the browser that started it
///
/// Set when the flow begins and required on the callback; a callback from a
/// browser that never initiated the flow fails as a state mismatch even if
/// it presents a valid state nonce.
pub const LOGIN_COOKIE: &str = "OAUTH_LOGIN_ID";

/// Create authentication router
///
/// Routes:
/// - GET /oauth2/authorize/:provider - Redirect to the provider
/// - GET /oauth2/callback/:provider - OAuth callback
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/oauth2/authorize/:provider", get(authorize_redirect))
        .route("/oauth2/callback/:provider", get(oauth_callback))
        .route("/logout", post(logout))
}

// =============================================================================
// Authorization redirect
// =============================================================================

/// GET /oauth2/authorize/:provider
///
/// Issues a single-use state nonce bound to the provider and to this
/// browser (via the correlation cookie), then redirects to the provider's
/// authorization endpoint.
async fn authorize_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let provider: Provider = provider.parse()?;
    let registration = state.providers.get(provider)?;

    let issued = state.sessions.issue_state(provider).await;
    let redirect_uri = callback_uri(&state, provider);

    let location = format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        registration.authorize_url,
        urlencoding::encode(&registration.client_id),
        urlencoding::encode(&redirect_uri),
        urlencoding::encode(&registration.scope_param()),
        urlencoding::encode(&issued.state),
    );

    let login_cookie = Cookie::build((LOGIN_COOKIE, issued.login_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .build();

    tracing::debug!(provider = %provider, "redirecting to provider authorization endpoint");
    Ok((jar.add(login_cookie), Redirect::to(&location)))
}

fn callback_uri(state: &AppState, provider: Provider) -> String {
    format!(
        "{}/oauth2/callback/{}",
        state.config.server.base_url(),
        provider
    )
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code (absent when the provider denied)
    code: Option<String>,
    /// Echoed state nonce
    state: Option<String>,
    /// Provider error indicator (e.g. `access_denied`)
    error: Option<String>,
    error_description: Option<String>,
}

/// Token endpoint response payload
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// GET /oauth2/callback/:provider
///
/// Completes the login flow. Order matters: the state nonce is consumed
/// before anything else so that a replayed callback fails closed, and the
/// session is only created after the user was loaded successfully.
async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let provider: Provider = provider.parse()?;
    let registration = state.providers.get(provider)?;

    if let Some(error) = query.error {
        let detail = query.error_description.unwrap_or(error);
        return Err(AppError::ProviderDenied(detail));
    }

    let nonce = query.state.ok_or(AppError::StateMismatch)?;
    let login_id = jar
        .get(LOGIN_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .unwrap_or_default();
    state
        .sessions
        .consume_state(&nonce, provider, &login_id)
        .await?;

    let code = query
        .code
        .ok_or_else(|| AppError::ProviderDenied("callback carried no code".to_string()))?;

    let access_token = exchange_code(&state, &registration, &code, provider).await?;
    let principal = load_user(&state.http_client, &registration, &access_token).await?;

    let session = state.sessions.create(principal).await;

    let cookie = Cookie::build((SESSION_COOKIE, session.id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .build();

    // The correlation cookie has served its purpose.
    let removal = Cookie::build((LOGIN_COOKIE, "")).path("/").build();

    // Default post-login destination, regardless of the original request.
    Ok((jar.remove(removal).add(cookie), Redirect::to("/home")))
}

/// Exchange an authorization code for an access token
///
/// Direct (non-browser) form POST to the token endpoint, authenticated
/// with the client id and secret. A timeout, a non-2xx response, or a
/// payload without an `access_token` all map to `TokenExchange`.
async fn exchange_code(
    state: &AppState,
    registration: &ProviderRegistration,
    code: &str,
    provider: Provider,
) -> Result<String, AppError> {
    let redirect_uri = callback_uri(state, provider);
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", registration.client_id.as_str()),
        ("client_secret", registration.client_secret.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
    ];

    let response = state
        .http_client
        .post(&registration.token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&params)
        .send()
        .await
        .map_err(|e| AppError::TokenExchange(e.to_string()))?;

    if !response.status().is_success() {
        return Err(AppError::TokenExchange(format!(
            "token endpoint returned {}",
            response.status()
        )));
    }

    let payload: TokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::TokenExchange(e.to_string()))?;

    payload
        .access_token
        .ok_or_else(|| AppError::TokenExchange("token payload without access_token".to_string()))
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Invalidates the server-side session, clears the cookie, and lands on
/// the public page. Safe to call without a session.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Some(session) = state.sessions.invalidate(cookie.value()).await {
            tracing::info!(
                provider = %session.principal.provider,
                email = %session.principal.email_or_id(),
                "user logged out"
            );
        }
    }

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (jar.remove(removal), Redirect::to("/"))
}
