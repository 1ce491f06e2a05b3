//! OAuth2 user loading
//!
//! After the token exchange, the provider's user-info endpoint is queried
//! with the access token and the response is normalized into a `Principal`.
//! One audit record is emitted per successful load; this is the only
//! business logic layered on top of the pass-through.

use serde_json::{Map, Value};

use crate::error::AppError;

use super::provider::{Principal, ProviderRegistration};

/// Fetch and normalize the authenticated user's profile
///
/// # Errors
/// - `UserInfoFetch` on a non-2xx response or a timed-out request
/// - `MalformedUserInfo` when the payload lacks the required identity fields
pub async fn load_user(
    client: &reqwest::Client,
    registration: &ProviderRegistration,
    access_token: &str,
) -> Result<Principal, AppError> {
    let response = client
        .get(&registration.userinfo_url)
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| AppError::UserInfoFetch(e.to_string()))?;

    if !response.status().is_success() {
        return Err(AppError::UserInfoFetch(format!(
            "user-info endpoint returned {}",
            response.status()
        )));
    }

    let raw: Map<String, Value> = response
        .json()
        .await
        .map_err(|e| AppError::MalformedUserInfo(e.to_string()))?;

    let principal = Principal::from_raw(registration.provider, raw)?;

    // Audit trail: one record per successful login, provider + identity.
    tracing::info!(
        provider = %registration.provider,
        email = %principal.email_or_id(),
        "user authenticated"
    );

    Ok(principal)
}
