//! OAuth2 provider registrations and principal normalization
//!
//! Each supported identity provider gets one immutable registration built
//! at startup from configuration. Provider-specific attribute names
//! (`avatar_url` vs `picture`, `id` vs `sub`) are normalized here so they
//! never leak into handler code.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{ProviderSettings, ProvidersConfig};
use crate::error::AppError;

/// Supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Github => "github",
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Provider::Github),
            "google" => Ok(Provider::Google),
            other => Err(AppError::UnknownProvider(other.to_string())),
        }
    }
}

/// One provider's OAuth2 client registration
///
/// Read-only after startup. The client secret is only ever used for the
/// token-exchange request and is deliberately excluded from `Debug` output.
#[derive(Clone)]
pub struct ProviderRegistration {
    pub provider: Provider,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl fmt::Debug for ProviderRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistration")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

impl ProviderRegistration {
    fn from_settings(provider: Provider, settings: &ProviderSettings) -> Self {
        let (default_scopes, authorize, token, userinfo): (&[&str], _, _, _) = match provider {
            Provider::Github => (
                &["read:user", "user:email"],
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
                "https://api.github.com/user",
            ),
            Provider::Google => (
                &["openid", "profile", "email"],
                "https://accounts.google.com/o/oauth2/v2/auth",
                "https://oauth2.googleapis.com/token",
                "https://openidconnect.googleapis.com/v1/userinfo",
            ),
        };

        Self {
            provider,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            scopes: settings
                .scopes
                .clone()
                .unwrap_or_else(|| default_scopes.iter().map(ToString::to_string).collect()),
            authorize_url: settings
                .authorize_url
                .clone()
                .unwrap_or_else(|| authorize.to_string()),
            token_url: settings
                .token_url
                .clone()
                .unwrap_or_else(|| token.to_string()),
            userinfo_url: settings
                .userinfo_url
                .clone()
                .unwrap_or_else(|| userinfo.to_string()),
        }
    }

    /// Space-separated scope string for the authorization redirect
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Immutable table of configured provider registrations
///
/// Built once at startup and shared by reference through `AppState`;
/// there is no ambient global registry.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    registrations: Vec<Arc<ProviderRegistration>>,
}

impl ProviderRegistry {
    pub fn from_config(providers: &ProvidersConfig) -> Self {
        let mut registrations = Vec::new();
        if let Some(settings) = &providers.github {
            registrations.push(Arc::new(ProviderRegistration::from_settings(
                Provider::Github,
                settings,
            )));
        }
        if let Some(settings) = &providers.google {
            registrations.push(Arc::new(ProviderRegistration::from_settings(
                Provider::Google,
                settings,
            )));
        }
        Self { registrations }
    }

    pub fn get(&self, provider: Provider) -> Result<Arc<ProviderRegistration>, AppError> {
        self.registrations
            .iter()
            .find(|r| r.provider == provider)
            .cloned()
            .ok_or_else(|| AppError::UnknownProvider(provider.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderRegistration>> {
        self.registrations.iter()
    }
}

/// The authenticated user's normalized attribute bag
///
/// Created once per successful provider callback and owned by the active
/// session; immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identifier at the provider (GitHub `id`, Google `sub`)
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: Provider,
    /// Raw user-info payload as returned by the provider
    pub raw_attributes: Map<String, Value>,
}

impl Principal {
    /// Normalize a provider user-info payload into the common shape
    ///
    /// # Errors
    /// `MalformedUserInfo` if the payload carries neither a stable id nor
    /// an email address — there is nothing to identify the user by.
    pub fn from_raw(provider: Provider, raw: Map<String, Value>) -> Result<Self, AppError> {
        let (id, display_name, email, avatar_url) = match provider {
            Provider::Github => (
                attr_as_string(&raw, "id"),
                attr_as_string(&raw, "name").or_else(|| attr_as_string(&raw, "login")),
                attr_as_string(&raw, "email"),
                attr_as_string(&raw, "avatar_url"),
            ),
            Provider::Google => (
                attr_as_string(&raw, "sub"),
                attr_as_string(&raw, "name"),
                attr_as_string(&raw, "email"),
                attr_as_string(&raw, "picture"),
            ),
        };

        let id = match (id, &email) {
            (Some(id), _) => id,
            // Fall back to email as the identity key when the provider
            // omits a numeric id but still identifies the account.
            (None, Some(email)) => email.clone(),
            (None, None) => {
                return Err(AppError::MalformedUserInfo(
                    "user info payload has neither id nor email".to_string(),
                ));
            }
        };

        Ok(Self {
            id,
            display_name,
            email,
            avatar_url,
            provider,
            raw_attributes: raw,
        })
    }

    /// Identity key for the single-session-per-user invariant
    pub fn identity(&self) -> String {
        format!("{}:{}", self.provider, self.id)
    }

    /// Email if present, otherwise the provider id — used for audit logs
    pub fn email_or_id(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

/// Read an attribute as a string, stringifying numeric ids
fn attr_as_string(raw: &Map<String, Value>, key: &str) -> Option<String> {
    match raw.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
