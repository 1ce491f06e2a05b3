//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::fmt;
use std::net::IpAddr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub providers: ProvidersConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "sso.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the application
    ///
    /// # Returns
    /// Full URL like "https://sso.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Absolute session lifetime in seconds (default: 604800 = 7 days)
    pub max_age: i64,
    /// Idle timeout in seconds (default: 3600 = 1 hour)
    pub idle_timeout: i64,
    /// Lifetime of a pending login state nonce in seconds (default: 600)
    pub state_ttl: i64,
}

/// OAuth2 provider registrations
///
/// At least one provider must be configured. Endpoint URLs default to the
/// provider's well-known endpoints and only need to be set explicitly when
/// pointing at a stand-in provider (tests, local stubs).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersConfig {
    pub github: Option<ProviderSettings>,
    pub google: Option<ProviderSettings>,
}

/// Per-provider OAuth2 client registration
#[derive(Clone, Deserialize)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Requested scopes; defaults per provider when omitted
    pub scopes: Option<Vec<String>>,
    /// Authorization endpoint override
    pub authorize_url: Option<String>,
    /// Token endpoint override
    pub token_url: Option<String>,
    /// User-info endpoint override
    pub userinfo_url: Option<String>,
}

// The client secret must never reach the logs, not even through a stray
// debug-print of the whole AppConfig.
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (GATEHOUSE__*)
    ///
    /// Provider client secrets are expected to arrive via file or
    /// environment; they are never logged.
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.protocol", "http")?
            .set_default("session.max_age", 604_800)?
            .set_default("session.idle_timeout", 3600)?
            .set_default("session.state_ttl", 600)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (GATEHOUSE__*)
            .add_source(
                Environment::with_prefix("GATEHOUSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.providers.github.is_none() && self.providers.google.is_none() {
            return Err(crate::error::AppError::Config(
                "at least one OAuth2 provider must be configured".to_string(),
            ));
        }

        for (name, settings) in [
            ("github", self.providers.github.as_ref()),
            ("google", self.providers.google.as_ref()),
        ] {
            if let Some(settings) = settings {
                if settings.client_id.trim().is_empty() {
                    return Err(crate::error::AppError::Config(format!(
                        "providers.{name}.client_id must not be empty"
                    )));
                }
                if settings.client_secret.trim().is_empty() {
                    return Err(crate::error::AppError::Config(format!(
                        "providers.{name}.client_secret must not be empty"
                    )));
                }
            }
        }

        if self.session.max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "session.max_age must be greater than 0".to_string(),
            ));
        }
        if self.session.idle_timeout <= 0 {
            return Err(crate::error::AppError::Config(
                "session.idle_timeout must be greater than 0".to_string(),
            ));
        }
        if self.session.state_ttl <= 0 {
            return Err(crate::error::AppError::Config(
                "session.state_ttl must be greater than 0".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
