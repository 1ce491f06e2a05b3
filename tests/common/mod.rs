//! Common test utilities for E2E tests

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use gatehouse::{AppState, config};

pub const TEST_CLIENT_ID: &str = "test-client-id";
pub const TEST_CLIENT_SECRET: &str = "test-client-secret";
pub const TEST_CODE: &str = "abc123";
pub const TEST_ACCESS_TOKEN: &str = "T";

// =============================================================================
// Mock identity provider
// =============================================================================

/// In-process stand-in for a provider's token and user-info endpoints
#[derive(Clone)]
pub struct MockProvider {
    pub addr: String,
    user_payload: Arc<RwLock<Value>>,
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    grant_type: String,
    code: String,
    client_id: String,
    client_secret: String,
    #[allow(dead_code)]
    redirect_uri: String,
}

async fn token_endpoint(Form(request): Form<TokenRequest>) -> Response {
    if request.grant_type == "authorization_code"
        && request.code == TEST_CODE
        && request.client_id == TEST_CLIENT_ID
        && request.client_secret == TEST_CLIENT_SECRET
    {
        Json(json!({
            "access_token": TEST_ACCESS_TOKEN,
            "token_type": "bearer",
            "scope": "read:user",
        }))
        .into_response()
    } else {
        StatusCode::BAD_REQUEST.into_response()
    }
}

async fn userinfo_endpoint(State(provider): State<MockProvider>, headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TEST_ACCESS_TOKEN}"))
        .unwrap_or(false);

    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload = provider.user_payload.read().await.clone();
    Json(payload).into_response()
}

impl MockProvider {
    /// Spawn the mock provider on a random port
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let provider = Self {
            addr,
            user_payload: Arc::new(RwLock::new(json!({
                "id": 583231,
                "login": "ada",
                "name": "Ada",
                "email": "ada@x.com",
                "avatar_url": "https://avatars.example.com/ada.png",
            }))),
        };

        let router = Router::new()
            .route("/token", post(token_endpoint))
            .route("/user", get(userinfo_endpoint))
            .with_state(provider.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        provider
    }

    /// Replace the user-info payload served for the next requests
    pub async fn set_user_payload(&self, payload: Value) {
        *self.user_payload.write().await = payload;
    }
}

// =============================================================================
// Application under test
// =============================================================================

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub provider: MockProvider,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server wired to a fresh mock provider
    pub async fn new() -> Self {
        let provider = MockProvider::spawn().await;

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            session: config::SessionConfig {
                max_age: 604_800,
                idle_timeout: 3600,
                state_ttl: 600,
            },
            providers: config::ProvidersConfig {
                github: Some(config::ProviderSettings {
                    client_id: TEST_CLIENT_ID.to_string(),
                    client_secret: TEST_CLIENT_SECRET.to_string(),
                    scopes: None,
                    authorize_url: Some(format!("{}/authorize", provider.addr)),
                    token_url: Some(format!("{}/token", provider.addr)),
                    userinfo_url: Some(format!("{}/user", provider.addr)),
                }),
                google: None,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        config.validate().unwrap();

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = gatehouse::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            provider,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Begin a login attempt
    ///
    /// Follows the authorize redirect's Location header to extract the
    /// `state` query parameter, like a browser arriving at the provider,
    /// and captures the correlation cookie set alongside it.
    pub async fn begin_login(&self, client: &reqwest::Client) -> LoginAttempt {
        let response = client
            .get(self.url("/oauth2/authorize/github"))
            .send()
            .await
            .expect("authorize request succeeds");
        assert!(response.status().is_redirection());

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .expect("location header");
        let location = url::Url::parse(location).expect("authorization url");
        let state = location
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("state parameter");

        let login_cookie =
            cookie_value(&response, "OAUTH_LOGIN_ID").expect("correlation cookie set");

        LoginAttempt {
            state,
            login_cookie,
        }
    }

    /// Complete a full login and return the SESSION_ID cookie value
    pub async fn login(&self, client: &reqwest::Client) -> String {
        let attempt = self.begin_login(client).await;

        let response = client
            .get(self.url(&format!(
                "/oauth2/callback/github?code={TEST_CODE}&state={}",
                attempt.state
            )))
            .header("Cookie", attempt.cookie_header())
            .send()
            .await
            .expect("callback request succeeds");
        assert!(response.status().is_redirection());
        assert_eq!(header(&response, "location").as_deref(), Some("/home"));

        session_cookie(&response).expect("session cookie set")
    }
}

/// An in-flight login attempt: the state nonce bound for the provider and
/// the correlation cookie the browser holds
pub struct LoginAttempt {
    pub state: String,
    pub login_cookie: String,
}

impl LoginAttempt {
    /// Cookie header value presenting the correlation cookie
    pub fn cookie_header(&self) -> String {
        format!("OAUTH_LOGIN_ID={}", self.login_cookie)
    }
}

/// A client that does not follow redirects (to assert on Location headers)
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Read a response header as a string
pub fn header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Extract a named cookie value from a response's Set-Cookie headers
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            let value = cookie.strip_prefix(&format!("{name}="))?;
            let value = value.split(';').next()?;
            (!value.is_empty()).then(|| value.to_string())
        })
}

/// Extract the SESSION_ID value from a Set-Cookie header, if any
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    cookie_value(response, "SESSION_ID")
}

/// Cookie header value for an established session
pub fn cookie_header(session_id: &str) -> String {
    format!("SESSION_ID={session_id}")
}
