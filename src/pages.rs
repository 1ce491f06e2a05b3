//! HTML pages
//!
//! Read-only projections of the current principal into small server-rendered
//! pages. Protected pages are never reached without a session (the route
//! guard redirects first), so their extractors always succeed in practice.

use axum::{
    Router,
    extract::{Query, State},
    response::{Html, IntoResponse},
    routing::get,
};
use html_escape::encode_text;
use serde::Deserialize;

use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};

/// Create pages router
///
/// Routes:
/// - GET / - Public landing page
/// - GET /login - Login page with provider links
/// - GET /error - Public error page
/// - GET /home - Home page (session required)
/// - GET /profile - Profile page (session required)
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page))
        .route("/error", get(error_page))
        .route("/home", get(home))
        .route("/profile", get(profile))
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{title} - Gatehouse</title></head>
<body>
{body}
</body>
</html>"#,
    ))
}

/// GET /
///
/// Public landing page; greets a signed-in user if a session exists.
async fn index(MaybeUser(principal): MaybeUser) -> impl IntoResponse {
    let body = match principal {
        Some(principal) => format!(
            r#"<h1>Gatehouse</h1>
<p>Signed in as {}.</p>
<p><a href="/home">Home</a> | <a href="/profile">Profile</a></p>
<form method="post" action="/logout"><button type="submit">Sign out</button></form>"#,
            encode_text(principal.email_or_id()),
        ),
        None => r#"<h1>Gatehouse</h1>
<p>Welcome. Please <a href="/login">sign in</a>.</p>"#
            .to_string(),
    };
    page("Welcome", &body)
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    error: Option<String>,
}

/// GET /login
///
/// Renders one sign-in link per configured provider, and an error notice
/// after a failed login attempt (`?error=true`).
async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    let mut body = String::from("<h1>Gatehouse</h1>\n");

    if query.error.as_deref() == Some("true") {
        body.push_str("<p class=\"error\">Sign-in failed. Please try again.</p>\n");
    }

    body.push_str("<p>Please sign in</p>\n<ul>\n");
    for registration in state.providers.iter() {
        let provider = registration.provider;
        body.push_str(&format!(
            "<li><a href=\"/oauth2/authorize/{provider}\">Sign in with {}</a></li>\n",
            provider_label(provider.as_str()),
        ));
    }
    body.push_str("</ul>");

    page("Login", &body)
}

fn provider_label(id: &str) -> String {
    match id {
        "github" => "GitHub".to_string(),
        "google" => "Google".to_string(),
        other => other.to_string(),
    }
}

/// GET /error
async fn error_page() -> impl IntoResponse {
    page(
        "Error",
        r#"<h1>Something went wrong</h1>
<p><a href="/">Back to start</a></p>"#,
    )
}

/// GET /home
///
/// Post-login landing page: name, email, avatar.
async fn home(CurrentUser(principal): CurrentUser) -> impl IntoResponse {
    let name = principal.display_name.as_deref().unwrap_or("(unknown)");
    let email = principal.email.as_deref().unwrap_or("(none)");

    let mut body = format!(
        r#"<h1>Home</h1>
<p>Name: {}</p>
<p>Email: {}</p>"#,
        encode_text(name),
        encode_text(email),
    );
    if let Some(avatar_url) = &principal.avatar_url {
        body.push_str(&format!(
            "\n<img src=\"{}\" alt=\"avatar\" width=\"80\">",
            encode_text(avatar_url)
        ));
    }
    body.push_str(concat!(
        "\n<p><a href=\"/profile\">Profile</a></p>",
        "\n<form method=\"post\" action=\"/logout\"><button type=\"submit\">Sign out</button></form>",
    ));

    page("Home", &body)
}

/// GET /profile
///
/// Full attribute dump of the authenticated principal.
async fn profile(CurrentUser(principal): CurrentUser) -> impl IntoResponse {
    let mut body = format!(
        r#"<h1>Profile</h1>
<p>Provider: {}</p>
<p>Id: {}</p>
<table>
"#,
        encode_text(principal.provider.as_str()),
        encode_text(&principal.id),
    );

    for (key, value) in &principal.raw_attributes {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            encode_text(key),
            encode_text(&value.to_string()),
        ));
    }
    body.push_str("</table>\n<p><a href=\"/home\">Home</a></p>");

    page("Profile", &body)
}
