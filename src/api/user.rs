//! User profile API endpoints
//!
//! All endpoints require an authenticated session; without one they answer
//! `{"error": "Not authenticated"}` with HTTP 200 instead of rejecting (the
//! status-code decision is documented in DESIGN.md).

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::AppState;
use crate::auth::MaybeUser;

/// Create user API router (nested under /api)
pub fn user_api_router() -> Router<AppState> {
    Router::new()
        .route("/user", get(user))
        .route("/user/name", get(user_name))
        .route("/user/email", get(user_email))
}

fn not_authenticated() -> Json<Value> {
    Json(json!({ "error": "Not authenticated" }))
}

/// GET /api/user
///
/// The principal's raw attribute map, as returned by the provider.
async fn user(MaybeUser(principal): MaybeUser) -> Json<Value> {
    match principal {
        Some(principal) => Json(Value::Object(principal.raw_attributes)),
        None => not_authenticated(),
    }
}

/// GET /api/user/name
async fn user_name(MaybeUser(principal): MaybeUser) -> Json<Value> {
    match principal {
        Some(principal) => Json(json!({ "name": principal.display_name })),
        None => not_authenticated(),
    }
}

/// GET /api/user/email
async fn user_email(MaybeUser(principal): MaybeUser) -> Json<Value> {
    match principal {
        Some(principal) => Json(json!({ "email": principal.email })),
        None => not_authenticated(),
    }
}
