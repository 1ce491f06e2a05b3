//! OAuth2 authentication
//!
//! Handles:
//! - The authorization-code login flow (GitHub, Google)
//! - Server-side session management
//! - Route authorization policy and middleware

mod middleware;
mod oauth;
pub mod policy;
pub mod provider;
pub mod session;
mod user_loader;

pub use middleware::{CurrentUser, MaybeUser, SESSION_COOKIE, route_guard};
pub use oauth::{LOGIN_COOKIE, auth_router};
pub use policy::RoutePolicy;
pub use provider::{Principal, Provider, ProviderRegistry};
pub use session::{IssuedLogin, SessionStore};
pub use user_loader::load_user;
