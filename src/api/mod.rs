//! JSON API
//!
//! Read-only projections of the current principal. Nothing here mutates
//! session or principal state.

mod user;

pub use user::user_api_router;
