//! Cookie-based session authentication.
//!
//! Log-in issues a signed, encrypted cookie pair holding the user ID and the
//! session expiry. The [middleware::auth_guard] middleware validates the
//! cookies on every request to a protected route and slides the expiry
//! forward, so active users stay logged in.

pub(crate) mod cookie;
mod endpoints;
mod middleware;

pub use endpoints::{get_session, post_log_in, post_log_out, register_user};
pub use middleware::auth_guard;
