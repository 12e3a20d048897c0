//! Password authentication
//!
//! Handles:
//! - Login/registration and logout
//! - Password hashing
//! - Session tokens and the authentication middleware

mod login;
mod middleware;
pub mod password;
pub mod session;

pub use login::{LoginResponse, auth_router};
pub use middleware::{CurrentUser, require_auth};
pub use session::{SESSION_COOKIE_NAME, Session, create_session_token, verify_session_token};
