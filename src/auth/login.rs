//! Password login
//!
//! `POST /login` logs in or registers, `POST /logout` drops the cookie.

use axum::{
    Form, Json, Router,
    extract::State,
    routing::post,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};

use super::session::{SESSION_COOKIE_NAME, Session, create_session_token};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::service::AccountService;

/// Create authentication router
///
/// Routes:
/// - POST /login
/// - POST /logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    /// True when this login created the account
    pub registered: bool,
    /// Same token as the cookie, for `Authorization: Bearer` clients
    pub token: String,
}

/// Log in, registering unknown usernames
///
/// Sets the HttpOnly session cookie.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/login"])
        .start_timer();

    let service = AccountService::new(state.db.clone());
    let outcome = service
        .login_or_register(&form.username, &form.password)
        .await?;

    let session = Session::new(
        outcome.user_id,
        outcome.username.clone(),
        state.config.auth.session_max_age,
    );
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    let cookie = Cookie::build((SESSION_COOKIE_NAME, token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build();

    tracing::info!(
        user_id = outcome.user_id,
        registered = outcome.registered,
        "User logged in"
    );

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            user_id: outcome.user_id,
            username: outcome.username,
            registered: outcome.registered,
            token,
        }),
    ))
}

/// Logout
///
/// Clears the session cookie. Tokens are stateless, so a copied token
/// stays valid until it expires.
async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/"));
    (jar, Json(serde_json::json!({ "logged_out": true })))
}
