//! API layer
//!
//! JSON HTTP handlers for:
//! - Feed, tweets, likes and retweets
//! - Profiles and follows
//! - Direct messages and notifications
//! - Metrics and health

mod accounts;
mod dto;
mod messages;
pub mod metrics;
mod timelines;
mod tweets;

pub use dto::*;
pub use metrics::ops_router;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::AppState;
use crate::auth::require_auth;

/// Create the router for all viewer-facing endpoints
///
/// Every route requires a session.
pub fn app_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/feed", get(timelines::home_feed))
        .route("/notifications", get(timelines::notifications))
        .route("/tweet", post(tweets::post_tweet))
        .route("/retweet", post(tweets::retweet))
        .route("/like", post(tweets::like))
        .route("/tweets/:id", get(tweets::get_thread))
        .route("/follow", post(accounts::follow))
        .route("/users/:username", get(accounts::get_profile))
        .route("/users/:username/tweets", get(accounts::get_history))
        .route("/users/:username/likes", get(timelines::user_likes))
        .route("/users/:username/edit", post(accounts::edit_profile))
        .route(
            "/messages",
            get(messages::list_conversations).post(messages::start_conversation),
        )
        .route(
            "/messages/:id",
            get(messages::get_conversation).post(messages::send_message),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
