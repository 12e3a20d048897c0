//! Timeline endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{Notification, Tweet};
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, observe_http_request};
use crate::service::TimelineService;

/// GET /feed
pub async fn home_feed(
    State(state): State<AppState>,
    viewer: CurrentUser,
) -> Result<Json<Vec<Tweet>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/feed"])
        .start_timer();

    let tweets = TimelineService::new(state.db.clone())
        .home(viewer.user_id())
        .await?;

    observe_http_request("GET", "/feed", 200);
    Ok(Json(tweets))
}

/// GET /users/:username/likes
pub async fn user_likes(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<Vec<Tweet>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/users/:username/likes"])
        .start_timer();

    let tweets = TimelineService::new(state.db.clone())
        .likes(&username, viewer.user_id())
        .await?;

    observe_http_request("GET", "/users/:username/likes", 200);
    Ok(Json(tweets))
}

/// GET /notifications
pub async fn notifications(
    State(state): State<AppState>,
    viewer: CurrentUser,
) -> Result<Json<Vec<Notification>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/notifications"])
        .start_timer();

    let notifications = TimelineService::new(state.db.clone())
        .notifications(viewer.user_id())
        .await?;

    observe_http_request("GET", "/notifications", 200);
    Ok(Json(notifications))
}
