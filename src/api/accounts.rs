//! Profile and follow endpoints

use axum::{
    Form,
    extract::{Path, State},
    response::Json,
};

use super::dto::{FollowResponse, ProfileEditForm, UsernameForm};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{Tweet, User};
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, observe_http_request};
use crate::service::{AccountService, Profile, ProfileForm, TimelineService};

/// GET /users/:username
///
/// The user, the viewer's relationship to them and their history.
pub async fn get_profile(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<Profile>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/users/:username"])
        .start_timer();

    let profile = AccountService::new(state.db.clone())
        .profile(&username, viewer.user_id())
        .await?;

    observe_http_request("GET", "/users/:username", 200);
    Ok(Json(profile))
}

/// GET /users/:username/tweets
pub async fn get_history(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<Vec<Tweet>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/users/:username/tweets"])
        .start_timer();

    let tweets = TimelineService::new(state.db.clone())
        .history(&username, viewer.user_id())
        .await?;

    observe_http_request("GET", "/users/:username/tweets", 200);
    Ok(Json(tweets))
}

/// POST /users/:username/edit
///
/// Only the viewer's own profile can be edited.
pub async fn edit_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(username): Path<String>,
    Form(form): Form<ProfileEditForm>,
) -> Result<Json<User>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/users/:username/edit"])
        .start_timer();

    if username != session.username {
        return Err(AppError::Forbidden);
    }

    let user = AccountService::new(state.db.clone())
        .edit_profile(
            session.user_id,
            ProfileForm {
                display_name: form.display_name,
                bio: form.bio,
                location: form.location,
                website: form.website,
            },
        )
        .await?;

    observe_http_request("POST", "/users/:username/edit", 200);
    Ok(Json(user))
}

/// POST /follow
pub async fn follow(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Form(form): Form<UsernameForm>,
) -> Result<Json<FollowResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/follow"])
        .start_timer();

    AccountService::new(state.db.clone())
        .follow(viewer.user_id(), &form.username)
        .await?;

    observe_http_request("POST", "/follow", 200);
    Ok(Json(FollowResponse { following: true }))
}
