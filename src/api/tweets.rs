//! Tweet endpoints

use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::Json,
};

use super::dto::{TweetCreatedResponse, TweetIdForm};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::Tweet;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, observe_http_request};
use crate::service::{ImageUpload, MAX_IMAGE_UPLOAD_BYTES, Thread, TweetService};

fn build_tweet_service(state: &AppState) -> TweetService {
    TweetService::new(state.db.clone(), state.storage.clone())
}

/// Fields of the `POST /tweet` form
#[derive(Debug, Default)]
struct TweetForm {
    text: Option<String>,
    parent_id: Option<i64>,
    image: Option<ImageUpload>,
}

async fn read_tweet_form(mut multipart: Multipart) -> Result<TweetForm, AppError> {
    let mut form = TweetForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "tweet" => {
                form.text = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read tweet: {}", e))
                })?);
            }
            "parent" => {
                let raw = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read parent: {}", e))
                })?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    form.parent_id = Some(raw.parse::<i64>().map_err(|_| {
                        AppError::Validation("parent must be a tweet id".to_string())
                    })?);
                }
            }
            "image" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read image: {}", e)))?
                {
                    if bytes.len() + chunk.len() > MAX_IMAGE_UPLOAD_BYTES {
                        return Err(AppError::Validation(format!(
                            "File too large: exceeds {} bytes",
                            MAX_IMAGE_UPLOAD_BYTES
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }

                // Browsers send an empty part when no file was chosen
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        filename,
                        content_type,
                        data: bytes,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /tweet
///
/// Multipart fields: `tweet`, optional `image`, optional `parent`.
pub async fn post_tweet(
    State(state): State<AppState>,
    viewer: CurrentUser,
    multipart: Multipart,
) -> Result<Json<TweetCreatedResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/tweet"])
        .start_timer();

    let form = read_tweet_form(multipart).await?;
    let text = form
        .text
        .ok_or_else(|| AppError::Validation("tweet is required".to_string()))?;

    let tweet_id = build_tweet_service(&state)
        .post(viewer.user_id(), &text, form.parent_id, form.image)
        .await?;

    observe_http_request("POST", "/tweet", 200);
    Ok(Json(TweetCreatedResponse { tweet_id }))
}

/// POST /retweet
pub async fn retweet(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Form(form): Form<TweetIdForm>,
) -> Result<Json<Tweet>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/retweet"])
        .start_timer();

    let tweet = build_tweet_service(&state)
        .retweet(viewer.user_id(), form.tweet_id)
        .await?;

    observe_http_request("POST", "/retweet", 200);
    Ok(Json(tweet))
}

/// POST /like
pub async fn like(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Form(form): Form<TweetIdForm>,
) -> Result<Json<Tweet>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/like"])
        .start_timer();

    let tweet = build_tweet_service(&state)
        .like(viewer.user_id(), form.tweet_id)
        .await?;

    observe_http_request("POST", "/like", 200);
    Ok(Json(tweet))
}

/// GET /tweets/:id
pub async fn get_thread(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(tweet_id): Path<i64>,
) -> Result<Json<Thread>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/tweets/:id"])
        .start_timer();

    let thread = build_tweet_service(&state)
        .thread(tweet_id, viewer.user_id())
        .await?;

    observe_http_request("GET", "/tweets/:id", 200);
    Ok(Json(thread))
}
