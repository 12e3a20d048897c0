//! Tweet service
//!
//! Posting tweets and replies, retweets, likes and thread views.

use std::sync::Arc;

use serde::Serialize;

use crate::data::{Database, Tweet, TweetRequest};
use crate::error::AppError;
use crate::storage::MediaStorage;

pub const MAX_TWEET_CHARS: usize = 140;
pub const MAX_IMAGE_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const SUPPORTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Image attached to a new tweet
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A tweet with its direct replies
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub tweet: Tweet,
    pub replies: Vec<Tweet>,
}

fn validate_text(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("tweet cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_TWEET_CHARS {
        return Err(AppError::Validation(format!(
            "tweet must be at most {} characters",
            MAX_TWEET_CHARS
        )));
    }
    Ok(())
}

fn validate_image(image: &ImageUpload) -> Result<(), AppError> {
    if !SUPPORTED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
        return Err(AppError::Validation(format!(
            "Unsupported MIME type: {}",
            image.content_type
        )));
    }
    if image.data.len() > MAX_IMAGE_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "File too large: exceeds {} bytes",
            MAX_IMAGE_UPLOAD_BYTES
        )));
    }
    Ok(())
}

/// Tweet service
pub struct TweetService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl TweetService {
    /// Create new tweet service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    /// Post a tweet, optionally as a reply and optionally with an image
    ///
    /// The image is uploaded first; its public URL is stored on the tweet.
    ///
    /// # Errors
    /// - `Validation` for empty/overlong text or an unsupported image
    /// - `NotFound` if the parent tweet does not exist
    /// - `Storage` if the upload fails
    pub async fn post(
        &self,
        user_id: i64,
        text: &str,
        parent_id: Option<i64>,
        image: Option<ImageUpload>,
    ) -> Result<i64, AppError> {
        validate_text(text)?;
        if let Some(image) = &image {
            validate_image(image)?;
        }
        if let Some(parent_id) = parent_id {
            self.db.get_tweet(parent_id, user_id).await?;
        }

        let image_url = match image {
            Some(image) => Some(
                self.storage
                    .upload_image(&image.filename, image.data, &image.content_type)
                    .await?,
            ),
            None => None,
        };

        let request = TweetRequest {
            user_id,
            text: text.to_string(),
            image_url,
            parent_id,
        };
        self.db.create_tweet(&request).await
    }

    /// Retweet as the viewer
    ///
    /// # Returns
    /// The tweet as the viewer now sees it
    pub async fn retweet(&self, user_id: i64, tweet_id: i64) -> Result<Tweet, AppError> {
        self.db.get_tweet(tweet_id, user_id).await?;
        self.db.create_retweet(user_id, tweet_id).await?;
        self.db.get_tweet(tweet_id, user_id).await
    }

    /// Like as the viewer
    ///
    /// # Returns
    /// The tweet as the viewer now sees it
    pub async fn like(&self, user_id: i64, tweet_id: i64) -> Result<Tweet, AppError> {
        self.db.get_tweet(tweet_id, user_id).await?;
        self.db.create_like(user_id, tweet_id).await?;
        self.db.get_tweet(tweet_id, user_id).await
    }

    /// A tweet and its replies, annotated for the viewer
    pub async fn thread(&self, tweet_id: i64, viewer_id: i64) -> Result<Thread, AppError> {
        let tweet = self.db.get_tweet(tweet_id, viewer_id).await?;
        let replies = self.db.get_replies(tweet_id, viewer_id).await?;
        Ok(Thread { tweet, replies })
    }
}
