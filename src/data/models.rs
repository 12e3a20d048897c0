//! Data models
//!
//! Rust structs representing database rows and the view records
//! produced by the feed/relationship queries.
//! Row ids are SQLite integer keys, timestamps are chrono UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// User
// =============================================================================

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2id PHC string, never the plaintext password
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub display_name: Option<String>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub bio: Option<String>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub location: Option<String>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub website: Option<String>,
}

impl User {
    /// Name to show in timelines: display name when set, username otherwise.
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Profile fields written by an edit
///
/// Every field is written; `None` clears the column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserEdits {
    pub id: i64,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

/// Follower/following counts of a subject plus the viewer's edge to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CrossUsers {
    /// Users following the subject
    pub followers: i64,
    /// Users the subject follows
    pub follows: i64,
    /// Whether the viewer follows the subject
    pub mutual_follow_back: bool,
}

// =============================================================================
// Tweet
// =============================================================================

/// Input for a new tweet
///
/// Unset optional fields are left out of the INSERT entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TweetRequest {
    pub user_id: i64,
    pub text: String,
    pub image_url: Option<String>,
    pub parent_id: Option<i64>,
}

/// A tweet as seen by a particular viewer
///
/// `liked` and `retweeted` describe the viewer, not the author.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tweet {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    #[serde(serialize_with = "serialize_or_empty")]
    pub display_name: Option<String>,
    pub text: String,
    #[serde(serialize_with = "serialize_or_empty")]
    pub image_url: Option<String>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub liked: bool,
    pub retweeted: bool,
}

// =============================================================================
// Direct messages
// =============================================================================

/// One entry of a user's conversation list
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: i64,
    #[serde(serialize_with = "serialize_or_empty")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Latest message, absent when the conversation is still empty
    #[serde(serialize_with = "serialize_or_empty")]
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Lowest-id member other than the viewer
    pub other_user_id: Option<i64>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub other_username: Option<String>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub other_display_name: Option<String>,
}

/// Input for a new message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub conversation_id: i64,
    pub sender_id: i64,
    pub text: String,
}

/// A message with its sender's identity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    #[serde(serialize_with = "serialize_or_empty")]
    pub sender_display_name: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// Engagement that produced a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Retweet,
}

/// Someone else liked or retweeted one of the user's tweets
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub tweet_id: i64,
    pub tweet_text: String,
    pub actor_id: i64,
    pub actor_username: String,
    #[serde(serialize_with = "serialize_or_empty")]
    pub actor_display_name: Option<String>,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Optional field marshaling
// =============================================================================

/// Render an optional column the way views expect: absent becomes "".
pub fn or_empty(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// `serialize_with` adapter for optional text columns in view records.
pub fn serialize_or_empty<S: Serializer>(
    value: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(or_empty(value))
}

/// Normalize submitted form text: blank input means "absent".
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
