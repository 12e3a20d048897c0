//! Request forms and response bodies
//!
//! Most reads return the data models directly; the types here cover
//! form input and write acknowledgements.

use serde::{Deserialize, Serialize};

use crate::data::Message;

/// `POST /retweet`, `POST /like`
#[derive(Debug, Deserialize)]
pub struct TweetIdForm {
    pub tweet_id: i64,
}

/// `POST /follow`, `POST /messages`
#[derive(Debug, Deserialize)]
pub struct UsernameForm {
    pub username: String,
}

/// `POST /users/:username/edit`
///
/// Missing and blank fields both clear the column.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileEditForm {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

/// `POST /messages/:id`
#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TweetCreatedResponse {
    pub tweet_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub following: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationCreatedResponse {
    pub conversation_id: i64,
}

/// `message_id` is null when the viewer is not a member.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageSentResponse {
    pub message_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation_id: i64,
    pub messages: Vec<Message>,
}
