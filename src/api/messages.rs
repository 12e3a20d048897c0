//! Direct message endpoints

use axum::{
    Form,
    extract::{Path, State},
    response::Json,
};

use super::dto::{
    ConversationCreatedResponse, ConversationResponse, MessageForm, MessageSentResponse,
    UsernameForm,
};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::Conversation;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, observe_http_request};
use crate::service::MessageService;

/// GET /messages
pub async fn list_conversations(
    State(state): State<AppState>,
    viewer: CurrentUser,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/messages"])
        .start_timer();

    let conversations = MessageService::new(state.db.clone())
        .list(viewer.user_id())
        .await?;

    observe_http_request("GET", "/messages", 200);
    Ok(Json(conversations))
}

/// POST /messages
///
/// Opens (or reuses) the conversation with `username`.
pub async fn start_conversation(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Form(form): Form<UsernameForm>,
) -> Result<Json<ConversationCreatedResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/messages"])
        .start_timer();

    let conversation_id = MessageService::new(state.db.clone())
        .start_conversation(viewer.user_id(), &form.username)
        .await?;

    observe_http_request("POST", "/messages", 200);
    Ok(Json(ConversationCreatedResponse { conversation_id }))
}

/// GET /messages/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(conversation_id): Path<i64>,
) -> Result<Json<ConversationResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/messages/:id"])
        .start_timer();

    let messages = MessageService::new(state.db.clone())
        .read(conversation_id, viewer.user_id())
        .await?;

    observe_http_request("GET", "/messages/:id", 200);
    Ok(Json(ConversationResponse {
        conversation_id,
        messages,
    }))
}

/// POST /messages/:id
///
/// `message_id` is null when the viewer is not a member; nothing is stored.
pub async fn send_message(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(conversation_id): Path<i64>,
    Form(form): Form<MessageForm>,
) -> Result<Json<MessageSentResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/messages/:id"])
        .start_timer();

    let message_id = MessageService::new(state.db.clone())
        .send(conversation_id, viewer.user_id(), &form.message)
        .await?;

    if message_id.is_none() {
        tracing::warn!(
            conversation_id,
            user_id = viewer.user_id(),
            "Message from non-member dropped"
        );
    }

    observe_http_request("POST", "/messages/:id", 200);
    Ok(Json(MessageSentResponse { message_id }))
}
