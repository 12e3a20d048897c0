//! Message service
//!
//! Two-person direct conversations.

use std::sync::Arc;

use crate::data::{Conversation, Database, Message, MessageRequest};
use crate::error::AppError;

/// Message service
pub struct MessageService {
    db: Arc<Database>,
}

impl MessageService {
    /// Create new message service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get or create the conversation between the viewer and `username`
    ///
    /// Lookup and creation are separate round trips. Two concurrent first
    /// contacts between the same pair can both miss the lookup and create
    /// two conversations; later lookups settle on the lowest id.
    ///
    /// # Errors
    /// - `NotFound` if the other user does not exist
    /// - `Validation` when messaging oneself
    pub async fn start_conversation(&self, user_id: i64, username: &str) -> Result<i64, AppError> {
        let other_id = self.db.get_user_id_from_username(username).await?;
        if other_id == user_id {
            return Err(AppError::Validation("cannot message yourself".to_string()));
        }

        if let Some(conversation_id) = self.db.get_two_users_conversation(user_id, other_id).await? {
            return Ok(conversation_id);
        }

        self.db.create_two_users_conversation(user_id, other_id).await
    }

    /// Send a message as the viewer
    ///
    /// # Returns
    /// The new message ID, or `None` when the viewer is not a member of
    /// the conversation (nothing is written).
    pub async fn send(
        &self,
        conversation_id: i64,
        sender_id: i64,
        text: &str,
    ) -> Result<Option<i64>, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("message cannot be empty".to_string()));
        }

        let request = MessageRequest {
            conversation_id,
            sender_id,
            text: text.to_string(),
        };
        self.db.smart_create_message(&request).await
    }

    /// The viewer's conversations, most recently active first
    pub async fn list(&self, user_id: i64) -> Result<Vec<Conversation>, AppError> {
        self.db.get_conversations(user_id).await
    }

    /// Messages of one conversation, oldest first
    ///
    /// # Errors
    /// `Forbidden` unless the viewer is a member
    pub async fn read(&self, conversation_id: i64, viewer_id: i64) -> Result<Vec<Message>, AppError> {
        if !self
            .db
            .is_conversation_member(conversation_id, viewer_id)
            .await?
        {
            return Err(AppError::Forbidden);
        }

        self.db.get_conversation(conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_db() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-message.db");
        let db = Database::connect(&db_path).await.unwrap();
        (Arc::new(db), temp_dir)
    }

    #[tokio::test]
    async fn start_conversation_reuses_existing_pair() {
        let (db, _temp_dir) = create_test_db().await;
        let service = MessageService::new(db.clone());
        let alice = db.create_user("alice", "hash").await.unwrap();
        db.create_user("bob", "hash").await.unwrap();

        let first = service.start_conversation(alice, "bob").await.unwrap();
        let second = service.start_conversation(alice, "bob").await.unwrap();
        assert_eq!(first, second);

        let bob = db.get_user_id_from_username("bob").await.unwrap();
        let from_bob = service.start_conversation(bob, "alice").await.unwrap();
        assert_eq!(first, from_bob);
    }

    #[tokio::test]
    async fn messaging_yourself_is_rejected() {
        let (db, _temp_dir) = create_test_db().await;
        let service = MessageService::new(db.clone());
        let alice = db.create_user("alice", "hash").await.unwrap();

        let error = service.start_conversation(alice, "alice").await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn outsiders_cannot_send_or_read() {
        let (db, _temp_dir) = create_test_db().await;
        let service = MessageService::new(db.clone());
        let alice = db.create_user("alice", "hash").await.unwrap();
        db.create_user("bob", "hash").await.unwrap();
        let mallory = db.create_user("mallory", "hash").await.unwrap();

        let conversation = service.start_conversation(alice, "bob").await.unwrap();
        let sent = service.send(conversation, alice, "hi bob").await.unwrap();
        assert!(sent.is_some());

        let intruded = service.send(conversation, mallory, "hi all").await.unwrap();
        assert_eq!(intruded, None);

        let error = service.read(conversation, mallory).await.unwrap_err();
        assert!(matches!(error, AppError::Forbidden));

        let messages = service.read(conversation, alice).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hi bob");
        assert_eq!(messages[0].sender_username, "alice");
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let (db, _temp_dir) = create_test_db().await;
        let service = MessageService::new(db.clone());
        let alice = db.create_user("alice", "hash").await.unwrap();
        db.create_user("bob", "hash").await.unwrap();
        let conversation = service.start_conversation(alice, "bob").await.unwrap();

        let error = service.send(conversation, alice, "   ").await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn list_shows_latest_message() {
        let (db, _temp_dir) = create_test_db().await;
        let service = MessageService::new(db.clone());
        let alice = db.create_user("alice", "hash").await.unwrap();
        let bob = db.create_user("bob", "hash").await.unwrap();

        let conversation = service.start_conversation(alice, "bob").await.unwrap();
        service.send(conversation, alice, "first").await.unwrap();
        service.send(conversation, bob, "second").await.unwrap();

        let listed = service.list(alice).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, conversation);
        assert_eq!(listed[0].other_user_id, Some(bob));
        assert_eq!(listed[0].last_message_text.as_deref(), Some("second"));
    }
}
