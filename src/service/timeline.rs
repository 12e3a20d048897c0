//! Timeline service
//!
//! Read-only views: home feed, a user's history and likes, and the
//! viewer's notifications.

use std::sync::Arc;

use crate::data::{Database, Notification, Tweet};
use crate::error::AppError;

/// Timeline service
pub struct TimelineService {
    db: Arc<Database>,
}

impl TimelineService {
    /// Create new timeline service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Home feed: tweets by followed users, newest first
    pub async fn home(&self, viewer_id: i64) -> Result<Vec<Tweet>, AppError> {
        self.db.get_feed(viewer_id).await
    }

    /// Tweets authored or retweeted by `username`
    pub async fn history(&self, username: &str, viewer_id: i64) -> Result<Vec<Tweet>, AppError> {
        let subject_id = self.db.get_user_id_from_username(username).await?;
        self.db.get_history(subject_id, viewer_id).await
    }

    /// Tweets liked by `username`
    pub async fn likes(&self, username: &str, viewer_id: i64) -> Result<Vec<Tweet>, AppError> {
        let subject_id = self.db.get_user_id_from_username(username).await?;
        self.db.get_likes(subject_id, viewer_id).await
    }

    /// Likes and retweets of the viewer's tweets by other users
    pub async fn notifications(&self, user_id: i64) -> Result<Vec<Notification>, AppError> {
        self.db.get_notifications(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{NotificationKind, TweetRequest};
    use tempfile::TempDir;

    async fn create_test_db() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-timeline.db");
        let db = Database::connect(&db_path).await.unwrap();
        (Arc::new(db), temp_dir)
    }

    async fn tweet(db: &Database, user_id: i64, text: &str) -> i64 {
        db.create_tweet(&TweetRequest {
            user_id,
            text: text.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn history_and_likes_resolve_usernames() {
        let (db, _temp_dir) = create_test_db().await;
        let service = TimelineService::new(db.clone());
        let alice = db.create_user("alice", "hash").await.unwrap();
        let bob = db.create_user("bob", "hash").await.unwrap();

        let own = tweet(&db, alice, "mine").await;
        let theirs = tweet(&db, bob, "theirs").await;
        db.create_retweet(alice, theirs).await.unwrap();
        db.create_like(alice, theirs).await.unwrap();

        let history: Vec<i64> = service
            .history("alice", bob)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert!(history.contains(&own));
        assert!(history.contains(&theirs));

        let likes = service.likes("alice", bob).await.unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].id, theirs);

        assert!(matches!(
            service.history("ghost", bob).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn home_feed_follows_followees_only() {
        let (db, _temp_dir) = create_test_db().await;
        let service = TimelineService::new(db.clone());
        let alice = db.create_user("alice", "hash").await.unwrap();
        let bob = db.create_user("bob", "hash").await.unwrap();
        let carol = db.create_user("carol", "hash").await.unwrap();

        db.create_follow(bob, alice).await.unwrap();
        let from_bob = tweet(&db, bob, "from bob").await;
        tweet(&db, carol, "from carol").await;

        let feed = service.home(alice).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, from_bob);
    }

    #[tokio::test]
    async fn notifications_report_engagement_by_others() {
        let (db, _temp_dir) = create_test_db().await;
        let service = TimelineService::new(db.clone());
        let alice = db.create_user("alice", "hash").await.unwrap();
        let bob = db.create_user("bob", "hash").await.unwrap();

        let post = tweet(&db, alice, "notice me").await;
        db.create_like(bob, post).await.unwrap();
        db.create_like(alice, post).await.unwrap();

        let notifications = service.notifications(alice).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].actor_id, bob);
        assert_eq!(notifications[0].kind, NotificationKind::Like);
    }
}
