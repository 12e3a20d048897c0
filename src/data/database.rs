//! SQLite database operations
//!
//! All database access goes through this module. Each operation is a
//! single statement (or a short sequence of statements without a wrapping
//! transaction) against the pool owned by [`Database`].

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite};

use super::models::*;
use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::metrics::observe_db_query;

/// Tweet projection shared by every timeline query.
///
/// The viewer's likes and retweets are joined through DISTINCT projections so
/// duplicate engagement rows can neither repeat a tweet nor change the flags.
/// Callers append their own JOIN/WHERE/ORDER BY clauses.
fn tweet_view_query<'a>(viewer_id: i64) -> QueryBuilder<'a, Sqlite> {
    let mut query = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT t.id, t.user_id, u.username, u.display_name, t.text, t.image_url,
               t.parent_id, t.created_at,
               (vl.tweet_id IS NOT NULL) AS liked,
               (vr.tweet_id IS NOT NULL) AS retweeted
        FROM tweets t
        INNER JOIN users u ON u.id = t.user_id
        LEFT JOIN (SELECT DISTINCT tweet_id FROM likes WHERE user_id = "#,
    );
    query.push_bind(viewer_id);
    query.push(
        r#") vl ON vl.tweet_id = t.id
        LEFT JOIN (SELECT DISTINCT tweet_id FROM retweets WHERE user_id = "#,
    );
    query.push_bind(viewer_id);
    query.push(") vr ON vr.tweet_id = t.id ");
    query
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database with default pool settings
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        Self::connect_with_config(&DatabaseConfig::at(path)).await
    }

    /// Connect to SQLite database using the configured pool settings
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect_with_config(config: &DatabaseConfig) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %config.path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Round trip to the database, for health checks
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Register a user
    ///
    /// # Arguments
    /// * `username` - Unique login name
    /// * `password_hash` - Already hashed credential
    ///
    /// # Errors
    /// `DuplicateUsername` if the name is taken
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(db_error) = &error {
                if db_error.is_unique_violation() {
                    return AppError::DuplicateUsername;
                }
            }
            AppError::Database(error)
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Get user by username
    ///
    /// # Errors
    /// `NotFound` if no user has this name
    pub async fn get_user_from_username(&self, username: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Get user by ID
    pub async fn get_user_by_id(&self, id: i64) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Resolve a username to its ID
    pub async fn get_user_id_from_username(&self, username: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Follower/following counts for `subject_id` and whether `viewer_id` follows it
    ///
    /// One aggregate pass over the follow rows touching the subject, so the
    /// three values always describe the same snapshot.
    pub async fn get_users_relationship(
        &self,
        subject_id: i64,
        viewer_id: i64,
    ) -> Result<CrossUsers, AppError> {
        let started = Instant::now();
        let relationship = sqlx::query_as::<_, CrossUsers>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE f.followed = ?) AS followers,
                COUNT(*) FILTER (WHERE f.follower = ?) AS follows,
                COUNT(*) FILTER (WHERE f.follower = ? AND f.followed = ?) > 0 AS mutual_follow_back
            FROM follows f
            WHERE f.followed = ? OR f.follower = ?
            "#,
        )
        .bind(subject_id)
        .bind(subject_id)
        .bind(viewer_id)
        .bind(subject_id)
        .bind(subject_id)
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await?;
        observe_db_query("SELECT", "follows", started.elapsed());

        Ok(relationship)
    }

    /// Overwrite the profile fields of one user
    ///
    /// # Errors
    /// `IntegrityViolation` unless exactly one row was updated
    pub async fn edit_user(&self, edits: &UserEdits) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET display_name = ?, bio = ?, location = ?, website = ?
            WHERE id = ?
            "#,
        )
        .bind(&edits.display_name)
        .bind(&edits.bio)
        .bind(&edits.location)
        .bind(&edits.website)
        .bind(edits.id)
        .execute(&self.pool)
        .await?;

        let rows = result.rows_affected();
        if rows != 1 {
            return Err(AppError::IntegrityViolation(format!(
                "expected to affect 1 row, affected {}",
                rows
            )));
        }

        Ok(())
    }

    // =========================================================================
    // Tweets
    // =========================================================================

    /// Insert a tweet, writing only the populated columns
    ///
    /// # Returns
    /// ID of the new tweet
    pub async fn create_tweet(&self, request: &TweetRequest) -> Result<i64, AppError> {
        let mut columns = vec!["text", "user_id", "created_at"];
        if request.image_url.is_some() {
            columns.push("image_url");
        }
        if request.parent_id.is_some() {
            columns.push("parent_id");
        }

        let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO tweets (");
        query.push(columns.join(", "));
        query.push(") VALUES (");
        {
            let mut values = query.separated(", ");
            values.push_bind(request.text.clone());
            values.push_bind(request.user_id);
            values.push_bind(Utc::now());
            if let Some(image_url) = &request.image_url {
                values.push_bind(image_url.clone());
            }
            if let Some(parent_id) = request.parent_id {
                values.push_bind(parent_id);
            }
        }
        query.push(")");

        let result = query.build().execute(&self.pool).await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a single tweet with the viewer's like/retweet flags
    ///
    /// # Errors
    /// `NotFound` if the tweet does not exist
    pub async fn get_tweet(&self, tweet_id: i64, viewer_id: i64) -> Result<Tweet, AppError> {
        let mut query = tweet_view_query(viewer_id);
        query.push("WHERE t.id = ");
        query.push_bind(tweet_id);

        query
            .build_query_as::<Tweet>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Direct replies to a tweet, oldest first
    pub async fn get_replies(&self, tweet_id: i64, viewer_id: i64) -> Result<Vec<Tweet>, AppError> {
        let mut query = tweet_view_query(viewer_id);
        query.push("WHERE t.parent_id = ");
        query.push_bind(tweet_id);
        query.push(" ORDER BY t.created_at ASC, t.id ASC");

        let replies = query.build_query_as::<Tweet>().fetch_all(&self.pool).await?;

        Ok(replies)
    }

    /// Home feed: tweets by accounts the viewer follows, newest first
    pub async fn get_feed(&self, viewer_id: i64) -> Result<Vec<Tweet>, AppError> {
        let started = Instant::now();
        let mut query = tweet_view_query(viewer_id);
        query.push("INNER JOIN follows f ON f.followed = t.user_id AND f.follower = ");
        query.push_bind(viewer_id);
        query.push(" ORDER BY t.created_at DESC, t.id DESC");

        let tweets = query.build_query_as::<Tweet>().fetch_all(&self.pool).await?;
        observe_db_query("SELECT", "tweets", started.elapsed());

        Ok(tweets)
    }

    /// Profile timeline: tweets written or retweeted by `subject_id`
    ///
    /// Rows are selected by the subject but flagged for the viewer.
    pub async fn get_history(
        &self,
        subject_id: i64,
        viewer_id: i64,
    ) -> Result<Vec<Tweet>, AppError> {
        let started = Instant::now();
        let mut query = tweet_view_query(viewer_id);
        query.push("WHERE t.user_id = ");
        query.push_bind(subject_id);
        query.push(" OR EXISTS (SELECT 1 FROM retweets r WHERE r.tweet_id = t.id AND r.user_id = ");
        query.push_bind(subject_id);
        query.push(") ORDER BY t.created_at DESC, t.id DESC");

        let tweets = query.build_query_as::<Tweet>().fetch_all(&self.pool).await?;
        observe_db_query("SELECT", "tweets", started.elapsed());

        Ok(tweets)
    }

    /// Tweets liked by `subject_id`, flagged for the viewer, newest first
    pub async fn get_likes(&self, subject_id: i64, viewer_id: i64) -> Result<Vec<Tweet>, AppError> {
        let started = Instant::now();
        let mut query = tweet_view_query(viewer_id);
        query.push("WHERE EXISTS (SELECT 1 FROM likes k WHERE k.tweet_id = t.id AND k.user_id = ");
        query.push_bind(subject_id);
        query.push(") ORDER BY t.created_at DESC, t.id DESC");

        let tweets = query.build_query_as::<Tweet>().fetch_all(&self.pool).await?;
        observe_db_query("SELECT", "likes", started.elapsed());

        Ok(tweets)
    }

    // =========================================================================
    // Follows / Retweets / Likes
    // =========================================================================

    /// Record that `follower_id` follows `followed_id`
    ///
    /// Fails if either user is missing or the edge already exists.
    pub async fn create_follow(&self, followed_id: i64, follower_id: i64) -> Result<bool, AppError> {
        sqlx::query("INSERT INTO follows (followed, follower, created_at) VALUES (?, ?, ?)")
            .bind(followed_id)
            .bind(follower_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(true)
    }

    /// Insert retweet
    ///
    /// Not deduplicated; repeated calls add repeated rows.
    pub async fn create_retweet(&self, user_id: i64, tweet_id: i64) -> Result<bool, AppError> {
        sqlx::query("INSERT INTO retweets (user_id, tweet_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(tweet_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(true)
    }

    /// Insert like
    ///
    /// Not deduplicated; repeated calls add repeated rows.
    pub async fn create_like(&self, user_id: i64, tweet_id: i64) -> Result<bool, AppError> {
        sqlx::query("INSERT INTO likes (user_id, tweet_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(tweet_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(true)
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    /// Create a conversation between two users
    ///
    /// Three sequential statements without a transaction: a failure part way
    /// leaves the earlier rows in place.
    pub async fn create_two_users_conversation(
        &self,
        user_id: i64,
        other_id: i64,
    ) -> Result<i64, AppError> {
        let conversation_id = sqlx::query("INSERT INTO conversations (created_at) VALUES (?)")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        for member_id in [user_id, other_id] {
            sqlx::query("INSERT INTO conversations_users (conversation_id, user_id) VALUES (?, ?)")
                .bind(conversation_id)
                .bind(member_id)
                .execute(&self.pool)
                .await?;
        }

        tracing::info!(conversation_id, user_id, other_id, "Conversation created");

        Ok(conversation_id)
    }

    /// Find the conversation whose members are exactly these two users
    ///
    /// # Returns
    /// Lowest matching conversation ID, or None
    pub async fn get_two_users_conversation(
        &self,
        user_id: i64,
        other_id: i64,
    ) -> Result<Option<i64>, AppError> {
        let conversation_id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT a.conversation_id
            FROM conversations_users a
            INNER JOIN conversations_users b
                ON b.conversation_id = a.conversation_id AND b.user_id = ?
            WHERE a.user_id = ?
              AND (SELECT COUNT(*) FROM conversations_users m
                   WHERE m.conversation_id = a.conversation_id) = 2
            ORDER BY a.conversation_id ASC
            LIMIT 1
            "#,
        )
        .bind(other_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation_id)
    }

    /// Check conversation membership
    pub async fn is_conversation_member(
        &self,
        conversation_id: i64,
        user_id: i64,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM conversations_users WHERE conversation_id = ? AND user_id = ?)",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert a message only if the sender belongs to the conversation
    ///
    /// The membership check is the guard of the INSERT itself, so there is no
    /// window between check and write.
    ///
    /// # Returns
    /// `Some(id)` if inserted, `None` if the sender is not a member.
    pub async fn smart_create_message(
        &self,
        request: &MessageRequest,
    ) -> Result<Option<i64>, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (text, conversation_id, user_id, created_at)
            SELECT ?, ?, ?, ?
            WHERE EXISTS (
                SELECT 1 FROM conversations_users
                WHERE conversation_id = ? AND user_id = ?
            )
            "#,
        )
        .bind(&request.text)
        .bind(request.conversation_id)
        .bind(request.sender_id)
        .bind(Utc::now())
        .bind(request.conversation_id)
        .bind(request.sender_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(result.last_insert_rowid()))
    }

    /// Conversations of a user, each with its latest message
    ///
    /// Ordered by latest activity, newest first.
    pub async fn get_conversations(&self, user_id: i64) -> Result<Vec<Conversation>, AppError> {
        let started = Instant::now();
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            WITH latest AS (
                SELECT m.conversation_id, m.text, m.created_at,
                       ROW_NUMBER() OVER (
                           PARTITION BY m.conversation_id
                           ORDER BY m.created_at DESC, m.id DESC
                       ) AS rn
                FROM messages m
            )
            SELECT c.id, c.name, c.created_at,
                   l.text AS last_message_text,
                   l.created_at AS last_message_at,
                   o.id AS other_user_id,
                   o.username AS other_username,
                   o.display_name AS other_display_name
            FROM conversations_users me
            INNER JOIN conversations c ON c.id = me.conversation_id
            LEFT JOIN latest l ON l.conversation_id = c.id AND l.rn = 1
            LEFT JOIN users o ON o.id = (
                SELECT MIN(cu.user_id) FROM conversations_users cu
                WHERE cu.conversation_id = c.id AND cu.user_id <> me.user_id
            )
            WHERE me.user_id = ?
            ORDER BY COALESCE(l.created_at, c.created_at) DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        observe_db_query("SELECT", "conversations", started.elapsed());

        Ok(conversations)
    }

    /// Full message history of a conversation, oldest first
    pub async fn get_conversation(&self, conversation_id: i64) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT m.id, m.conversation_id, m.user_id AS sender_id,
                   u.username AS sender_username,
                   u.display_name AS sender_display_name,
                   m.text, m.created_at
            FROM messages m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.conversation_id = ?
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Likes and retweets by other users on tweets authored by `user_id`
    ///
    /// One row per distinct (tweet, actor, action), stamped with the earliest
    /// matching engagement, newest first.
    pub async fn get_notifications(&self, user_id: i64) -> Result<Vec<Notification>, AppError> {
        let started = Instant::now();
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT t.id AS tweet_id, t.text AS tweet_text,
                   u.id AS actor_id, u.username AS actor_username,
                   u.display_name AS actor_display_name,
                   e.kind, e.created_at
            FROM (
                SELECT tweet_id, user_id, 'like' AS kind, MIN(created_at) AS created_at
                FROM likes GROUP BY tweet_id, user_id
                UNION ALL
                SELECT tweet_id, user_id, 'retweet' AS kind, MIN(created_at) AS created_at
                FROM retweets GROUP BY tweet_id, user_id
            ) e
            INNER JOIN tweets t ON t.id = e.tweet_id AND t.user_id = ?
            INNER JOIN users u ON u.id = e.user_id
            WHERE e.user_id <> ?
            ORDER BY e.created_at DESC, t.id DESC, e.kind ASC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        observe_db_query("SELECT", "notifications", started.elapsed());

        Ok(notifications)
    }

    // =========================================================================
    // Test helpers
    // =========================================================================

    #[cfg(test)]
    pub async fn set_tweet_created_at_for_test(
        &self,
        tweet_id: i64,
        created_at: chrono::DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE tweets SET created_at = ? WHERE id = ?")
            .bind(created_at)
            .bind(tweet_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn set_message_created_at_for_test(
        &self,
        message_id: i64,
        created_at: chrono::DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE messages SET created_at = ? WHERE id = ?")
            .bind(created_at)
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn set_engagement_created_at_for_test(
        &self,
        table: &str,
        user_id: i64,
        tweet_id: i64,
        created_at: chrono::DateTime<Utc>,
    ) -> Result<(), AppError> {
        let sql = match table {
            "likes" => "UPDATE likes SET created_at = ? WHERE user_id = ? AND tweet_id = ?",
            "retweets" => "UPDATE retweets SET created_at = ? WHERE user_id = ? AND tweet_id = ?",
            other => return Err(AppError::Validation(format!("unknown table {other}"))),
        };
        sqlx::query(sql)
            .bind(created_at)
            .bind(user_id)
            .bind(tweet_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
