//! Account service
//!
//! Login/registration, profiles and follows.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::password::{hash_password, verify_password};
use crate::data::{CrossUsers, Database, Tweet, User, UserEdits, non_blank, or_empty};
use crate::error::AppError;

pub const MAX_USERNAME_CHARS: usize = 50;
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;
pub const MAX_BIO_CHARS: usize = 160;
pub const MAX_LOCATION_CHARS: usize = 30;
pub const MAX_WEBSITE_CHARS: usize = 100;

/// Result of a login attempt that succeeded
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: i64,
    pub username: String,
    /// True when this login created the account
    pub registered: bool,
}

/// A user's profile as seen by a viewer
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub relationship: CrossUsers,
    pub tweets: Vec<Tweet>,
}

/// Submitted profile form; blank fields clear the column.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

fn check_length(field: &str, value: &Option<String>, max: usize) -> Result<(), AppError> {
    match value {
        Some(value) if value.chars().count() > max => Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Log in, registering the user on first sight
    ///
    /// An unknown username is registered with the submitted password.
    /// A known username must present the matching password.
    ///
    /// # Errors
    /// - `Validation` for an empty username or password
    /// - `Unauthorized` on password mismatch
    pub async fn login_or_register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("username cannot be empty".to_string()));
        }
        if password.is_empty() {
            return Err(AppError::Validation("password cannot be empty".to_string()));
        }
        if username.chars().count() > MAX_USERNAME_CHARS {
            return Err(AppError::Validation(format!(
                "username must be at most {} characters",
                MAX_USERNAME_CHARS
            )));
        }

        match self.db.get_user_from_username(username).await {
            Ok(user) => {
                let password = password.to_string();
                let hash = user.password_hash.clone();
                let verified =
                    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                        .await
                        .map_err(|e| AppError::Internal(e.into()))?;

                if !verified {
                    tracing::warn!(username = %username, "Rejected login: password mismatch");
                    return Err(AppError::Unauthorized);
                }

                Ok(LoginOutcome {
                    user_id: user.id,
                    username: user.username,
                    registered: false,
                })
            }
            Err(AppError::NotFound) => {
                let password = password.to_string();
                let hash = tokio::task::spawn_blocking(move || hash_password(&password))
                    .await
                    .map_err(|e| AppError::Internal(e.into()))??;

                let user_id = self.db.create_user(username, &hash).await?;
                tracing::info!(user_id, username = %username, "User registered");

                Ok(LoginOutcome {
                    user_id,
                    username: username.to_string(),
                    registered: true,
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Profile page data: the user, the viewer's relationship to them and
    /// their history
    pub async fn profile(&self, username: &str, viewer_id: i64) -> Result<Profile, AppError> {
        let user = self.db.get_user_from_username(username).await?;
        let relationship = self.db.get_users_relationship(user.id, viewer_id).await?;
        let tweets = self.db.get_history(user.id, viewer_id).await?;

        Ok(Profile {
            user,
            relationship,
            tweets,
        })
    }

    /// Overwrite the viewer's profile fields
    ///
    /// Blank fields are stored as absent.
    pub async fn edit_profile(&self, user_id: i64, form: ProfileForm) -> Result<User, AppError> {
        let edits = UserEdits {
            id: user_id,
            display_name: non_blank(form.display_name),
            bio: non_blank(form.bio),
            location: non_blank(form.location),
            website: non_blank(form.website),
        };

        check_length("display_name", &edits.display_name, MAX_DISPLAY_NAME_CHARS)?;
        check_length("bio", &edits.bio, MAX_BIO_CHARS)?;
        check_length("location", &edits.location, MAX_LOCATION_CHARS)?;
        check_length("website", &edits.website, MAX_WEBSITE_CHARS)?;

        self.db.edit_user(&edits).await?;
        let user = self.db.get_user_by_id(user_id).await?;
        tracing::info!(
            user_id,
            name = user.shown_name(),
            website = or_empty(&user.website),
            "Profile updated"
        );
        Ok(user)
    }

    /// Follow `username` as the viewer
    ///
    /// Following someone already followed is a no-op.
    ///
    /// # Errors
    /// - `NotFound` if the user does not exist
    /// - `Validation` when following oneself
    pub async fn follow(&self, follower_id: i64, username: &str) -> Result<(), AppError> {
        let followed_id = self.db.get_user_id_from_username(username).await?;
        if followed_id == follower_id {
            return Err(AppError::Validation("cannot follow yourself".to_string()));
        }

        match self.db.create_follow(followed_id, follower_id).await {
            Ok(_) => Ok(()),
            Err(AppError::Database(sqlx::Error::Database(db_error)))
                if db_error.is_unique_violation() =>
            {
                tracing::debug!(followed_id, follower_id, "Already following");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_db() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-account.db");
        let db = Database::connect(&db_path).await.unwrap();
        (Arc::new(db), temp_dir)
    }

    #[tokio::test]
    async fn first_login_registers_and_second_login_verifies() {
        let (db, _temp_dir) = create_test_db().await;
        let service = AccountService::new(db.clone());

        let first = service.login_or_register(" alice ", "secret").await.unwrap();
        assert!(first.registered);
        assert_eq!(first.username, "alice");

        let stored = db.get_user_by_id(first.user_id).await.unwrap();
        assert_ne!(stored.password_hash, "secret");

        let second = service.login_or_register("alice", "secret").await.unwrap();
        assert!(!second.registered);
        assert_eq!(second.user_id, first.user_id);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (db, _temp_dir) = create_test_db().await;
        let service = AccountService::new(db);

        service.login_or_register("alice", "secret").await.unwrap();
        let error = service.login_or_register("alice", "guess").await.unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn empty_credentials_are_rejected() {
        let (db, _temp_dir) = create_test_db().await;
        let service = AccountService::new(db);

        let empty_name = service.login_or_register("   ", "secret").await.unwrap_err();
        assert!(matches!(empty_name, AppError::Validation(_)));

        let empty_password = service.login_or_register("alice", "").await.unwrap_err();
        assert!(matches!(empty_password, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn edit_profile_normalizes_blank_fields() {
        let (db, _temp_dir) = create_test_db().await;
        let service = AccountService::new(db);
        let alice = service.login_or_register("alice", "secret").await.unwrap();

        let user = service
            .edit_profile(
                alice.user_id,
                ProfileForm {
                    display_name: Some("  Alice  ".to_string()),
                    bio: Some("   ".to_string()),
                    location: Some("Lisbon".to_string()),
                    website: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(user.display_name.as_deref(), Some("Alice"));
        assert_eq!(user.bio, None);
        assert_eq!(user.location.as_deref(), Some("Lisbon"));
        assert_eq!(user.website, None);
    }

    #[tokio::test]
    async fn edit_profile_rejects_long_bio() {
        let (db, _temp_dir) = create_test_db().await;
        let service = AccountService::new(db);
        let alice = service.login_or_register("alice", "secret").await.unwrap();

        let error = service
            .edit_profile(
                alice.user_id,
                ProfileForm {
                    bio: Some("x".repeat(MAX_BIO_CHARS + 1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(message) if message.contains("bio")));
    }

    #[tokio::test]
    async fn follow_is_idempotent_and_shows_in_profile() {
        let (db, _temp_dir) = create_test_db().await;
        let service = AccountService::new(db);
        let alice = service.login_or_register("alice", "secret").await.unwrap();
        let bob = service.login_or_register("bob", "secret").await.unwrap();

        service.follow(alice.user_id, "bob").await.unwrap();
        service.follow(alice.user_id, "bob").await.unwrap();

        let profile = service.profile("bob", alice.user_id).await.unwrap();
        assert_eq!(profile.user.id, bob.user_id);
        assert_eq!(profile.relationship.followers, 1);
        assert_eq!(profile.relationship.follows, 0);
        assert!(profile.relationship.mutual_follow_back);

        let own = service.profile("alice", alice.user_id).await.unwrap();
        assert_eq!(own.relationship.follows, 1);
        assert!(!own.relationship.mutual_follow_back);
    }

    #[tokio::test]
    async fn follow_rejects_self_and_unknown_users() {
        let (db, _temp_dir) = create_test_db().await;
        let service = AccountService::new(db);
        let alice = service.login_or_register("alice", "secret").await.unwrap();

        let own = service.follow(alice.user_id, "alice").await.unwrap_err();
        assert!(matches!(own, AppError::Validation(_)));

        let missing = service.follow(alice.user_id, "ghost").await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound));
    }
}
