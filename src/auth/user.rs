//! # User Management
//!
//! User records live as documents in the `users` collection, written
//! through the same store trait the interpreter dispatches against. That
//! is exactly why the interpreter's access policy denies that collection
//! unconditionally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::store::DocumentStore;

use super::crypto::{hash_password, verify_password, PasswordPolicy};
use super::errors::{AuthError, AuthResult};

/// Collection holding user records
pub const USERS_COLLECTION: &str = "users";

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,

    /// Login name (unique)
    pub username: String,

    /// Argon2id password hash, never plaintext
    pub password_hash: String,

    /// When the user registered
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a freshly hashed password
    pub fn new(username: String, password: &str, policy: &PasswordPolicy) -> AuthResult<Self> {
        policy.validate(password)?;
        let password_hash = hash_password(password)?;

        Ok(Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at: Utc::now(),
        })
    }

    /// Client-safe view: everything except the password hash
    pub fn public_view(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "created_at": self.created_at,
        })
    }
}

/// Registration and login over the store
pub struct UserDirectory {
    store: Arc<dyn DocumentStore>,
    policy: PasswordPolicy,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, policy: PasswordPolicy) -> Self {
        Self { store, policy }
    }

    /// Register a new user; usernames are unique
    pub fn register(&self, username: &str, password: &str) -> AuthResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        if self.find_by_username(username)?.is_some() {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }

        let user = User::new(username.to_string(), password, &self.policy)?;
        let document = serde_json::to_value(&user)
            .map_err(|err| AuthError::Store(err.to_string()))?;
        self.store.insert_one(USERS_COLLECTION, document)?;
        Ok(user)
    }

    /// Verify credentials, returning the user on success.
    ///
    /// Unknown username and wrong password produce the same error.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthResult<User> {
        let user = self
            .find_by_username(username.trim())?
            .ok_or(AuthError::InvalidCredentials)?;

        if verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    pub fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let document = self
            .store
            .find_one(USERS_COLLECTION, &json!({"username": username}))?;

        match document {
            Some(document) => {
                let user = serde_json::from_value(document)
                    .map_err(|err| AuthError::Store(err.to_string()))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn directory() -> UserDirectory {
        UserDirectory::new(Arc::new(MemoryStore::new()), PasswordPolicy::default())
    }

    #[test]
    fn test_register_and_authenticate() {
        let directory = directory();
        let user = directory.register("ada", "strong enough").unwrap();
        assert_eq!(user.username, "ada");

        let back = directory.authenticate("ada", "strong enough").unwrap();
        assert_eq!(back.id, user.id);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let directory = directory();
        directory.register("ada", "strong enough").unwrap();
        assert!(matches!(
            directory.register("ada", "other password"),
            Err(AuthError::UsernameTaken(_))
        ));
    }

    #[test]
    fn test_wrong_password_and_unknown_user_look_alike() {
        let directory = directory();
        directory.register("ada", "strong enough").unwrap();

        let wrong = directory.authenticate("ada", "nope nope").unwrap_err();
        let unknown = directory.authenticate("ghost", "nope nope").unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn test_weak_password_rejected() {
        let directory = directory();
        assert!(matches!(
            directory.register("ada", "short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_public_view_hides_password_hash() {
        let directory = directory();
        let user = directory.register("ada", "strong enough").unwrap();
        let view = user.public_view();
        assert!(view.get("password_hash").is_none());
        assert_eq!(view["username"], "ada");
    }

    #[test]
    fn test_stored_document_round_trips() {
        let directory = directory();
        let user = directory.register("ada", "strong enough").unwrap();

        let found = directory.find_by_username("ada").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, user.password_hash);
    }
}
