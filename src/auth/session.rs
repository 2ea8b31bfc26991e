//! # Session Management
//!
//! Short-lived JWT access tokens plus single-use refresh tokens.
//! Refresh tokens are stored hashed in the `sessions` collection; the
//! raw value is only ever handed to the client.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::interpreter::CallerContext;
use crate::store::DocumentStore;

use super::crypto::{generate_token, hash_token};
use super::errors::{AuthError, AuthResult};
use super::user::User;

/// Collection holding session records
pub const SESSIONS_COLLECTION: &str = "sessions";

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Login name, for logging on the caller side
    pub username: String,

    /// Issued at (Unix epoch seconds)
    pub iat: i64,

    /// Expiration (Unix epoch seconds)
    pub exp: i64,

    /// Issuer
    pub iss: String,
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC signing secret
    pub secret: String,

    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,

    /// Refresh token lifetime in days
    pub refresh_ttl_days: i64,

    /// Issuer identifier
    pub issuer: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 30,
            issuer: "docshell".to_string(),
        }
    }
}

/// Stored session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,

    /// SHA-256 of the refresh token
    pub refresh_token_hash: String,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

/// Token pair returned on login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and validates sessions
pub struct SessionManager {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    store: Arc<dyn DocumentStore>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, store: Arc<dyn DocumentStore>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
            store,
        }
    }

    /// Open a session: issue an access token and persist a refresh record
    pub fn open(&self, user: &User) -> AuthResult<TokenPair> {
        let refresh_token = generate_token();
        let now = Utc::now();

        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            username: user.username.clone(),
            refresh_token_hash: hash_token(&refresh_token),
            created_at: now,
            expires_at: now + Duration::days(self.config.refresh_ttl_days),
            revoked: false,
        };
        let document =
            serde_json::to_value(&session).map_err(|err| AuthError::Store(err.to_string()))?;
        self.store.insert_one(SESSIONS_COLLECTION, document)?;

        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token,
        })
    }

    /// Validate a bearer token into a caller context
    pub fn verify_access_token(&self, token: &str) -> AuthResult<CallerContext> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;

        Ok(CallerContext::authenticated(user_id, data.claims.username))
    }

    /// Exchange a refresh token for a new pair. Single use: the old
    /// session record is revoked before the new one is written.
    pub fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let hash = hash_token(refresh_token);
        let session_doc = self
            .store
            .find_one(
                SESSIONS_COLLECTION,
                &json!({"refresh_token_hash": hash, "revoked": false}),
            )?
            .ok_or(AuthError::InvalidToken)?;
        let session: Session = serde_json::from_value(session_doc)
            .map_err(|err| AuthError::Store(err.to_string()))?;

        if session.expires_at < Utc::now() {
            return Err(AuthError::InvalidToken);
        }

        self.store.update_one(
            SESSIONS_COLLECTION,
            &json!({"id": session.id}),
            &json!({"$set": {"revoked": true}}),
        )?;

        let user = User {
            id: session.user_id,
            username: session.username.clone(),
            password_hash: String::new(),
            created_at: session.created_at,
        };
        self.open(&user)
    }

    /// Revoke the session holding this refresh token
    pub fn revoke(&self, refresh_token: &str) -> AuthResult<()> {
        let hash = hash_token(refresh_token);
        let outcome = self.store.update_one(
            SESSIONS_COLLECTION,
            &json!({"refresh_token_hash": hash, "revoked": false}),
            &json!({"$set": {"revoked": true}}),
        )?;

        if outcome.matched == 0 {
            return Err(AuthError::InvalidToken);
        }
        Ok(())
    }

    fn issue_access_token(&self, user: &User) -> AuthResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.config.access_ttl_minutes)).timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::HashingFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::PasswordPolicy;
    use crate::store::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, SessionManager, User) {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(SessionConfig::default(), store.clone());
        let user = User::new("ada".to_string(), "strong enough", &PasswordPolicy::default())
            .unwrap();
        (store, manager, user)
    }

    #[test]
    fn test_open_session_and_verify_token() {
        let (_store, manager, user) = setup();
        let pair = manager.open(&user).unwrap();

        let ctx = manager.verify_access_token(&pair.access_token).unwrap();
        assert_eq!(ctx.user_id, Some(user.id));
        assert_eq!(ctx.username.as_deref(), Some("ada"));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let (_store, manager, _user) = setup();
        assert!(matches!(
            manager.verify_access_token("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let (_store, manager, user) = setup();
        let other = SessionManager::new(
            SessionConfig {
                secret: "different secret".to_string(),
                ..SessionConfig::default()
            },
            Arc::new(MemoryStore::new()),
        );
        let pair = other.open(&user).unwrap();

        assert!(manager.verify_access_token(&pair.access_token).is_err());
    }

    #[test]
    fn test_refresh_rotates_and_revokes() {
        let (store, manager, user) = setup();
        let pair = manager.open(&user).unwrap();

        let next = manager.refresh(&pair.refresh_token).unwrap();
        assert_ne!(next.refresh_token, pair.refresh_token);

        // The old refresh token is single-use
        assert!(manager.refresh(&pair.refresh_token).is_err());

        // Two session records: one revoked, one live
        use crate::store::DocumentStore;
        let live = store
            .count(SESSIONS_COLLECTION, Some(&json!({"revoked": false})))
            .unwrap();
        assert_eq!(live, 1);
    }

    #[test]
    fn test_revoke_invalidates_refresh_token() {
        let (_store, manager, user) = setup();
        let pair = manager.open(&user).unwrap();

        manager.revoke(&pair.refresh_token).unwrap();
        assert!(manager.refresh(&pair.refresh_token).is_err());
        assert!(manager.revoke(&pair.refresh_token).is_err());
    }
}
