//! Registration and login.
//!
//! Credentials go through the password hasher; a successful registration or
//! login ends with a freshly issued session token bound to the identity.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use lorecraft_core::DomainError;

use crate::password::{PasswordError, PasswordHashing};
use crate::token::{TokenError, TokenMaker};
use crate::user::{Identity, LoginInput, RegistrationInput, StoreError, UserRecord, UserStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("user already exists")]
    UserAlreadyExists,

    /// Unknown user and wrong password are the same error.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A stored password record cannot be used (malformed or from an
    /// unsupported Argon2 version). Needs operator attention.
    #[error("password record unusable: {0}")]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result of a successful registration or login.
#[derive(Clone, Serialize)]
pub struct AuthOutput {
    pub user: Identity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl core::fmt::Debug for AuthOutput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthOutput")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHashing>,
    tokens: Arc<dyn TokenMaker>,
    token_ttl: Duration,
    // Verified against when the username is unknown, so both failure paths
    // cost one key derivation.
    dummy_record: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHashing>,
        tokens: Arc<dyn TokenMaker>,
        token_ttl: Duration,
    ) -> Result<Self, ServiceError> {
        if token_ttl <= Duration::zero() {
            return Err(TokenError::InvalidTtl.into());
        }
        let dummy_record = hasher.hash("lorecraft-dummy-password")?;

        Ok(Self {
            store,
            hasher,
            tokens,
            token_ttl,
            dummy_record,
        })
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub async fn register(&self, input: RegistrationInput) -> Result<AuthOutput, ServiceError> {
        input.validate()?;

        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if self
            .store
            .find_by_username_or_email(&username, &email)
            .await?
            .is_some()
        {
            return Err(ServiceError::UserAlreadyExists);
        }

        let password_hash = self.hash_off_executor(input.password).await?;
        let identity = Identity::new(username, email, Utc::now());

        self.store
            .insert(UserRecord {
                identity: identity.clone(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => ServiceError::UserAlreadyExists,
                other => other.into(),
            })?;

        tracing::info!(user_id = %identity.id, "user registered");
        self.issue(identity)
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthOutput, ServiceError> {
        input.validate()?;

        let Some(record) = self.store.find_by_username(input.username.trim()).await? else {
            let _ = self
                .verify_off_executor(input.password, self.dummy_record.clone())
                .await;
            tracing::debug!("login rejected: unknown username");
            return Err(ServiceError::InvalidCredentials);
        };

        let matched = self
            .verify_off_executor(input.password, record.password_hash.clone())
            .await
            .inspect_err(|e| {
                tracing::error!(user_id = %record.identity.id, error = %e, "stored password record unusable");
            })?;
        if !matched || !record.identity.active {
            tracing::debug!(user_id = %record.identity.id, "login rejected");
            return Err(ServiceError::InvalidCredentials);
        }

        let now = Utc::now();
        self.store.record_login(record.identity.id, now).await?;

        let mut identity = record.identity;
        identity.last_login_at = Some(now);

        tracing::info!(user_id = %identity.id, "user logged in");
        self.issue(identity)
    }

    fn issue(&self, identity: Identity) -> Result<AuthOutput, ServiceError> {
        let issued = self.tokens.issue(&identity, self.token_ttl)?;
        Ok(AuthOutput {
            user: identity,
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    // Argon2 is slow; keep it off the async workers.
    async fn hash_off_executor(&self, password: String) -> Result<String, ServiceError> {
        let hasher = Arc::clone(&self.hasher);
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;
        Ok(hashed)
    }

    async fn verify_off_executor(
        &self,
        password: String,
        record: String,
    ) -> Result<bool, ServiceError> {
        let hasher = Arc::clone(&self.hasher);
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&password, &record))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;
        Ok(matched)
    }
}

impl core::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthService")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}
