//! Identity, credentials input, and the storage contract the auth use case
//! consumes.
//!
//! Storage itself lives outside this crate; anything implementing
//! [`UserStore`] can back registration and login.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lorecraft_core::{DomainError, DomainResult, UserId};

/// The durable principal. Owned by storage; the auth core only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// A freshly registered identity.
    pub fn new(username: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            avatar_url: None,
            active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }
}

/// What storage keeps per user: the identity plus its password record.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub identity: Identity,
    pub password_hash: String,
}

impl core::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserRecord")
            .field("identity", &self.identity)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Storage errors surfaced to the auth use case.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("user already exists")]
    Duplicate,

    #[error("user not found")]
    NotFound,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// User lookup/persistence consumed by registration and login.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    async fn insert(&self, record: UserRecord) -> Result<(), StoreError>;

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Registration request. The password is consumed once and never stored.
#[derive(Clone, Deserialize)]
pub struct RegistrationInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationInput {
    pub fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();

        if self.username.trim().is_empty() {
            problems.push("username is required".to_string());
        }

        if self.email.trim().is_empty() {
            problems.push("email is required".to_string());
        } else if !self.email.contains('@') {
            problems.push("email is invalid".to_string());
        }

        if self.password.chars().count() < 8 {
            problems.push("password must be at least 8 characters".to_string());
        }

        DomainError::check(problems)
    }
}

impl core::fmt::Debug for RegistrationInput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegistrationInput")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Login request.
#[derive(Clone, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();

        if self.username.chars().count() < 4 {
            problems.push("username must be at least 4 characters".to_string());
        }

        if self.password.chars().count() < 8 {
            problems.push("password must be at least 8 characters".to_string());
        }

        DomainError::check(problems)
    }
}

impl core::fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginInput")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, password: &str) -> RegistrationInput {
        RegistrationInput {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(registration("alice", "alice@example.com", "Password123!").validate().is_ok());
    }

    #[test]
    fn registration_reports_every_problem() {
        let err = registration("  ", "alice.example.com", "short").validate().unwrap_err();
        let DomainError::Validation(problems) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            problems,
            vec![
                "username is required",
                "email is invalid",
                "password must be at least 8 characters",
            ]
        );
    }

    #[test]
    fn login_requires_minimum_lengths() {
        let input = LoginInput {
            username: "bob".to_string(),
            password: "1234567".to_string(),
        };
        let DomainError::Validation(problems) = input.validate().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn debug_never_prints_passwords() {
        let input = registration("alice", "alice@example.com", "Password123!");
        assert!(!format!("{input:?}").contains("Password123!"));

        let record = UserRecord {
            identity: Identity::new("alice", "alice@example.com", Utc::now()),
            password_hash: "$argon2id$secret".to_string(),
        };
        assert!(!format!("{record:?}").contains("$argon2id$secret"));
    }
}
