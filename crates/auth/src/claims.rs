use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lorecraft_core::UserId;

use crate::token::TokenError;
use crate::user::Identity;

/// Session token payload.
///
/// The token is the session: these claims are everything the server knows
/// about it, and nothing is looked up on verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Lifecycle state of a signature-valid token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Expired,
}

impl Claims {
    pub fn for_identity(identity: &Identity, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            issued_at,
            expires_at,
        }
    }

    /// Active strictly before `expires_at`.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if now < self.expires_at {
            TokenState::Active
        } else {
            TokenState::Expired
        }
    }
}

/// Validate the time window of already signature-checked claims.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenError::Invalid);
    }
    match claims.state_at(now) {
        TokenState::Active => Ok(()),
        TokenState::Expired => Err(TokenError::Expired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(now: DateTime<Utc>, ttl: Duration) -> Claims {
        let identity = Identity::new("alice", "alice@example.com", now);
        Claims::for_identity(&identity, now, now + ttl)
    }

    #[test]
    fn active_until_expiry_instant() {
        let now = Utc::now();
        let c = claims(now, Duration::minutes(10));

        assert_eq!(validate_claims(&c, now), Ok(()));
        assert_eq!(validate_claims(&c, c.expires_at - Duration::nanoseconds(1)), Ok(()));
        assert_eq!(validate_claims(&c, c.expires_at), Err(TokenError::Expired));
        assert_eq!(validate_claims(&c, c.expires_at + Duration::hours(1)), Err(TokenError::Expired));
    }

    #[test]
    fn inverted_window_is_invalid_not_expired() {
        let now = Utc::now();
        let mut c = claims(now, Duration::minutes(10));
        c.expires_at = c.issued_at;

        assert_eq!(validate_claims(&c, now - Duration::hours(1)), Err(TokenError::Invalid));
    }

    #[test]
    fn serializes_timestamps_as_rfc3339() {
        let now = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let c = claims(now, Duration::hours(1));
        let json = serde_json::to_value(&c).unwrap();

        assert_eq!(json["issued_at"], "2026-01-02T03:04:05Z");
        assert_eq!(json["expires_at"], "2026-01-02T04:04:05Z");
        assert_eq!(json["username"], "alice");
        assert_eq!(json["user_id"], c.user_id.to_string());
    }
}
