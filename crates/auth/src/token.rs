//! Signed, stateless session tokens.
//!
//! Tokens are JWS compact (JWT) documents signed with EdDSA over the whole
//! claims payload. Verification is a pure function of the token, the public
//! key, and the current time: there is no server-side session table and no
//! revocation list, so a token stays valid until it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use thiserror::Error;

use crate::claims::{Claims, validate_claims};
use crate::keys::{KeyError, KeyPair};
use crate::user::Identity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, wrong algorithm, or undecodable token.
    #[error("token is invalid")]
    Invalid,

    /// Signature verified, but `now >= expires_at`.
    #[error("token has expired")]
    Expired,

    #[error("token ttl must be positive")]
    InvalidTtl,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// A freshly issued token and the instant it stops being valid.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl core::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Token issuing/verification capability.
pub trait TokenMaker: Send + Sync {
    fn issue(&self, identity: &Identity, ttl: Duration) -> Result<IssuedToken, TokenError>;

    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

/// Issues and verifies session tokens with an immutable Ed25519 key pair.
///
/// Construct once at startup and share by reference (`Arc`); no locking is
/// needed since nothing here mutates after construction.
#[derive(Debug)]
pub struct TokenAuthority {
    keys: KeyPair,
    validation: Validation,
}

impl TokenAuthority {
    pub fn new(keys: KeyPair) -> Self {
        let mut validation = Validation::new(Algorithm::EdDSA);
        // Expiry comes from the `expires_at` claim, without leeway.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self { keys, validation }
    }

    pub fn from_base64_pem(private_b64: &str, public_b64: &str) -> Result<Self, KeyError> {
        Ok(Self::new(KeyPair::from_base64_pem(private_b64, public_b64)?))
    }

    pub fn issue_token(&self, identity: &Identity, ttl: Duration) -> Result<IssuedToken, TokenError> {
        self.issue_token_at(identity, ttl, Utc::now())
    }

    pub fn issue_token_at(
        &self,
        identity: &Identity,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        if ttl <= Duration::zero() {
            return Err(TokenError::InvalidTtl);
        }
        let expires_at = now.checked_add_signed(ttl).ok_or(TokenError::InvalidTtl)?;

        let claims = Claims::for_identity(identity, now, expires_at);
        let token = encode(&Header::new(Algorithm::EdDSA), &claims, self.keys.encoding_key())
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_token_at(token, Utc::now())
    }

    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, self.keys.decoding_key(), &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token signature verification failed");
            TokenError::Invalid
        })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl TokenMaker for TokenAuthority {
    fn issue(&self, identity: &Identity, ttl: Duration) -> Result<IssuedToken, TokenError> {
        self.issue_token(identity, ttl)
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_token(token)
    }
}
