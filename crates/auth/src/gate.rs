//! Request-level authentication contract.
//!
//! Turns the credential carried by a request (an `Authorization: Bearer`
//! header, or the session cookie when no header is present) into verified
//! claims. Transport-agnostic: callers pass the raw header values.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::claims::Claims;
use crate::token::{TokenError, TokenMaker};

/// Name of the cookie that carries the raw session token.
pub const AUTH_COOKIE_NAME: &str = "auth_token";

const BEARER_PREFIX: &str = "Bearer ";

/// Why a request failed to authenticate.
///
/// The kind is for logs only; every variant must reach the client as the same
/// "unauthorized" response.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("missing authentication credentials")]
    MissingCredentials,

    #[error("malformed token")]
    MalformedToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("expired token")]
    ExpiredToken,
}

impl AuthFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthFailure::MissingCredentials => "missing_credentials",
            AuthFailure::MalformedToken => "malformed_token",
            AuthFailure::InvalidToken => "invalid_token",
            AuthFailure::ExpiredToken => "expired_token",
        }
    }
}

impl From<TokenError> for AuthFailure {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthFailure::ExpiredToken,
            TokenError::Invalid | TokenError::InvalidTtl | TokenError::Signing(_) => {
                AuthFailure::InvalidToken
            }
        }
    }
}

/// Pick the token out of a request's credentials.
///
/// A present `Authorization` header wins and must read `Bearer <token>`; the
/// cookie is only consulted when the header is absent.
pub fn extract_token<'a>(
    authorization: Option<&'a str>,
    cookie: Option<&'a str>,
) -> Result<&'a str, AuthFailure> {
    if let Some(header) = authorization {
        let token = header
            .strip_prefix(BEARER_PREFIX)
            .ok_or(AuthFailure::MalformedToken)?
            .trim();
        if token.is_empty() {
            return Err(AuthFailure::MalformedToken);
        }
        return Ok(token);
    }

    match cookie {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AuthFailure::MissingCredentials),
    }
}

/// Find a cookie's value in a `Cookie` request header (`a=1; b=2`).
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}

/// `Set-Cookie` value that establishes a session.
pub fn session_cookie(token: &str, expires_at: DateTime<Utc>, secure: bool) -> String {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    let mut cookie = format!(
        "{AUTH_COOKIE_NAME}={token}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session cookie on the client.
///
/// The token itself stays valid until it expires.
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{AUTH_COOKIE_NAME}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Authenticates requests against a [`TokenMaker`].
#[derive(Clone)]
pub struct AuthenticationGate {
    tokens: Arc<dyn TokenMaker>,
}

impl AuthenticationGate {
    pub fn new(tokens: Arc<dyn TokenMaker>) -> Self {
        Self { tokens }
    }

    /// Verify the request's credential and return its claims.
    ///
    /// A malformed header is rejected before any verification is attempted.
    pub fn authenticate(
        &self,
        authorization: Option<&str>,
        cookie: Option<&str>,
    ) -> Result<Claims, AuthFailure> {
        let token = extract_token(authorization, cookie)?;
        self.tokens.verify(token).map_err(AuthFailure::from)
    }
}

impl core::fmt::Debug for AuthenticationGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthenticationGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;

    use super::*;
    use crate::keys::fixtures;
    use crate::token::{IssuedToken, TokenAuthority};
    use crate::user::Identity;

    /// Accepts exactly one token string and counts verification attempts.
    struct FakeTokens {
        valid: &'static str,
        calls: AtomicUsize,
    }

    impl FakeTokens {
        fn new(valid: &'static str) -> Arc<Self> {
            Arc::new(Self {
                valid,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl TokenMaker for FakeTokens {
        fn issue(&self, _identity: &Identity, _ttl: Duration) -> Result<IssuedToken, TokenError> {
            Err(TokenError::Signing("not supported".to_string()))
        }

        fn verify(&self, token: &str) -> Result<Claims, TokenError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match token {
                t if t == self.valid => {
                    let now = Utc::now();
                    let identity = Identity::new("alice", "alice@example.com", now);
                    Ok(Claims::for_identity(&identity, now, now + Duration::hours(1)))
                }
                "expired" => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            }
        }
    }

    #[test]
    fn bearer_header_is_preferred_over_cookie() {
        assert_eq!(extract_token(Some("Bearer abc"), Some("cookie")), Ok("abc"));
    }

    #[test]
    fn header_without_bearer_prefix_is_malformed() {
        for header in ["sometoken", "bearer abc", "Basic dXNlcjpwYXNz", "Bearer", "Bearer   "] {
            assert_eq!(
                extract_token(Some(header), Some("cookie-token")),
                Err(AuthFailure::MalformedToken),
                "{header}"
            );
        }
    }

    #[test]
    fn falls_back_to_cookie_without_header() {
        assert_eq!(extract_token(None, Some("cookie-token")), Ok("cookie-token"));
    }

    #[test]
    fn nothing_or_empty_cookie_is_missing() {
        assert_eq!(extract_token(None, None), Err(AuthFailure::MissingCredentials));
        assert_eq!(extract_token(None, Some("")), Err(AuthFailure::MissingCredentials));
    }

    #[test]
    fn finds_cookie_among_others() {
        let header = "theme=dark; auth_token=abc.def.ghi; lang=en";
        assert_eq!(cookie_value(header, AUTH_COOKIE_NAME), Some("abc.def.ghi"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("auth_token_old=x", AUTH_COOKIE_NAME), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok", Utc::now() + Duration::hours(1), true);
        assert!(cookie.starts_with("auth_token=tok; Path=/;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.ends_with("; Secure"));

        let plain = session_cookie("tok", Utc::now() + Duration::hours(1), false);
        assert!(!plain.contains("Secure"));
    }

    #[test]
    fn clearing_cookie_is_empty_with_same_attributes() {
        let cookie = clear_session_cookie(true);
        assert_eq!(
            cookie,
            "auth_token=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn malformed_header_never_reaches_verification() {
        let tokens = FakeTokens::new("good");
        let gate = AuthenticationGate::new(tokens.clone());

        assert_eq!(
            gate.authenticate(Some("sometoken"), None).unwrap_err(),
            AuthFailure::MalformedToken
        );
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn verification_failures_are_classified() {
        let tokens = FakeTokens::new("good");
        let gate = AuthenticationGate::new(tokens.clone());

        assert!(gate.authenticate(Some("Bearer good"), None).is_ok());
        assert!(gate.authenticate(None, Some("good")).is_ok());
        assert_eq!(
            gate.authenticate(Some("Bearer expired"), None).unwrap_err(),
            AuthFailure::ExpiredToken
        );
        assert_eq!(
            gate.authenticate(None, Some("forged")).unwrap_err(),
            AuthFailure::InvalidToken
        );
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn accepts_token_from_the_real_authority() {
        let authority = Arc::new(TokenAuthority::new(fixtures::key_pair()));
        let identity = Identity::new("alice", "alice@example.com", Utc::now());
        let issued = authority.issue_token(&identity, Duration::minutes(15)).unwrap();

        let gate = AuthenticationGate::new(authority);
        let header = format!("Bearer {}", issued.token);
        let claims = gate.authenticate(Some(&header), None).unwrap();

        assert_eq!(claims.user_id, identity.id);
    }
}
