//! `lorecraft-auth`: credential and session authentication (zero-trust).
//!
//! Password hashing, token signing/verification, request authentication, and
//! the campaign role check. This crate is decoupled from HTTP
//! and storage: it consumes a [`UserStore`] and base64-of-PEM key material,
//! and hands back verified [`Claims`] or a classified failure.

pub mod authorize;
pub mod claims;
pub mod gate;
pub mod keys;
pub mod password;
pub mod roles;
pub mod service;
pub mod token;
pub mod user;

pub use authorize::{AuthzError, authorize};
pub use claims::{Claims, TokenState, validate_claims};
pub use gate::{
    AUTH_COOKIE_NAME, AuthFailure, AuthenticationGate, clear_session_cookie, cookie_value,
    extract_token, session_cookie,
};
pub use keys::{KeyError, KeyPair};
pub use password::{CostParams, PasswordError, PasswordHasher, PasswordHashing, PasswordRecord};
pub use roles::{MemberRole, has_permission};
pub use service::{AuthOutput, AuthService, ServiceError};
pub use token::{IssuedToken, TokenAuthority, TokenError, TokenMaker};
pub use user::{Identity, LoginInput, RegistrationInput, StoreError, UserRecord, UserStore};
