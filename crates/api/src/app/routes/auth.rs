//! Public credential endpoints.
//!
//! Successful register/login answer with the token in the body and as the
//! session cookie, so both browser and API clients can authenticate.

use std::sync::Arc;

use axum::{
    extract::{Extension, rejection::JsonRejection},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use lorecraft_auth::{AuthOutput, LoginInput, RegistrationInput, clear_session_cookie, session_cookie};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<RegistrationInput>, JsonRejection>,
) -> axum::response::Response {
    let Json(input) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_body(e),
    };

    match services.auth.register(input).await {
        Ok(out) => with_session(StatusCode::CREATED, out, services.secure_cookies),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginInput>, JsonRejection>,
) -> axum::response::Response {
    let Json(input) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_body(e),
    };

    match services.auth.login(input).await {
        Ok(out) => with_session(StatusCode::OK, out, services.secure_cookies),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Clears the session cookie. The token itself stays valid until expiry.
pub async fn logout(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie(services.secure_cookies))],
    )
        .into_response()
}

fn with_session(status: StatusCode, out: AuthOutput, secure: bool) -> axum::response::Response {
    let cookie = session_cookie(&out.token, out.expires_at, secure);
    (status, [(header::SET_COOKIE, cookie)], Json(out)).into_response()
}
