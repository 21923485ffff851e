use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};

use lorecraft_auth::{AUTH_COOKIE_NAME, AuthFailure, AuthenticationGate, cookie_value};

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone, Debug)]
pub struct AuthState {
    pub gate: AuthenticationGate,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let claims = {
        let headers = req.headers();
        let authorization = authorization_header(headers)?;
        let cookie = session_cookie(headers);
        state
            .gate
            .authenticate(authorization, cookie)
            .map_err(unauthorized)?
    };

    req.extensions_mut()
        .insert(PrincipalContext::new(claims.user_id, claims.username));

    Ok(next.run(req).await)
}

fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, Response> {
    match headers.get(header::AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| unauthorized(AuthFailure::MalformedToken)),
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookies| cookie_value(cookies, AUTH_COOKIE_NAME))
}

/// Every authentication failure looks the same from outside; the kind only
/// goes to the log.
pub fn unauthorized(failure: AuthFailure) -> Response {
    tracing::debug!(kind = failure.kind(), "request rejected: unauthenticated");
    errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
}
