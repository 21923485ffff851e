use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use lorecraft_auth::{AuthzError, ServiceError};
use lorecraft_core::DomainError;

use crate::app::services::CampaignError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(e) => domain_error_to_response(e),
        ServiceError::UserAlreadyExists => {
            json_error(StatusCode::CONFLICT, "user_already_exists", "user already exists")
        }
        ServiceError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid credentials")
        }
        // Details stay in the log; the client only learns something failed.
        other => {
            tracing::error!(error = %other, "auth request failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn campaign_error_to_response(err: CampaignError) -> axum::response::Response {
    match err {
        CampaignError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "campaign not found"),
        // Non-members cannot tell a campaign they are outside of from one that doesn't exist.
        CampaignError::Access(AuthzError::NotMember) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "campaign not found")
        }
        CampaignError::Access(e @ AuthzError::Forbidden { .. }) => {
            json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
        }
        CampaignError::Validation(e) => domain_error_to_response(e),
        CampaignError::AlreadyMember => json_error(StatusCode::CONFLICT, "already_member", err.to_string()),
        CampaignError::LastGm => json_error(StatusCode::CONFLICT, "last_gm", err.to_string()),
        CampaignError::MemberNotFound | CampaignError::UnknownUser => {
            json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        CampaignError::Unavailable(msg) => {
            tracing::error!(error = %msg, "campaign directory unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", "service unavailable")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
    }
}

/// Body that failed to extract as JSON (syntax, content type, or shape).
pub fn bad_body(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
