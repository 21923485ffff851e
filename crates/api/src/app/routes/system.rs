use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    axum::extract::Extension(principal): axum::extract::Extension<PrincipalContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id().to_string(),
        "username": principal.username(),
    }))
}
