use std::sync::Arc;

use axum::{
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use crate::app::services::{AppServices, CampaignError};
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_campaign).get(list_campaigns))
        .route("/:id", get(get_campaign).patch(update_campaign).delete(delete_campaign))
        .route("/:id/members", get(list_members).post(add_member))
        .route("/:id/members/:user_id", delete(remove_member))
        .route("/:id/leave", post(leave_campaign))
}

pub async fn create_campaign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateCampaignRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_body(e),
    };
    match services
        .campaigns
        .create(principal.user_id(), &body.name, body.description)
    {
        Ok(campaign) => {
            tracing::info!(campaign_id = %campaign.id, user_id = %principal.user_id(), "campaign created");
            let body = dto::campaign_to_json(campaign, Some(lorecraft_auth::MemberRole::Gm));
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => errors::campaign_error_to_response(e),
    }
}

pub async fn list_campaigns(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.campaigns.list_for(principal.user_id()) {
        Ok(items) => {
            let items = items
                .into_iter()
                .map(|(campaign, role)| dto::campaign_to_json(campaign, Some(role)))
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::campaign_error_to_response(e),
    }
}

pub async fn get_campaign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_campaign_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.campaigns.get(principal.user_id(), id) {
        Ok((campaign, role)) => {
            (StatusCode::OK, Json(dto::campaign_to_json(campaign, Some(role)))).into_response()
        }
        Err(e) => errors::campaign_error_to_response(e),
    }
}

pub async fn update_campaign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateCampaignRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_body(e),
    };
    let id = match dto::parse_campaign_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .campaigns
        .update(principal.user_id(), id, body.name, body.description)
    {
        Ok(campaign) => {
            let body = dto::campaign_to_json(campaign, Some(lorecraft_auth::MemberRole::Gm));
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::campaign_error_to_response(e),
    }
}

pub async fn delete_campaign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_campaign_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.campaigns.delete(principal.user_id(), id) {
        Ok(()) => {
            tracing::info!(campaign_id = %id, user_id = %principal.user_id(), "campaign deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::campaign_error_to_response(e),
    }
}

pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_campaign_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.campaigns.members(principal.user_id(), id) {
        Ok(members) => {
            let items = members.into_iter().map(dto::membership_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::campaign_error_to_response(e),
    }
}

pub async fn add_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::AddMemberRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_body(e),
    };
    let id = match dto::parse_campaign_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    // Authorize before revealing whether the user exists.
    let result = services
        .campaigns
        .role_of(id, principal.user_id())
        .and_then(|role| crate::authz::require_role(id, principal.user_id(), role, lorecraft_auth::MemberRole::Gm))
        .and_then(|()| match services.users.contains(body.user_id) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CampaignError::UnknownUser),
            Err(e) => Err(e.into()),
        })
        .and_then(|()| {
            services
                .campaigns
                .add_member(principal.user_id(), id, body.user_id, body.role)
        });

    match result {
        Ok(membership) => (StatusCode::CREATED, Json(dto::membership_to_json(membership))).into_response(),
        Err(e) => errors::campaign_error_to_response(e),
    }
}

pub async fn remove_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, user_id)): Path<(String, String)>,
) -> axum::response::Response {
    let id = match dto::parse_campaign_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let user_id = match dto::parse_user_id(&user_id) {
        Ok(user_id) => user_id,
        Err(resp) => return resp,
    };

    match services.campaigns.remove_member(principal.user_id(), id, user_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::campaign_error_to_response(e),
    }
}

pub async fn leave_campaign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_campaign_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.campaigns.leave(principal.user_id(), id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::campaign_error_to_response(e),
    }
}
