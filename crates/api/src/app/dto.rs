use serde::Deserialize;

use lorecraft_auth::MemberRole;
use lorecraft_core::{CampaignId, UserId};

use crate::app::errors;
use crate::app::services::{Campaign, Membership};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: UserId,
    #[serde(default = "default_member_role")]
    pub role: MemberRole,
}

fn default_member_role() -> MemberRole {
    MemberRole::Player
}

// -------------------------
// Path parsing
// -------------------------

pub fn parse_campaign_id(raw: &str) -> Result<CampaignId, axum::response::Response> {
    raw.parse::<CampaignId>().map_err(errors::domain_error_to_response)
}

pub fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>().map_err(errors::domain_error_to_response)
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn campaign_to_json(campaign: Campaign, role: Option<MemberRole>) -> serde_json::Value {
    let mut value = serde_json::json!({
        "id": campaign.id.to_string(),
        "name": campaign.name,
        "description": campaign.description,
        "created_by": campaign.created_by.to_string(),
        "created_at": campaign.created_at,
        "updated_at": campaign.updated_at,
    });
    if let Some(role) = role {
        value["role"] = serde_json::json!(role.as_str());
    }
    value
}

pub fn membership_to_json(m: Membership) -> serde_json::Value {
    serde_json::json!({
        "user_id": m.user_id.to_string(),
        "role": m.role.as_str(),
        "joined_at": m.joined_at,
    })
}
