//! API-side authorization guard for campaign actions.
//!
//! The role check itself is `lorecraft_auth::authorize`; this is the
//! boundary where a denial is logged and turned into a campaign error.

use lorecraft_auth::{MemberRole, authorize};
use lorecraft_core::{CampaignId, UserId};

use crate::app::services::CampaignError;

/// Require `required` (or a role that subsumes it) on a campaign.
///
/// Intended to be called before the action touches any campaign state.
pub fn require_role(
    campaign_id: CampaignId,
    actor: UserId,
    membership: Option<MemberRole>,
    required: MemberRole,
) -> Result<(), CampaignError> {
    authorize(membership, required).map_err(|e| {
        tracing::debug!(%campaign_id, user_id = %actor, %required, error = %e, "campaign access denied");
        CampaignError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorecraft_auth::AuthzError;

    #[test]
    fn gm_may_do_player_things() {
        let ok = require_role(CampaignId::new(), UserId::new(), Some(MemberRole::Gm), MemberRole::Player);
        assert!(ok.is_ok());
    }

    #[test]
    fn denials_become_access_errors() {
        let err = require_role(CampaignId::new(), UserId::new(), None, MemberRole::Player).unwrap_err();
        assert_eq!(err, CampaignError::Access(AuthzError::NotMember));

        let err = require_role(CampaignId::new(), UserId::new(), Some(MemberRole::Player), MemberRole::Gm)
            .unwrap_err();
        assert!(matches!(err, CampaignError::Access(AuthzError::Forbidden { .. })));
    }
}
