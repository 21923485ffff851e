use serde::{Deserialize, Serialize};

/// A principal's role within a campaign membership.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Game master: owns the campaign.
    Gm,
    Player,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Gm => "gm",
            MemberRole::Player => "player",
        }
    }
}

impl core::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Does a member holding `actual` satisfy an action that requires `required`?
///
/// The GM satisfies everything; a player only satisfies player-level
/// requirements.
pub fn has_permission(actual: MemberRole, required: MemberRole) -> bool {
    matches!(
        (actual, required),
        (MemberRole::Gm, _) | (MemberRole::Player, MemberRole::Player)
    )
}
