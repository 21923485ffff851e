use thiserror::Error;

use crate::roles::{MemberRole, has_permission};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not a member of this campaign")]
    NotMember,

    #[error("forbidden: requires role '{required}', caller is '{actual}'")]
    Forbidden {
        required: MemberRole,
        actual: MemberRole,
    },
}

/// Authorize an action on a membership-gated resource.
///
/// `membership` is the caller's role on the resource, `None` if the caller is
/// not a member at all.
///
/// - No IO
/// - No panics
pub fn authorize(membership: Option<MemberRole>, required: MemberRole) -> Result<(), AuthzError> {
    let actual = membership.ok_or(AuthzError::NotMember)?;

    if has_permission(actual, required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { required, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_member_is_rejected_before_role_check() {
        assert_eq!(authorize(None, MemberRole::Player), Err(AuthzError::NotMember));
    }

    #[test]
    fn player_cannot_perform_gm_actions() {
        let err = authorize(Some(MemberRole::Player), MemberRole::Gm).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                required: MemberRole::Gm,
                actual: MemberRole::Player
            }
        );
        assert!(err.to_string().contains("'gm'"));
    }

    #[test]
    fn gm_and_player_reads() {
        assert!(authorize(Some(MemberRole::Gm), MemberRole::Gm).is_ok());
        assert!(authorize(Some(MemberRole::Player), MemberRole::Player).is_ok());
    }
}
