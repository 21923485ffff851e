use lorecraft_core::UserId;

/// Authenticated principal for a single request.
///
/// Inserted into the request extensions by the auth middleware; it lives and
/// dies with that request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    username: String,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}
