use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use lorecraft_auth::{
    AuthService, AuthzError, MemberRole, PasswordHashing, ServiceError, StoreError, TokenMaker,
    UserRecord, UserStore,
};
use lorecraft_core::{CampaignId, DomainError, UserId};

use crate::authz;

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub auth: AuthService,
    pub users: Arc<InMemoryUserStore>,
    pub campaigns: CampaignDirectory,
    pub tokens: Arc<dyn TokenMaker>,
    pub secure_cookies: bool,
}

pub fn build_services(
    tokens: Arc<dyn TokenMaker>,
    hasher: Arc<dyn PasswordHashing>,
    token_ttl: Duration,
    secure_cookies: bool,
) -> Result<AppServices, ServiceError> {
    let users = Arc::new(InMemoryUserStore::new());
    let auth = AuthService::new(users.clone(), hasher, tokens.clone(), token_ttl)?;

    Ok(AppServices {
        auth,
        users,
        campaigns: CampaignDirectory::new(),
        tokens,
        secure_cookies,
    })
}

// -------------------------
// Users
// -------------------------

/// In-memory [`UserStore`] (dev/test).
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: UserId) -> Result<bool, StoreError> {
        let users = self.inner.read().map_err(|_| poisoned())?;
        Ok(users.contains_key(&id))
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.inner.read().map_err(|_| poisoned())?;
        Ok(users.values().find(|r| r.identity.username == username).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let users = self.inner.read().map_err(|_| poisoned())?;
        Ok(users
            .values()
            .find(|r| r.identity.username == username || r.identity.email == email)
            .cloned())
    }

    async fn insert(&self, record: UserRecord) -> Result<(), StoreError> {
        let mut users = self.inner.write().map_err(|_| poisoned())?;

        // Re-checked under the write lock: two concurrent registrations can
        // both pass the service's lookup.
        let taken = users.values().any(|r| {
            r.identity.username == record.identity.username || r.identity.email == record.identity.email
        });
        if taken || users.contains_key(&record.identity.id) {
            return Err(StoreError::Duplicate);
        }

        users.insert(record.identity.id, record);
        Ok(())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut users = self.inner.write().map_err(|_| poisoned())?;
        let record = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.identity.last_login_at = Some(at);
        record.identity.updated_at = at;
        Ok(())
    }
}

// -------------------------
// Campaigns
// -------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CampaignError {
    #[error("campaign not found")]
    NotFound,

    #[error(transparent)]
    Access(#[from] AuthzError),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("user is already a member of this campaign")]
    AlreadyMember,

    #[error("user is not a member of this campaign")]
    MemberNotFound,

    #[error("user not found")]
    UnknownUser,

    #[error("campaign must keep at least one gm")]
    LastGm,

    #[error("campaign directory unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CampaignError {
    fn from(err: StoreError) -> Self {
        CampaignError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub description: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CampaignEntry {
    campaign: Campaign,
    members: Vec<Membership>,
}

impl CampaignEntry {
    fn role_of(&self, user_id: UserId) -> Option<MemberRole> {
        self.members.iter().find(|m| m.user_id == user_id).map(|m| m.role)
    }

    fn gm_count(&self) -> usize {
        self.members.iter().filter(|m| m.role == MemberRole::Gm).count()
    }
}

/// In-memory campaigns and their memberships (dev/test).
///
/// Every operation takes the acting user and checks their role on the
/// campaign under the same lock that guards the change.
#[derive(Debug, Default)]
pub struct CampaignDirectory {
    inner: RwLock<HashMap<CampaignId, CampaignEntry>>,
}

fn directory_poisoned() -> CampaignError {
    CampaignError::Unavailable("lock poisoned".to_string())
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    let mut problems = Vec::new();
    if name.trim().is_empty() {
        problems.push("name is required".to_string());
    }
    DomainError::check(problems)
}

impl CampaignDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a campaign; the creator becomes its first gm.
    pub fn create(
        &self,
        creator: UserId,
        name: &str,
        description: Option<String>,
    ) -> Result<Campaign, CampaignError> {
        validate_name(name)?;

        let now = Utc::now();
        let campaign = Campaign {
            id: CampaignId::new(),
            name: name.trim().to_string(),
            description: description.unwrap_or_default(),
            created_by: creator,
            created_at: now,
            updated_at: now,
        };
        let entry = CampaignEntry {
            campaign: campaign.clone(),
            members: vec![Membership {
                user_id: creator,
                role: MemberRole::Gm,
                joined_at: now,
            }],
        };

        let mut campaigns = self.inner.write().map_err(|_| directory_poisoned())?;
        campaigns.insert(campaign.id, entry);
        Ok(campaign)
    }

    /// The caller's role on a campaign (`None` if not a member).
    pub fn role_of(&self, id: CampaignId, user_id: UserId) -> Result<Option<MemberRole>, CampaignError> {
        let campaigns = self.inner.read().map_err(|_| directory_poisoned())?;
        let entry = campaigns.get(&id).ok_or(CampaignError::NotFound)?;
        Ok(entry.role_of(user_id))
    }

    /// The campaign and the caller's role on it, read under one lock.
    pub fn get(&self, actor: UserId, id: CampaignId) -> Result<(Campaign, MemberRole), CampaignError> {
        let campaigns = self.inner.read().map_err(|_| directory_poisoned())?;
        let entry = campaigns.get(&id).ok_or(CampaignError::NotFound)?;
        let role = entry.role_of(actor);
        authz::require_role(id, actor, role, MemberRole::Player)?;
        let role = role.ok_or(CampaignError::Access(AuthzError::NotMember))?;
        Ok((entry.campaign.clone(), role))
    }

    /// Campaigns the user belongs to, with their role in each.
    pub fn list_for(&self, user_id: UserId) -> Result<Vec<(Campaign, MemberRole)>, CampaignError> {
        let campaigns = self.inner.read().map_err(|_| directory_poisoned())?;
        let mut items: Vec<_> = campaigns
            .values()
            .filter_map(|e| e.role_of(user_id).map(|role| (e.campaign.clone(), role)))
            .collect();
        items.sort_by_key(|(c, _)| c.created_at);
        Ok(items)
    }

    pub fn update(
        &self,
        actor: UserId,
        id: CampaignId,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Campaign, CampaignError> {
        let mut campaigns = self.inner.write().map_err(|_| directory_poisoned())?;
        let entry = campaigns.get_mut(&id).ok_or(CampaignError::NotFound)?;
        authz::require_role(id, actor, entry.role_of(actor), MemberRole::Gm)?;

        if let Some(name) = &name {
            validate_name(name)?;
            entry.campaign.name = name.trim().to_string();
        }
        if let Some(description) = description {
            entry.campaign.description = description;
        }
        entry.campaign.updated_at = Utc::now();
        Ok(entry.campaign.clone())
    }

    pub fn delete(&self, actor: UserId, id: CampaignId) -> Result<(), CampaignError> {
        let mut campaigns = self.inner.write().map_err(|_| directory_poisoned())?;
        let entry = campaigns.get(&id).ok_or(CampaignError::NotFound)?;
        authz::require_role(id, actor, entry.role_of(actor), MemberRole::Gm)?;

        campaigns.remove(&id);
        Ok(())
    }

    pub fn members(&self, actor: UserId, id: CampaignId) -> Result<Vec<Membership>, CampaignError> {
        let campaigns = self.inner.read().map_err(|_| directory_poisoned())?;
        let entry = campaigns.get(&id).ok_or(CampaignError::NotFound)?;
        authz::require_role(id, actor, entry.role_of(actor), MemberRole::Player)?;
        Ok(entry.members.clone())
    }

    /// Add a member. The caller checks the user exists.
    pub fn add_member(
        &self,
        actor: UserId,
        id: CampaignId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<Membership, CampaignError> {
        let mut campaigns = self.inner.write().map_err(|_| directory_poisoned())?;
        let entry = campaigns.get_mut(&id).ok_or(CampaignError::NotFound)?;
        authz::require_role(id, actor, entry.role_of(actor), MemberRole::Gm)?;

        if entry.role_of(user_id).is_some() {
            return Err(CampaignError::AlreadyMember);
        }

        let membership = Membership {
            user_id,
            role,
            joined_at: Utc::now(),
        };
        entry.members.push(membership.clone());
        Ok(membership)
    }

    pub fn remove_member(&self, actor: UserId, id: CampaignId, user_id: UserId) -> Result<(), CampaignError> {
        let mut campaigns = self.inner.write().map_err(|_| directory_poisoned())?;
        let entry = campaigns.get_mut(&id).ok_or(CampaignError::NotFound)?;
        authz::require_role(id, actor, entry.role_of(actor), MemberRole::Gm)?;

        Self::drop_member(entry, user_id)
    }

    /// Any member may leave, except the last gm.
    pub fn leave(&self, actor: UserId, id: CampaignId) -> Result<(), CampaignError> {
        let mut campaigns = self.inner.write().map_err(|_| directory_poisoned())?;
        let entry = campaigns.get_mut(&id).ok_or(CampaignError::NotFound)?;
        authz::require_role(id, actor, entry.role_of(actor), MemberRole::Player)?;

        Self::drop_member(entry, actor)
    }

    fn drop_member(entry: &mut CampaignEntry, user_id: UserId) -> Result<(), CampaignError> {
        let role = entry.role_of(user_id).ok_or(CampaignError::MemberNotFound)?;
        if role == MemberRole::Gm && entry.gm_count() == 1 {
            return Err(CampaignError::LastGm);
        }
        entry.members.retain(|m| m.user_id != user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorecraft_auth::Identity;

    fn directory_with_campaign() -> (CampaignDirectory, Campaign, UserId) {
        let directory = CampaignDirectory::new();
        let gm = UserId::new();
        let campaign = directory.create(gm, "Curse of Strahd", None).unwrap();
        (directory, campaign, gm)
    }

    #[test]
    fn creator_becomes_gm() {
        let (directory, campaign, gm) = directory_with_campaign();

        assert_eq!(directory.role_of(campaign.id, gm).unwrap(), Some(MemberRole::Gm));
        assert_eq!(directory.members(gm, campaign.id).unwrap().len(), 1);
    }

    #[test]
    fn blank_name_is_rejected() {
        let directory = CampaignDirectory::new();
        let err = directory.create(UserId::new(), "   ", None).unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));
    }

    #[test]
    fn players_read_but_only_gms_write() {
        let (directory, campaign, gm) = directory_with_campaign();
        let player = UserId::new();
        directory.add_member(gm, campaign.id, player, MemberRole::Player).unwrap();

        let (seen, role) = directory.get(player, campaign.id).unwrap();
        assert_eq!(seen.id, campaign.id);
        assert_eq!(role, MemberRole::Player);
        assert!(directory.members(player, campaign.id).is_ok());

        let err = directory
            .update(player, campaign.id, Some("Renamed".to_string()), None)
            .unwrap_err();
        assert_eq!(
            err,
            CampaignError::Access(AuthzError::Forbidden {
                required: MemberRole::Gm,
                actual: MemberRole::Player,
            })
        );
        assert!(matches!(
            directory.add_member(player, campaign.id, UserId::new(), MemberRole::Player),
            Err(CampaignError::Access(AuthzError::Forbidden { .. }))
        ));
        assert!(matches!(
            directory.delete(player, campaign.id),
            Err(CampaignError::Access(AuthzError::Forbidden { .. }))
        ));

        let updated = directory
            .update(gm, campaign.id, Some("Renamed".to_string()), Some("Gothic".to_string()))
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.description, "Gothic");
    }

    #[test]
    fn outsiders_are_not_members() {
        let (directory, campaign, _) = directory_with_campaign();
        let outsider = UserId::new();

        assert_eq!(
            directory.get(outsider, campaign.id).unwrap_err(),
            CampaignError::Access(AuthzError::NotMember)
        );
        assert_eq!(
            directory.leave(outsider, campaign.id).unwrap_err(),
            CampaignError::Access(AuthzError::NotMember)
        );
    }

    #[test]
    fn unknown_campaign_is_not_found() {
        let directory = CampaignDirectory::new();
        assert_eq!(
            directory.get(UserId::new(), CampaignId::new()).unwrap_err(),
            CampaignError::NotFound
        );
    }

    #[test]
    fn membership_changes() {
        let (directory, campaign, gm) = directory_with_campaign();
        let player = UserId::new();

        directory.add_member(gm, campaign.id, player, MemberRole::Player).unwrap();
        assert_eq!(
            directory.add_member(gm, campaign.id, player, MemberRole::Gm).unwrap_err(),
            CampaignError::AlreadyMember
        );

        directory.leave(player, campaign.id).unwrap();
        assert_eq!(directory.role_of(campaign.id, player).unwrap(), None);

        assert_eq!(
            directory.remove_member(gm, campaign.id, player).unwrap_err(),
            CampaignError::MemberNotFound
        );
    }

    #[test]
    fn last_gm_cannot_leave_or_be_removed() {
        let (directory, campaign, gm) = directory_with_campaign();

        assert_eq!(directory.leave(gm, campaign.id).unwrap_err(), CampaignError::LastGm);
        assert_eq!(
            directory.remove_member(gm, campaign.id, gm).unwrap_err(),
            CampaignError::LastGm
        );

        let co_gm = UserId::new();
        directory.add_member(gm, campaign.id, co_gm, MemberRole::Gm).unwrap();
        directory.leave(gm, campaign.id).unwrap();
        assert_eq!(directory.role_of(campaign.id, co_gm).unwrap(), Some(MemberRole::Gm));
    }

    #[test]
    fn gm_deletes_campaign() {
        let (directory, campaign, gm) = directory_with_campaign();
        directory.delete(gm, campaign.id).unwrap();
        assert_eq!(directory.role_of(campaign.id, gm).unwrap_err(), CampaignError::NotFound);
        assert!(directory.list_for(gm).unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_store_rejects_duplicates_under_the_lock() {
        let store = InMemoryUserStore::new();
        let alice = Identity::new("alice", "alice@example.com", Utc::now());
        store
            .insert(UserRecord {
                identity: alice.clone(),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap();

        let clash = Identity::new("alice", "other@example.com", Utc::now());
        let err = store
            .insert(UserRecord {
                identity: clash,
                password_hash: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Duplicate);
        assert!(store.contains(alice.id).unwrap());
    }

    #[tokio::test]
    async fn record_login_updates_timestamps() {
        let store = InMemoryUserStore::new();
        let alice = Identity::new("alice", "alice@example.com", Utc::now());
        store
            .insert(UserRecord {
                identity: alice.clone(),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap();

        let at = Utc::now();
        store.record_login(alice.id, at).await.unwrap();
        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.identity.last_login_at, Some(at));

        assert_eq!(
            store.record_login(UserId::new(), at).await.unwrap_err(),
            StoreError::NotFound
        );
    }
}
