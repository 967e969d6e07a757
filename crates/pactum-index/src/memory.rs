use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use pactum_core::{
    CollaboratorRole, ContractError, ContractIndex, ContractMetadata, ContractStatus, Invitation,
    InvitationStatus, InvitationStore, Profile, Result, UserDirectory,
};

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedContract {
    pub title: String,
    pub creator_id: String,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryContractIndex {
    contracts: RwLock<HashMap<Uuid, IndexedContract>>,
    permissions: RwLock<HashMap<(Uuid, String), CollaboratorRole>>,
}

impl MemoryContractIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contract(&self, contract_id: Uuid) -> Option<IndexedContract> {
        self.contracts.read().await.get(&contract_id).cloned()
    }

    pub async fn role(&self, contract_id: Uuid, user_id: &str) -> Option<CollaboratorRole> {
        self.permissions
            .read()
            .await
            .get(&(contract_id, user_id.to_string()))
            .copied()
    }
}

#[async_trait]
impl ContractIndex for MemoryContractIndex {
    async fn contract_created(&self, metadata: &ContractMetadata) -> Result<()> {
        self.contracts.write().await.insert(
            metadata.id,
            IndexedContract {
                title: metadata.title.clone(),
                creator_id: metadata.creator_id.clone(),
                status: metadata.status,
                created_at: metadata.creation_date,
            },
        );
        Ok(())
    }

    async fn contract_updated(&self, metadata: &ContractMetadata) -> Result<()> {
        let mut contracts = self.contracts.write().await;
        if let Some(indexed) = contracts.get_mut(&metadata.id) {
            indexed.title = metadata.title.clone();
            indexed.status = metadata.status;
        }
        Ok(())
    }

    async fn contract_deleted(&self, contract_id: Uuid) -> Result<()> {
        self.contracts.write().await.remove(&contract_id);
        self.permissions
            .write()
            .await
            .retain(|(indexed_id, _), _| *indexed_id != contract_id);
        Ok(())
    }

    async fn permission_granted(
        &self,
        contract_id: Uuid,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<()> {
        self.permissions
            .write()
            .await
            .insert((contract_id, user_id.to_string()), role);
        Ok(())
    }

    async fn permission_updated(
        &self,
        contract_id: Uuid,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<()> {
        self.permission_granted(contract_id, user_id, role).await
    }

    async fn permission_revoked(&self, contract_id: Uuid, user_id: &str) -> Result<()> {
        self.permissions
            .write()
            .await
            .remove(&(contract_id, user_id.to_string()));
        Ok(())
    }

    async fn contract_ids_for_creator(&self, creator_id: &str) -> Result<Vec<Uuid>> {
        let contracts = self.contracts.read().await;
        let mut matches: Vec<(Uuid, DateTime<Utc>)> = contracts
            .iter()
            .filter(|(_, indexed)| indexed.creator_id == creator_id)
            .map(|(contract_id, indexed)| (*contract_id, indexed.created_at))
            .collect();
        matches.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(matches.into_iter().map(|(contract_id, _)| contract_id).collect())
    }

    async fn contract_ids_for_collaborator(&self, user_id: &str) -> Result<Vec<Uuid>> {
        let permissions = self.permissions.read().await;
        let contracts = self.contracts.read().await;
        let mut matches: Vec<(Uuid, DateTime<Utc>)> = permissions
            .keys()
            .filter(|(_, permitted_user)| permitted_user == user_id)
            .filter_map(|(contract_id, _)| {
                contracts
                    .get(contract_id)
                    .map(|indexed| (*contract_id, indexed.created_at))
            })
            .collect();
        matches.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(matches.into_iter().map(|(contract_id, _)| contract_id).collect())
    }
}

#[derive(Default)]
pub struct MemoryInvitationStore {
    invitations: RwLock<HashMap<Uuid, Invitation>>,
}

impl MemoryInvitationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvitationStore for MemoryInvitationStore {
    async fn put(&self, invitation: &Invitation) -> Result<()> {
        self.invitations
            .write()
            .await
            .insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn get(&self, invitation_id: Uuid) -> Result<Option<Invitation>> {
        Ok(self.invitations.read().await.get(&invitation_id).cloned())
    }

    async fn list_for_contract(&self, contract_id: Uuid) -> Result<Vec<Invitation>> {
        let invitations = self.invitations.read().await;
        let mut matches: Vec<Invitation> = invitations
            .values()
            .filter(|invitation| invitation.contract_id == contract_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn mark_accepted(&self, invitation_id: Uuid) -> Result<()> {
        let mut invitations = self.invitations.write().await;
        let invitation = invitations.get_mut(&invitation_id).ok_or_else(|| {
            ContractError::NotFound(format!("invitation '{invitation_id}'"))
        })?;
        invitation.status = InvitationStatus::Accepted;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<Vec<Profile>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<Profile>) -> Self {
        MemoryUserDirectory {
            users: RwLock::new(users),
        }
    }

    pub async fn add(&self, profile: Profile) {
        self.users.write().await.push(profile);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn lookup_by_id(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|profile| profile.user_id == user_id).cloned())
    }

    async fn lookup_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|profile| profile.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}
