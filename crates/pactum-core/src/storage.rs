use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    CollaboratorRole, Contract, ContractMetadata, Invitation, Profile,
};

#[derive(Debug, Clone, Default)]
pub struct ContractFilter {
    pub creator_id: Option<String>,
    pub collaborator_id: Option<String>,
}

impl ContractFilter {
    pub fn matches(&self, metadata: &ContractMetadata) -> bool {
        if let Some(creator_id) = &self.creator_id {
            if metadata.creator_id != *creator_id {
                return false;
            }
        }
        if let Some(collaborator_id) = &self.collaborator_id {
            if !metadata.is_collaborator(collaborator_id) {
                return false;
            }
        }
        true
    }
}

// Durable per-contract persistence. Documents are written whole; `save` is
// revision-checked and writers are serialized per store instance.
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn create(&self, contract: &Contract) -> Result<()>;
    async fn load(&self, contract_id: Uuid) -> Result<Contract>;
    async fn save(&self, contract: &Contract) -> Result<u64>;
    async fn delete(&self, contract_id: Uuid) -> Result<bool>;
    async fn list(&self, filter: &ContractFilter) -> Result<Vec<ContractMetadata>>;
}

// Denormalized relational projection of contract metadata and permissions,
// kept consistent by the mutation operations.
#[async_trait]
pub trait ContractIndex: Send + Sync {
    async fn contract_created(&self, metadata: &ContractMetadata) -> Result<()>;
    async fn contract_updated(&self, metadata: &ContractMetadata) -> Result<()>;
    async fn contract_deleted(&self, contract_id: Uuid) -> Result<()>;
    async fn permission_granted(
        &self,
        contract_id: Uuid,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<()>;
    async fn permission_updated(
        &self,
        contract_id: Uuid,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<()>;
    async fn permission_revoked(&self, contract_id: Uuid, user_id: &str) -> Result<()>;
    async fn contract_ids_for_creator(&self, creator_id: &str) -> Result<Vec<Uuid>>;
    async fn contract_ids_for_collaborator(&self, user_id: &str) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    async fn put(&self, invitation: &Invitation) -> Result<()>;
    async fn get(&self, invitation_id: Uuid) -> Result<Option<Invitation>>;
    async fn list_for_contract(&self, contract_id: Uuid) -> Result<Vec<Invitation>>;
    async fn mark_accepted(&self, invitation_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_by_id(&self, user_id: &str) -> anyhow::Result<Option<Profile>>;
    async fn lookup_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>>;
}

pub trait DocumentRenderer: Send + Sync {
    fn render(&self, contract: &Contract) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistTurn {
    pub role: String,
    pub content: String,
}

impl AssistTurn {
    pub fn user(content: impl Into<String>) -> Self {
        AssistTurn {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        AssistTurn {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ClauseAssist: Send + Sync {
    async fn explain(&self, clause_text: &str) -> anyhow::Result<String>;
    async fn answer_question(
        &self,
        clause_text: &str,
        history: &[AssistTurn],
        question: &str,
    ) -> anyhow::Result<String>;
}
