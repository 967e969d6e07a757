use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use pactum_core::{
    Capability, ClauseAssist, Collaborator, CollaboratorRole, Comment, Contract, ContractError,
    ContractFilter, ContractIndex, ContractMetadata, ContractStore, DocumentRenderer, Invitation,
    InvitationStatus, InvitationStore, Profile, Result, UserDirectory, authorize,
};

use crate::conversation::ConversationStore;

// Every mutation follows the same shape: load, authorize, mutate the
// in-memory document, revision-checked save, then index side effects.
pub struct ContractService {
    store: Arc<dyn ContractStore>,
    index: Arc<dyn ContractIndex>,
    invitations: Arc<dyn InvitationStore>,
    directory: Arc<dyn UserDirectory>,
    renderer: Arc<dyn DocumentRenderer>,
    assist: Arc<dyn ClauseAssist>,
    conversations: ConversationStore,
}

impl ContractService {
    pub fn new(
        store: Arc<dyn ContractStore>,
        index: Arc<dyn ContractIndex>,
        invitations: Arc<dyn InvitationStore>,
        directory: Arc<dyn UserDirectory>,
        renderer: Arc<dyn DocumentRenderer>,
        assist: Arc<dyn ClauseAssist>,
    ) -> Self {
        ContractService {
            store,
            index,
            invitations,
            directory,
            renderer,
            assist,
            conversations: ConversationStore::default(),
        }
    }

    async fn profile(&self, user_id: &str) -> Result<Profile> {
        let profile = self
            .directory
            .lookup_by_id(user_id)
            .await
            .map_err(|err| ContractError::Storage(err.to_string()))?;
        profile.ok_or_else(|| ContractError::Forbidden(format!("unknown user '{user_id}'")))
    }

    async fn authorized(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        capability: Capability,
    ) -> Result<Contract> {
        let contract = self.store.load(contract_id).await?;
        authorize(&contract.metadata, actor_id, capability)?;
        Ok(contract)
    }

    pub async fn create_contract(
        &self,
        actor_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Contract> {
        let creator = self.profile(actor_id).await?;
        let title = title.trim();
        if title.is_empty() {
            return Err(ContractError::InvalidArgument("title is required".to_string()));
        }

        let contract = Contract::new(&creator.user_id, &creator.name, title, description.trim());
        self.store.create(&contract).await?;
        self.index.contract_created(&contract.metadata).await?;
        info!("contract {} created by {}", contract.id(), creator.user_id);
        Ok(contract)
    }

    pub async fn get_contract(&self, actor_id: &str, contract_id: Uuid) -> Result<Contract> {
        self.authorized(actor_id, contract_id, Capability::View).await
    }

    pub async fn delete_contract(&self, actor_id: &str, contract_id: Uuid) -> Result<()> {
        self.authorized(actor_id, contract_id, Capability::DeleteContract)
            .await?;
        if !self.store.delete(contract_id).await? {
            return Err(ContractError::NotFound(format!("contract '{contract_id}'")));
        }
        self.index.contract_deleted(contract_id).await?;
        self.conversations.forget_contract(contract_id).await;
        info!("contract {contract_id} deleted by {actor_id}");
        Ok(())
    }

    pub async fn list_contracts(&self, filter: &ContractFilter) -> Result<Vec<ContractMetadata>> {
        self.store.list(filter).await
    }

    pub async fn update_metadata(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Contract> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::EditMetadata)
            .await?;

        if let Some(title) = title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ContractError::InvalidArgument("title is required".to_string()));
            }
            contract.metadata.title = title.to_string();
        }
        if let Some(description) = description {
            contract.metadata.description = description.trim().to_string();
        }

        contract.revision = self.store.save(&contract).await?;
        self.index.contract_updated(&contract.metadata).await?;
        Ok(contract)
    }

    pub async fn add_clause(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        short_title: &str,
        full_text: &str,
    ) -> Result<Uuid> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::EditClauses)
            .await?;
        let short_title = short_title.trim();
        if short_title.is_empty() {
            return Err(ContractError::InvalidArgument(
                "short_title is required".to_string(),
            ));
        }

        let publisher = self.profile(actor_id).await?;
        let clause_id = contract.add_clause(short_title, full_text, &publisher);
        self.store.save(&contract).await?;
        info!("clause {clause_id} added to contract {contract_id} by {actor_id}");
        Ok(clause_id)
    }

    pub async fn update_clause(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        clause_id: Uuid,
        full_text: &str,
        short_title: Option<&str>,
    ) -> Result<()> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::EditClauses)
            .await?;
        let publisher = self.profile(actor_id).await?;
        contract.revise_clause(clause_id, full_text, short_title, &publisher)?;
        self.store.save(&contract).await?;
        Ok(())
    }

    pub async fn delete_clause(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        clause_id: Uuid,
    ) -> Result<()> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::EditClauses)
            .await?;
        contract.remove_clause(clause_id)?;
        self.store.save(&contract).await?;
        self.conversations.forget_clause(contract_id, clause_id).await;
        info!("clause {clause_id} deleted from contract {contract_id} by {actor_id}");
        Ok(())
    }

    pub async fn move_clause(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        clause_id: Uuid,
        new_index: usize,
    ) -> Result<()> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::EditClauses)
            .await?;
        contract.move_clause(clause_id, new_index)?;
        self.store.save(&contract).await?;
        Ok(())
    }

    pub async fn add_collaborator(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        user_id: &str,
        role: &str,
    ) -> Result<Collaborator> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::ManageCollaborators)
            .await?;
        let role = CollaboratorRole::parse(role)?;
        let profile = self
            .directory
            .lookup_by_id(user_id)
            .await
            .map_err(|err| ContractError::Storage(err.to_string()))?
            .ok_or_else(|| ContractError::NotFound(format!("user '{user_id}'")))?;

        let collaborator = Collaborator {
            user_id: profile.user_id,
            name: profile.name,
            email: profile.email,
            role,
            added_date: Utc::now(),
        };
        contract.metadata.add_collaborator(collaborator.clone())?;
        self.store.save(&contract).await?;
        self.index
            .permission_granted(contract_id, &collaborator.user_id, role)
            .await?;
        info!(
            "user {} added to contract {contract_id} as {} by {actor_id}",
            collaborator.user_id,
            role.as_str()
        );
        Ok(collaborator)
    }

    pub async fn remove_collaborator(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        user_id: &str,
    ) -> Result<()> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::ManageCollaborators)
            .await?;
        contract.metadata.remove_collaborator(user_id)?;
        self.store.save(&contract).await?;
        self.index.permission_revoked(contract_id, user_id).await?;
        info!("user {user_id} removed from contract {contract_id} by {actor_id}");
        Ok(())
    }

    pub async fn update_role(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        user_id: &str,
        role: &str,
    ) -> Result<()> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::ManageCollaborators)
            .await?;
        let role = CollaboratorRole::parse(role)?;
        contract.metadata.set_collaborator_role(user_id, role)?;
        self.store.save(&contract).await?;
        self.index.permission_updated(contract_id, user_id, role).await?;
        Ok(())
    }

    pub async fn add_comment(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        clause_id: Uuid,
        text: &str,
    ) -> Result<Uuid> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::Comment)
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ContractError::InvalidArgument("text is required".to_string()));
        }
        let author = self.profile(actor_id).await?;
        let comment_id = contract.add_comment(clause_id, &author, text)?;
        self.store.save(&contract).await?;
        Ok(comment_id)
    }

    pub async fn get_comments(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        clause_id: Uuid,
    ) -> Result<Vec<Comment>> {
        let contract = self.authorized(actor_id, contract_id, Capability::View).await?;
        Ok(contract.clause(clause_id)?.comments.clone())
    }

    pub async fn delete_comment(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        clause_id: Uuid,
        comment_id: Uuid,
    ) -> Result<()> {
        let mut contract = self.store.load(contract_id).await?;

        // Only the comment's author or the contract creator may delete it.
        let comment = contract.comment(clause_id, comment_id)?;
        if comment.author_user_id != actor_id && contract.metadata.creator_id != actor_id {
            return Err(ContractError::Forbidden(format!(
                "user '{actor_id}' may not delete comment '{comment_id}'"
            )));
        }

        contract.remove_comment(clause_id, comment_id)?;
        self.store.save(&contract).await?;
        Ok(())
    }

    pub async fn approve_contract(&self, actor_id: &str, contract_id: Uuid) -> Result<Contract> {
        let mut contract = self
            .authorized(actor_id, contract_id, Capability::Approve)
            .await?;

        // Approving an already-approved contract is a no-op.
        if contract.approve() {
            contract.revision = self.store.save(&contract).await?;
            self.index.contract_updated(&contract.metadata).await?;
            info!("contract {contract_id} approved by {actor_id}");
        }
        Ok(contract)
    }

    pub async fn export_contract(&self, actor_id: &str, contract_id: Uuid) -> Result<Vec<u8>> {
        let contract = self.authorized(actor_id, contract_id, Capability::View).await?;
        self.renderer.render(&contract)
    }

    pub async fn invite_collaborator(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        email: &str,
        role: &str,
    ) -> Result<Invitation> {
        let contract = self
            .authorized(actor_id, contract_id, Capability::ManageCollaborators)
            .await?;
        let role = CollaboratorRole::parse(role)?;
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ContractError::InvalidArgument(format!(
                "'{email}' is not a valid email address"
            )));
        }

        let already_member = contract
            .metadata
            .collaborators
            .iter()
            .any(|collaborator| collaborator.email.eq_ignore_ascii_case(email));
        if already_member {
            return Err(ContractError::Conflict(format!(
                "'{email}' already belongs to a collaborator on contract '{contract_id}'"
            )));
        }

        let pending = self.invitations.list_for_contract(contract_id).await?;
        if pending.iter().any(|invitation| {
            invitation.status == InvitationStatus::Pending
                && invitation.email.eq_ignore_ascii_case(email)
        }) {
            return Err(ContractError::Conflict(format!(
                "'{email}' already has a pending invitation to contract '{contract_id}'"
            )));
        }

        let invitation = Invitation::new(contract_id, email, role);
        self.invitations.put(&invitation).await?;
        info!("invitation {} issued for contract {contract_id}", invitation.id);
        Ok(invitation)
    }

    pub async fn list_invitations(
        &self,
        actor_id: &str,
        contract_id: Uuid,
    ) -> Result<Vec<Invitation>> {
        self.authorized(actor_id, contract_id, Capability::ManageCollaborators)
            .await?;
        self.invitations.list_for_contract(contract_id).await
    }

    pub async fn accept_invitation(
        &self,
        actor_id: &str,
        invitation_id: Uuid,
    ) -> Result<Collaborator> {
        let invitation = self
            .invitations
            .get(invitation_id)
            .await?
            .ok_or_else(|| ContractError::NotFound(format!("invitation '{invitation_id}'")))?;
        if invitation.status != InvitationStatus::Pending {
            return Err(ContractError::Conflict(format!(
                "invitation '{invitation_id}' has already been accepted"
            )));
        }

        let profile = self.profile(actor_id).await?;
        if !profile.email.eq_ignore_ascii_case(&invitation.email) {
            return Err(ContractError::Forbidden(format!(
                "invitation '{invitation_id}' was issued to a different email address"
            )));
        }

        let mut contract = self.store.load(invitation.contract_id).await?;
        let collaborator = Collaborator {
            user_id: profile.user_id,
            name: profile.name,
            email: profile.email,
            role: invitation.role,
            added_date: Utc::now(),
        };
        contract.metadata.add_collaborator(collaborator.clone())?;
        self.store.save(&contract).await?;
        self.index
            .permission_granted(invitation.contract_id, &collaborator.user_id, invitation.role)
            .await?;
        self.invitations.mark_accepted(invitation_id).await?;
        info!(
            "user {} joined contract {} via invitation {invitation_id}",
            collaborator.user_id, invitation.contract_id
        );
        Ok(collaborator)
    }

    pub async fn explain_clause(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        clause_id: Uuid,
    ) -> Result<String> {
        let contract = self.authorized(actor_id, contract_id, Capability::View).await?;
        let clause = contract.clause(clause_id)?;
        self.assist
            .explain(clause.latest_text())
            .await
            .map_err(|err| ContractError::Upstream(err.to_string()))
    }

    pub async fn ask_about_clause(
        &self,
        actor_id: &str,
        contract_id: Uuid,
        clause_id: Uuid,
        session_id: &str,
        question: &str,
    ) -> Result<String> {
        let contract = self.authorized(actor_id, contract_id, Capability::View).await?;
        let clause = contract.clause(clause_id)?;
        let question = question.trim();
        if question.is_empty() {
            return Err(ContractError::InvalidArgument(
                "question is required".to_string(),
            ));
        }

        let history = self
            .conversations
            .history(contract_id, clause_id, session_id)
            .await;
        let answer = self
            .assist
            .answer_question(clause.latest_text(), &history, question)
            .await
            .map_err(|err| ContractError::Upstream(err.to_string()))?;
        self.conversations
            .record(contract_id, clause_id, session_id, question, &answer)
            .await;
        Ok(answer)
    }
}
