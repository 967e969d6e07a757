use crate::error::{ContractError, Result};
use crate::models::{CollaboratorRole, ContractMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    EditClauses,
    EditMetadata,
    Comment,
    Approve,
    ManageCollaborators,
    DeleteContract,
}

impl Capability {
    fn action(self) -> &'static str {
        match self {
            Capability::View => "view",
            Capability::EditClauses => "edit clauses of",
            Capability::EditMetadata => "edit",
            Capability::Comment => "comment on",
            Capability::Approve => "approve",
            Capability::ManageCollaborators => "manage collaborators of",
            Capability::DeleteContract => "delete",
        }
    }
}

impl CollaboratorRole {
    pub fn grants(self, capability: Capability) -> bool {
        match self {
            CollaboratorRole::Editor => matches!(
                capability,
                Capability::View
                    | Capability::EditClauses
                    | Capability::EditMetadata
                    | Capability::Comment
            ),
            CollaboratorRole::Viewer => {
                matches!(capability, Capability::View | Capability::Comment)
            }
            CollaboratorRole::Approver => matches!(
                capability,
                Capability::View | Capability::Comment | Capability::Approve
            ),
        }
    }
}

// The creator is authorized for every capability; everyone else needs a
// collaborator entry whose role grants it.
pub fn authorize(
    metadata: &ContractMetadata,
    user_id: &str,
    capability: Capability,
) -> Result<()> {
    if metadata.creator_id == user_id {
        return Ok(());
    }
    match metadata.collaborator(user_id) {
        Some(collaborator) if collaborator.role.grants(capability) => Ok(()),
        Some(_) => Err(ContractError::Forbidden(format!(
            "user '{user_id}' may not {} contract '{}'",
            capability.action(),
            metadata.id
        ))),
        None => Err(ContractError::Forbidden(format!(
            "user '{user_id}' has no access to contract '{}'",
            metadata.id
        ))),
    }
}
