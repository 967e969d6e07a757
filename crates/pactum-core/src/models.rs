use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ContractError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Draft,
    Approved,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Draft => "Draft",
            ContractStatus::Approved => "Approved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaboratorRole {
    Editor,
    Viewer,
    Approver,
}

impl CollaboratorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            CollaboratorRole::Editor => "Editor",
            CollaboratorRole::Viewer => "Viewer",
            CollaboratorRole::Approver => "Approver",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "editor" => Ok(CollaboratorRole::Editor),
            "viewer" => Ok(CollaboratorRole::Viewer),
            "approver" => Ok(CollaboratorRole::Approver),
            other => Err(ContractError::InvalidArgument(format!(
                "unknown role '{other}', expected Editor, Viewer or Approver"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: CollaboratorRole,
    pub added_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseVersion {
    pub date: DateTime<Utc>,
    pub full_text: String,
    pub publisher_id: String,
    pub publisher_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author_user_id: String,
    pub author_email: String,
    pub author_name: String,
    pub text: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    pub id: Uuid,
    pub short_title: String,
    // Ordered newest-first; never empty.
    pub versions: Vec<ClauseVersion>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Clause {
    pub fn latest_text(&self) -> &str {
        &self.versions[0].full_text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    pub id: Uuid,
    pub creator_id: String,
    pub creator_name: String,
    pub title: String,
    pub description: String,
    pub status: ContractStatus,
    pub creation_date: DateTime<Utc>,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
}

impl ContractMetadata {
    pub fn collaborator(&self, user_id: &str) -> Option<&Collaborator> {
        self.collaborators
            .iter()
            .find(|collaborator| collaborator.user_id == user_id)
    }

    pub fn is_collaborator(&self, user_id: &str) -> bool {
        self.collaborator(user_id).is_some()
    }

    pub fn add_collaborator(&mut self, collaborator: Collaborator) -> Result<()> {
        if collaborator.user_id == self.creator_id {
            return Err(ContractError::InvalidArgument(
                "the creator cannot be added as a collaborator".to_string(),
            ));
        }
        if self.is_collaborator(&collaborator.user_id) {
            return Err(ContractError::Conflict(format!(
                "user '{}' is already a collaborator on contract '{}'",
                collaborator.user_id, self.id
            )));
        }
        self.collaborators.push(collaborator);
        Ok(())
    }

    pub fn remove_collaborator(&mut self, user_id: &str) -> Result<Collaborator> {
        let position = self
            .collaborators
            .iter()
            .position(|collaborator| collaborator.user_id == user_id)
            .ok_or_else(|| {
                ContractError::NotFound(format!(
                    "user '{user_id}' is not a collaborator on contract '{}'",
                    self.id
                ))
            })?;
        Ok(self.collaborators.remove(position))
    }

    pub fn set_collaborator_role(&mut self, user_id: &str, role: CollaboratorRole) -> Result<()> {
        let collaborator = self
            .collaborators
            .iter_mut()
            .find(|collaborator| collaborator.user_id == user_id)
            .ok_or_else(|| {
                ContractError::NotFound(format!(
                    "user '{user_id}' is not a collaborator on contract '{}'",
                    self.id
                ))
            })?;
        collaborator.role = role;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub metadata: ContractMetadata,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    #[serde(default)]
    pub revision: u64,
}

impl Contract {
    pub fn new(creator_id: &str, creator_name: &str, title: &str, description: &str) -> Self {
        Contract {
            metadata: ContractMetadata {
                id: Uuid::new_v4(),
                creator_id: creator_id.to_string(),
                creator_name: creator_name.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                status: ContractStatus::Draft,
                creation_date: Utc::now(),
                collaborators: Vec::new(),
            },
            clauses: Vec::new(),
            revision: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.metadata.id
    }

    pub fn clause(&self, clause_id: Uuid) -> Result<&Clause> {
        self.clauses
            .iter()
            .find(|clause| clause.id == clause_id)
            .ok_or_else(|| self.clause_not_found(clause_id))
    }

    fn clause_mut(&mut self, clause_id: Uuid) -> Result<&mut Clause> {
        let id = self.metadata.id;
        self.clauses
            .iter_mut()
            .find(|clause| clause.id == clause_id)
            .ok_or_else(|| {
                ContractError::NotFound(format!("clause '{clause_id}' in contract '{id}'"))
            })
    }

    fn clause_not_found(&self, clause_id: Uuid) -> ContractError {
        ContractError::NotFound(format!(
            "clause '{clause_id}' in contract '{}'",
            self.metadata.id
        ))
    }

    pub fn add_clause(&mut self, short_title: &str, full_text: &str, publisher: &Profile) -> Uuid {
        let clause_id = Uuid::new_v4();
        self.clauses.push(Clause {
            id: clause_id,
            short_title: short_title.to_string(),
            versions: vec![ClauseVersion {
                date: Utc::now(),
                full_text: full_text.to_string(),
                publisher_id: publisher.user_id.clone(),
                publisher_name: publisher.name.clone(),
            }],
            comments: Vec::new(),
        });
        clause_id
    }

    pub fn revise_clause(
        &mut self,
        clause_id: Uuid,
        full_text: &str,
        short_title: Option<&str>,
        publisher: &Profile,
    ) -> Result<()> {
        let clause = self.clause_mut(clause_id)?;
        clause.versions.insert(
            0,
            ClauseVersion {
                date: Utc::now(),
                full_text: full_text.to_string(),
                publisher_id: publisher.user_id.clone(),
                publisher_name: publisher.name.clone(),
            },
        );
        if let Some(short_title) = short_title {
            clause.short_title = short_title.to_string();
        }
        Ok(())
    }

    pub fn remove_clause(&mut self, clause_id: Uuid) -> Result<Clause> {
        let position = self
            .clauses
            .iter()
            .position(|clause| clause.id == clause_id)
            .ok_or_else(|| self.clause_not_found(clause_id))?;
        Ok(self.clauses.remove(position))
    }

    pub fn move_clause(&mut self, clause_id: Uuid, new_index: usize) -> Result<()> {
        let position = self
            .clauses
            .iter()
            .position(|clause| clause.id == clause_id)
            .ok_or_else(|| self.clause_not_found(clause_id))?;
        let clause = self.clauses.remove(position);
        // Out-of-range targets clamp to the end of the sequence.
        let target = new_index.min(self.clauses.len());
        self.clauses.insert(target, clause);
        Ok(())
    }

    pub fn add_comment(&mut self, clause_id: Uuid, author: &Profile, text: &str) -> Result<Uuid> {
        let comment_id = Uuid::new_v4();
        let clause = self.clause_mut(clause_id)?;
        clause.comments.push(Comment {
            id: comment_id,
            author_user_id: author.user_id.clone(),
            author_email: author.email.clone(),
            author_name: author.name.clone(),
            text: text.to_string(),
            date: Utc::now(),
        });
        Ok(comment_id)
    }

    pub fn comment(&self, clause_id: Uuid, comment_id: Uuid) -> Result<&Comment> {
        self.clause(clause_id)?
            .comments
            .iter()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| {
                ContractError::NotFound(format!(
                    "comment '{comment_id}' on clause '{clause_id}' in contract '{}'",
                    self.metadata.id
                ))
            })
    }

    pub fn remove_comment(&mut self, clause_id: Uuid, comment_id: Uuid) -> Result<Comment> {
        let id = self.metadata.id;
        let clause = self.clause_mut(clause_id)?;
        let position = clause
            .comments
            .iter()
            .position(|comment| comment.id == comment_id)
            .ok_or_else(|| {
                ContractError::NotFound(format!(
                    "comment '{comment_id}' on clause '{clause_id}' in contract '{id}'"
                ))
            })?;
        Ok(clause.comments.remove(position))
    }

    // Returns false when the contract was already approved.
    pub fn approve(&mut self) -> bool {
        if self.metadata.status == ContractStatus::Approved {
            return false;
        }
        self.metadata.status = ContractStatus::Approved;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "Pending",
            InvitationStatus::Accepted => "Accepted",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            other => Err(ContractError::InvalidArgument(format!(
                "unknown invitation status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub email: String,
    pub role: CollaboratorRole,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn new(contract_id: Uuid, email: &str, role: CollaboratorRole) -> Self {
        Invitation {
            id: Uuid::new_v4(),
            contract_id,
            email: email.to_string(),
            role,
            status: InvitationStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
