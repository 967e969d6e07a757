pub mod authz;
pub mod error;
pub mod models;
pub mod storage;

pub use authz::{Capability, authorize};
pub use error::{ContractError, Result};
pub use models::{
    Clause, ClauseVersion, Collaborator, CollaboratorRole, Comment, Contract, ContractMetadata,
    ContractStatus, Invitation, InvitationStatus, Profile,
};
pub use storage::{
    AssistTurn, ClauseAssist, ContractFilter, ContractIndex, ContractStore, DocumentRenderer,
    InvitationStore, UserDirectory,
};
