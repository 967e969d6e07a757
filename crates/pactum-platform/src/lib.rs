pub mod config;
pub mod contracts;
pub mod db;

pub use config::ServiceConfig;
pub use contracts::{
    AcceptInvitationRequest, ActorQuery, AddClauseRequest, AddClauseResponse,
    AddCollaboratorRequest, AddCommentRequest, AddCommentResponse, ApproveContractRequest,
    AskClauseRequest, AskClauseResponse, CreateContractRequest, CreateContractResponse,
    ExplainClauseRequest, ExplainClauseResponse, InviteCollaboratorRequest, ListContractsQuery,
    MessageResponse, MoveClauseRequest, UpdateClauseRequest, UpdateContractRequest,
    UpdateRoleRequest,
};
pub use db::connect_database;
