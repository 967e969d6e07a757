use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tracing::info;
use uuid::Uuid;

use pactum_assist::{HttpAssist, UnconfiguredAssist};
use pactum_core::{
    ClauseAssist, Collaborator, Comment, Contract, ContractError, ContractFilter,
    ContractMetadata, Invitation,
};
use pactum_docstore::FileContractStore;
use pactum_engine::{ContractService, TextRenderer};
use pactum_index::{PgContractIndex, PgInvitationStore, PgUserDirectory, ensure_schema};
use pactum_platform::{
    AcceptInvitationRequest, ActorQuery, AddClauseRequest, AddClauseResponse,
    AddCollaboratorRequest, AddCommentRequest, AddCommentResponse, ApproveContractRequest,
    AskClauseRequest, AskClauseResponse, CreateContractRequest, CreateContractResponse,
    ExplainClauseRequest, ExplainClauseResponse, InviteCollaboratorRequest, ListContractsQuery,
    MessageResponse, MoveClauseRequest, ServiceConfig, UpdateClauseRequest, UpdateContractRequest,
    UpdateRoleRequest, connect_database,
};

#[derive(Clone)]
struct AppState {
    service: Arc<ContractService>,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pactum_gateway=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8081")?;
    let pool = connect_database(&config.database_url).await?;
    ensure_schema(&pool).await?;

    let store = Arc::new(FileContractStore::open(&config.store_dir)?);
    let index = Arc::new(PgContractIndex::new(pool.clone()));
    let invitations = Arc::new(PgInvitationStore::new(pool.clone()));
    let directory = Arc::new(PgUserDirectory::new(pool));
    let assist: Arc<dyn ClauseAssist> = match &config.assist_url {
        Some(assist_url) => Arc::new(HttpAssist::new(
            assist_url,
            &config.assist_model,
            config.assist_api_key.clone(),
        )),
        None => Arc::new(UnconfiguredAssist),
    };
    let service = Arc::new(ContractService::new(
        store,
        index,
        invitations,
        directory,
        Arc::new(TextRenderer),
        assist,
    ));

    let state = AppState { service };
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/contracts", post(create_contract).get(list_contracts))
        .route(
            "/contracts/{contract_id}",
            get(get_contract)
                .patch(update_contract)
                .delete(delete_contract),
        )
        .route("/contracts/{contract_id}/clauses", post(add_clause))
        .route(
            "/contracts/{contract_id}/clauses/{clause_id}",
            put(update_clause).delete(delete_clause),
        )
        .route(
            "/contracts/{contract_id}/clauses/{clause_id}/move",
            post(move_clause),
        )
        .route(
            "/contracts/{contract_id}/clauses/{clause_id}/comments",
            post(add_comment).get(get_comments),
        )
        .route(
            "/contracts/{contract_id}/clauses/{clause_id}/comments/{comment_id}",
            delete(delete_comment),
        )
        .route(
            "/contracts/{contract_id}/clauses/{clause_id}/explain",
            post(explain_clause),
        )
        .route(
            "/contracts/{contract_id}/clauses/{clause_id}/ask",
            post(ask_about_clause),
        )
        .route(
            "/contracts/{contract_id}/collaborators",
            post(add_collaborator),
        )
        .route(
            "/contracts/{contract_id}/collaborators/{collaborator_id}",
            put(update_role).delete(remove_collaborator),
        )
        .route("/contracts/{contract_id}/approve", post(approve_contract))
        .route("/contracts/{contract_id}/export", get(export_contract))
        .route(
            "/contracts/{contract_id}/invitations",
            post(invite_collaborator).get(list_invitations),
        )
        .route(
            "/invitations/{invitation_id}/accept",
            post(accept_invitation),
        )
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("contract gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn create_contract(
    State(state): State<AppState>,
    Json(payload): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<CreateContractResponse>), (StatusCode, String)> {
    let contract = state
        .service
        .create_contract(&payload.user_id, &payload.title, &payload.description)
        .await
        .map_err(error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(CreateContractResponse {
            contract_id: contract.id(),
        }),
    ))
}

async fn list_contracts(
    State(state): State<AppState>,
    Query(query): Query<ListContractsQuery>,
) -> Result<Json<Vec<ContractMetadata>>, (StatusCode, String)> {
    let filter = ContractFilter {
        creator_id: query.creator_id,
        collaborator_id: query.collaborator_id,
    };
    let contracts = state
        .service
        .list_contracts(&filter)
        .await
        .map_err(error_response)?;
    Ok(Json(contracts))
}

async fn get_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    let contract = state
        .service
        .get_contract(&query.user_id, contract_id)
        .await
        .map_err(error_response)?;
    Ok(Json(contract))
}

async fn update_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Json(payload): Json<UpdateContractRequest>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    let contract = state
        .service
        .update_metadata(
            &payload.user_id,
            contract_id,
            payload.title.as_deref(),
            payload.description.as_deref(),
        )
        .await
        .map_err(error_response)?;
    Ok(Json(contract))
}

async fn delete_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    state
        .service
        .delete_contract(&query.user_id, contract_id)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse {
        message: "Contract deleted".to_string(),
    }))
}

async fn add_clause(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Json(payload): Json<AddClauseRequest>,
) -> Result<(StatusCode, Json<AddClauseResponse>), (StatusCode, String)> {
    let clause_id = state
        .service
        .add_clause(
            &payload.user_id,
            contract_id,
            &payload.short_title,
            &payload.full_text,
        )
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(AddClauseResponse { clause_id })))
}

async fn update_clause(
    State(state): State<AppState>,
    Path((contract_id, clause_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateClauseRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    state
        .service
        .update_clause(
            &payload.user_id,
            contract_id,
            clause_id,
            &payload.full_text,
            payload.short_title.as_deref(),
        )
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse {
        message: "Clause updated".to_string(),
    }))
}

async fn delete_clause(
    State(state): State<AppState>,
    Path((contract_id, clause_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    state
        .service
        .delete_clause(&query.user_id, contract_id, clause_id)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse {
        message: "Clause deleted".to_string(),
    }))
}

async fn move_clause(
    State(state): State<AppState>,
    Path((contract_id, clause_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MoveClauseRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    state
        .service
        .move_clause(&payload.user_id, contract_id, clause_id, payload.new_index)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse {
        message: "Clause moved".to_string(),
    }))
}

async fn add_comment(
    State(state): State<AppState>,
    Path((contract_id, clause_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<AddCommentResponse>), (StatusCode, String)> {
    let comment_id = state
        .service
        .add_comment(&payload.user_id, contract_id, clause_id, &payload.text)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(AddCommentResponse { comment_id })))
}

async fn get_comments(
    State(state): State<AppState>,
    Path((contract_id, clause_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<Vec<Comment>>, (StatusCode, String)> {
    let comments = state
        .service
        .get_comments(&query.user_id, contract_id, clause_id)
        .await
        .map_err(error_response)?;
    Ok(Json(comments))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path((contract_id, clause_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    state
        .service
        .delete_comment(&query.user_id, contract_id, clause_id, comment_id)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse {
        message: "Comment deleted".to_string(),
    }))
}

async fn explain_clause(
    State(state): State<AppState>,
    Path((contract_id, clause_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ExplainClauseRequest>,
) -> Result<Json<ExplainClauseResponse>, (StatusCode, String)> {
    let explanation = state
        .service
        .explain_clause(&payload.user_id, contract_id, clause_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ExplainClauseResponse { explanation }))
}

async fn ask_about_clause(
    State(state): State<AppState>,
    Path((contract_id, clause_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AskClauseRequest>,
) -> Result<Json<AskClauseResponse>, (StatusCode, String)> {
    let answer = state
        .service
        .ask_about_clause(
            &payload.user_id,
            contract_id,
            clause_id,
            &payload.session_id,
            &payload.question,
        )
        .await
        .map_err(error_response)?;
    Ok(Json(AskClauseResponse { answer }))
}

async fn add_collaborator(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Json(payload): Json<AddCollaboratorRequest>,
) -> Result<(StatusCode, Json<Collaborator>), (StatusCode, String)> {
    let collaborator = state
        .service
        .add_collaborator(
            &payload.user_id,
            contract_id,
            &payload.collaborator_id,
            &payload.role,
        )
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(collaborator)))
}

async fn update_role(
    State(state): State<AppState>,
    Path((contract_id, collaborator_id)): Path<(Uuid, String)>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    state
        .service
        .update_role(&payload.user_id, contract_id, &collaborator_id, &payload.role)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse {
        message: "Role updated".to_string(),
    }))
}

async fn remove_collaborator(
    State(state): State<AppState>,
    Path((contract_id, collaborator_id)): Path<(Uuid, String)>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    state
        .service
        .remove_collaborator(&query.user_id, contract_id, &collaborator_id)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse {
        message: "Collaborator removed".to_string(),
    }))
}

async fn approve_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Json(payload): Json<ApproveContractRequest>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    let contract = state
        .service
        .approve_contract(&payload.user_id, contract_id)
        .await
        .map_err(error_response)?;
    Ok(Json(contract))
}

async fn export_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bytes = state
        .service
        .export_contract(&query.user_id, contract_id)
        .await
        .map_err(error_response)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        bytes,
    ))
}

async fn invite_collaborator(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Json(payload): Json<InviteCollaboratorRequest>,
) -> Result<(StatusCode, Json<Invitation>), (StatusCode, String)> {
    let invitation = state
        .service
        .invite_collaborator(&payload.user_id, contract_id, &payload.email, &payload.role)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

async fn list_invitations(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<Vec<Invitation>>, (StatusCode, String)> {
    let invitations = state
        .service
        .list_invitations(&query.user_id, contract_id)
        .await
        .map_err(error_response)?;
    Ok(Json(invitations))
}

async fn accept_invitation(
    State(state): State<AppState>,
    Path(invitation_id): Path<Uuid>,
    Json(payload): Json<AcceptInvitationRequest>,
) -> Result<Json<Collaborator>, (StatusCode, String)> {
    let collaborator = state
        .service
        .accept_invitation(&payload.user_id, invitation_id)
        .await
        .map_err(error_response)?;
    Ok(Json(collaborator))
}

fn error_response(err: ContractError) -> (StatusCode, String) {
    let status = match &err {
        ContractError::NotFound(_) => StatusCode::NOT_FOUND,
        ContractError::Forbidden(_) => StatusCode::FORBIDDEN,
        ContractError::Conflict(_) => StatusCode::CONFLICT,
        ContractError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ContractError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ContractError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string())
}
