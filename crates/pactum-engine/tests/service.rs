use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use pactum_core::{
    AssistTurn, ClauseAssist, CollaboratorRole, ContractError, ContractFilter, ContractIndex,
    ContractStatus, ContractStore, InvitationStatus, InvitationStore, Profile,
};
use pactum_docstore::MemoryContractStore;
use pactum_engine::{ContractService, TextRenderer};
use pactum_index::{MemoryContractIndex, MemoryInvitationStore, MemoryUserDirectory};

struct ScriptedAssist;

#[async_trait]
impl ClauseAssist for ScriptedAssist {
    async fn explain(&self, clause_text: &str) -> anyhow::Result<String> {
        Ok(format!("explained: {clause_text}"))
    }

    async fn answer_question(
        &self,
        _clause_text: &str,
        history: &[AssistTurn],
        question: &str,
    ) -> anyhow::Result<String> {
        Ok(format!("answer[{}] to {question}", history.len()))
    }
}

struct Harness {
    service: ContractService,
    store: Arc<MemoryContractStore>,
    index: Arc<MemoryContractIndex>,
    invitations: Arc<MemoryInvitationStore>,
}

fn profile(user_id: &str, name: &str) -> Profile {
    Profile {
        user_id: user_id.to_string(),
        name: name.to_string(),
        email: format!("{user_id}@example.com"),
    }
}

fn harness() -> Harness {
    let store = Arc::new(MemoryContractStore::new());
    let index = Arc::new(MemoryContractIndex::new());
    let invitations = Arc::new(MemoryInvitationStore::new());
    let directory = Arc::new(MemoryUserDirectory::with_users(vec![
        profile("creator", "Ada"),
        profile("editor", "Bob"),
        profile("viewer", "Cay"),
        profile("approver", "Dee"),
        profile("stranger", "Eve"),
    ]));
    let service = ContractService::new(
        store.clone(),
        index.clone(),
        invitations.clone(),
        directory,
        Arc::new(TextRenderer),
        Arc::new(ScriptedAssist),
    );
    Harness {
        service,
        store,
        index,
        invitations,
    }
}

async fn seeded_contract(harness: &Harness) -> Uuid {
    let contract = harness
        .service
        .create_contract("creator", "NDA", "mutual non-disclosure")
        .await
        .unwrap();
    let contract_id = contract.id();
    for (user_id, role) in [
        ("editor", "Editor"),
        ("viewer", "Viewer"),
        ("approver", "Approver"),
    ] {
        harness
            .service
            .add_collaborator("creator", contract_id, user_id, role)
            .await
            .unwrap();
    }
    contract_id
}

#[tokio::test]
async fn create_contract_populates_store_and_index() {
    let harness = harness();
    let contract = harness
        .service
        .create_contract("creator", "  NDA  ", "mutual")
        .await
        .unwrap();

    assert_eq!(contract.metadata.title, "NDA");
    assert_eq!(contract.metadata.creator_name, "Ada");
    assert_eq!(contract.metadata.status, ContractStatus::Draft);
    assert!(contract.clauses.is_empty());

    let stored = harness.store.load(contract.id()).await.unwrap();
    assert_eq!(stored, contract);

    let indexed = harness.index.contract(contract.id()).await.unwrap();
    assert_eq!(indexed.title, "NDA");
    assert_eq!(indexed.creator_id, "creator");
    assert_eq!(indexed.status, ContractStatus::Draft);
}

#[tokio::test]
async fn unknown_users_cannot_create_contracts() {
    let harness = harness();
    let err = harness
        .service
        .create_contract("ghost", "NDA", "")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));
}

#[tokio::test]
async fn clause_updates_accumulate_versions_newest_first() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    let clause_id = harness
        .service
        .add_clause("editor", contract_id, "Confidentiality", "Do not share.")
        .await
        .unwrap();
    harness
        .service
        .update_clause(
            "creator",
            contract_id,
            clause_id,
            "Do not share without consent.",
            None,
        )
        .await
        .unwrap();

    let contract = harness.service.get_contract("viewer", contract_id).await.unwrap();
    let clause = contract.clause(clause_id).unwrap();
    assert_eq!(clause.versions.len(), 2);
    assert_eq!(clause.versions[0].full_text, "Do not share without consent.");
    assert_eq!(clause.versions[1].full_text, "Do not share.");
    assert_eq!(clause.versions[0].publisher_name, "Ada");
    assert_eq!(clause.versions[1].publisher_name, "Bob");
}

#[tokio::test]
async fn viewers_cannot_edit_clauses() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    let err = harness
        .service
        .add_clause("viewer", contract_id, "Term", "One year.")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));

    let contract = harness.service.get_contract("creator", contract_id).await.unwrap();
    assert!(contract.clauses.is_empty());
}

#[tokio::test]
async fn strangers_cannot_read_contracts() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    let err = harness
        .service
        .get_contract("stranger", contract_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));
}

#[tokio::test]
async fn missing_contracts_are_not_found_before_authorization() {
    let harness = harness();
    let err = harness
        .service
        .get_contract("creator", Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));
}

#[tokio::test]
async fn move_clause_clamps_out_of_range_indices() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    let first = harness
        .service
        .add_clause("editor", contract_id, "A", "a")
        .await
        .unwrap();
    let second = harness
        .service
        .add_clause("editor", contract_id, "B", "b")
        .await
        .unwrap();

    harness
        .service
        .move_clause("editor", contract_id, first, 42)
        .await
        .unwrap();
    harness
        .service
        .move_clause("editor", contract_id, first, 42)
        .await
        .unwrap();

    let contract = harness.service.get_contract("creator", contract_id).await.unwrap();
    let order: Vec<Uuid> = contract.clauses.iter().map(|clause| clause.id).collect();
    assert_eq!(order, vec![second, first]);
}

#[tokio::test]
async fn only_the_creator_manages_collaborators() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    for actor in ["editor", "viewer", "approver"] {
        let err = harness
            .service
            .add_collaborator(actor, contract_id, "stranger", "Viewer")
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Forbidden(_)), "{actor}");

        let err = harness
            .service
            .remove_collaborator(actor, contract_id, "viewer")
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Forbidden(_)), "{actor}");

        let err = harness
            .service
            .update_role(actor, contract_id, "viewer", "Editor")
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Forbidden(_)), "{actor}");

        let err = harness
            .service
            .delete_contract(actor, contract_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Forbidden(_)), "{actor}");
    }

    let contract = harness.service.get_contract("creator", contract_id).await.unwrap();
    assert_eq!(contract.metadata.collaborators.len(), 3);
    assert_eq!(
        contract.metadata.collaborator("viewer").unwrap().role,
        CollaboratorRole::Viewer
    );
}

#[tokio::test]
async fn duplicate_collaborators_are_rejected() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    let err = harness
        .service
        .add_collaborator("creator", contract_id, "editor", "Viewer")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Conflict(_)));

    // The index still reflects the original grant.
    assert_eq!(
        harness.index.role(contract_id, "editor").await,
        Some(CollaboratorRole::Editor)
    );
}

#[tokio::test]
async fn collaborator_validation_failures() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    let err = harness
        .service
        .add_collaborator("creator", contract_id, "stranger", "Owner")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::InvalidArgument(_)));

    let err = harness
        .service
        .add_collaborator("creator", contract_id, "ghost", "Viewer")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));
}

#[tokio::test]
async fn collaborator_lifecycle_keeps_the_index_consistent() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    harness
        .service
        .update_role("creator", contract_id, "viewer", "Approver")
        .await
        .unwrap();
    assert_eq!(
        harness.index.role(contract_id, "viewer").await,
        Some(CollaboratorRole::Approver)
    );

    harness
        .service
        .remove_collaborator("creator", contract_id, "viewer")
        .await
        .unwrap();
    assert_eq!(harness.index.role(contract_id, "viewer").await, None);

    let err = harness
        .service
        .remove_collaborator("creator", contract_id, "viewer")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));

    let ids = harness
        .index
        .contract_ids_for_collaborator("editor")
        .await
        .unwrap();
    assert_eq!(ids, vec![contract_id]);
}

#[tokio::test]
async fn any_collaborator_may_comment() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;
    let clause_id = harness
        .service
        .add_clause("editor", contract_id, "Term", "One year.")
        .await
        .unwrap();

    for actor in ["creator", "editor", "viewer", "approver"] {
        harness
            .service
            .add_comment(actor, contract_id, clause_id, "noted")
            .await
            .unwrap();
    }

    let err = harness
        .service
        .add_comment("stranger", contract_id, clause_id, "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));

    let comments = harness
        .service
        .get_comments("viewer", contract_id, clause_id)
        .await
        .unwrap();
    assert_eq!(comments.len(), 4);
    assert_eq!(comments[0].author_name, "Ada");
}

#[tokio::test]
async fn comment_deletion_is_author_or_creator_only() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;
    let clause_id = harness
        .service
        .add_clause("editor", contract_id, "Term", "One year.")
        .await
        .unwrap();

    let viewer_comment = harness
        .service
        .add_comment("viewer", contract_id, clause_id, "first")
        .await
        .unwrap();
    let editor_comment = harness
        .service
        .add_comment("editor", contract_id, clause_id, "second")
        .await
        .unwrap();

    let err = harness
        .service
        .delete_comment("viewer", contract_id, clause_id, editor_comment)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));

    harness
        .service
        .delete_comment("viewer", contract_id, clause_id, viewer_comment)
        .await
        .unwrap();
    harness
        .service
        .delete_comment("creator", contract_id, clause_id, editor_comment)
        .await
        .unwrap();

    let comments = harness
        .service
        .get_comments("creator", contract_id, clause_id)
        .await
        .unwrap();
    assert!(comments.is_empty());

    let err = harness
        .service
        .delete_comment("creator", contract_id, clause_id, editor_comment)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));
}

#[tokio::test]
async fn approvers_and_the_creator_may_approve() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    for actor in ["editor", "viewer"] {
        let err = harness
            .service
            .approve_contract(actor, contract_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Forbidden(_)), "{actor}");
    }

    let approved = harness
        .service
        .approve_contract("approver", contract_id)
        .await
        .unwrap();
    assert_eq!(approved.metadata.status, ContractStatus::Approved);
    assert_eq!(
        harness.index.contract(contract_id).await.unwrap().status,
        ContractStatus::Approved
    );

    // Approving again is a successful no-op.
    let again = harness
        .service
        .approve_contract("approver", contract_id)
        .await
        .unwrap();
    assert_eq!(again.metadata.status, ContractStatus::Approved);
    assert_eq!(again.revision, approved.revision);

    // The creator bypass extends to approval.
    let other = harness
        .service
        .create_contract("creator", "SOW", "")
        .await
        .unwrap();
    let approved = harness
        .service
        .approve_contract("creator", other.id())
        .await
        .unwrap();
    assert_eq!(approved.metadata.status, ContractStatus::Approved);
}

#[tokio::test]
async fn deleting_a_contract_cleans_up_everything() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    harness
        .service
        .delete_contract("creator", contract_id)
        .await
        .unwrap();

    let err = harness.store.load(contract_id).await.unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));
    assert!(harness.index.contract(contract_id).await.is_none());
    assert_eq!(harness.index.role(contract_id, "editor").await, None);

    let err = harness
        .service
        .delete_contract("creator", contract_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));
}

#[tokio::test]
async fn metadata_updates_flow_into_the_index() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    harness
        .service
        .update_metadata("editor", contract_id, Some("NDA (signed)"), Some("final"))
        .await
        .unwrap();

    let contract = harness.service.get_contract("creator", contract_id).await.unwrap();
    assert_eq!(contract.metadata.title, "NDA (signed)");
    assert_eq!(contract.metadata.description, "final");
    assert_eq!(
        harness.index.contract(contract_id).await.unwrap().title,
        "NDA (signed)"
    );

    let err = harness
        .service
        .update_metadata("viewer", contract_id, Some("x"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));

    let err = harness
        .service
        .update_metadata("creator", contract_id, Some("   "), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::InvalidArgument(_)));
}

#[tokio::test]
async fn listing_respects_filters() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    let all = harness
        .service
        .list_contracts(&ContractFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    let by_creator = harness
        .service
        .list_contracts(&ContractFilter {
            creator_id: Some("creator".to_string()),
            collaborator_id: None,
        })
        .await
        .unwrap();
    assert_eq!(by_creator[0].id, contract_id);

    let by_collaborator = harness
        .service
        .list_contracts(&ContractFilter {
            creator_id: None,
            collaborator_id: Some("viewer".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(by_collaborator.len(), 1);

    let none = harness
        .service
        .list_contracts(&ContractFilter {
            creator_id: Some("stranger".to_string()),
            collaborator_id: None,
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn export_renders_the_latest_clause_texts() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;
    let clause_id = harness
        .service
        .add_clause("editor", contract_id, "Confidentiality", "Do not share.")
        .await
        .unwrap();
    harness
        .service
        .update_clause(
            "editor",
            contract_id,
            clause_id,
            "Do not share without consent.",
            None,
        )
        .await
        .unwrap();

    let bytes = harness
        .service
        .export_contract("viewer", contract_id)
        .await
        .unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("NDA"));
    assert!(text.contains("1. Confidentiality"));
    assert!(text.contains("Do not share without consent."));

    let err = harness
        .service
        .export_contract("stranger", contract_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));
}

#[tokio::test]
async fn invitations_round_trip_into_collaborators() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    let err = harness
        .service
        .invite_collaborator("editor", contract_id, "stranger@example.com", "Editor")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));

    let invitation = harness
        .service
        .invite_collaborator("creator", contract_id, "stranger@example.com", "Editor")
        .await
        .unwrap();
    assert_eq!(invitation.status, InvitationStatus::Pending);

    // One pending invitation per address.
    let err = harness
        .service
        .invite_collaborator("creator", contract_id, "Stranger@Example.com", "Viewer")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Conflict(_)));

    // Only the invited address may accept.
    let err = harness
        .service
        .accept_invitation("viewer", invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));

    let collaborator = harness
        .service
        .accept_invitation("stranger", invitation.id)
        .await
        .unwrap();
    assert_eq!(collaborator.role, CollaboratorRole::Editor);
    assert_eq!(
        harness.index.role(contract_id, "stranger").await,
        Some(CollaboratorRole::Editor)
    );

    let stored = harness
        .invitations
        .get(invitation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InvitationStatus::Accepted);

    let err = harness
        .service
        .accept_invitation("stranger", invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Conflict(_)));

    // Inviting an existing collaborator's address is a conflict.
    let err = harness
        .service
        .invite_collaborator("creator", contract_id, "editor@example.com", "Viewer")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Conflict(_)));

    let err = harness
        .service
        .invite_collaborator("creator", contract_id, "not-an-email", "Viewer")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::InvalidArgument(_)));
}

#[tokio::test]
async fn clause_assist_threads_history_per_session() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;
    let clause_id = harness
        .service
        .add_clause("editor", contract_id, "Term", "One year.")
        .await
        .unwrap();

    let explained = harness
        .service
        .explain_clause("viewer", contract_id, clause_id)
        .await
        .unwrap();
    assert_eq!(explained, "explained: One year.");

    let first = harness
        .service
        .ask_about_clause("viewer", contract_id, clause_id, "s-1", "why one year?")
        .await
        .unwrap();
    assert_eq!(first, "answer[0] to why one year?");

    let second = harness
        .service
        .ask_about_clause("viewer", contract_id, clause_id, "s-1", "can it renew?")
        .await
        .unwrap();
    assert_eq!(second, "answer[2] to can it renew?");

    let other_session = harness
        .service
        .ask_about_clause("viewer", contract_id, clause_id, "s-2", "what?")
        .await
        .unwrap();
    assert_eq!(other_session, "answer[0] to what?");

    let err = harness
        .service
        .ask_about_clause("stranger", contract_id, clause_id, "s-3", "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Forbidden(_)));
}

#[tokio::test]
async fn deleting_a_clause_removes_only_that_clause() {
    let harness = harness();
    let contract_id = seeded_contract(&harness).await;

    let first = harness
        .service
        .add_clause("editor", contract_id, "A", "a")
        .await
        .unwrap();
    let second = harness
        .service
        .add_clause("editor", contract_id, "B", "b")
        .await
        .unwrap();
    harness
        .service
        .add_comment("viewer", contract_id, first, "keep")
        .await
        .unwrap();

    harness
        .service
        .delete_clause("editor", contract_id, second)
        .await
        .unwrap();

    let contract = harness.service.get_contract("creator", contract_id).await.unwrap();
    assert_eq!(contract.clauses.len(), 1);
    assert_eq!(contract.clauses[0].id, first);
    assert_eq!(contract.clauses[0].comments.len(), 1);

    let err = harness
        .service
        .delete_clause("editor", contract_id, second)
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));
}
