use chrono::Utc;
use pactum_core::{
    Collaborator, CollaboratorRole, Contract, ContractError, ContractFilter, ContractStore,
    Profile, Result,
};
use pactum_docstore::{FileContractStore, MemoryContractStore};
use tempfile::TempDir;
use uuid::Uuid;

fn author() -> Profile {
    Profile {
        user_id: "u-1".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    }
}

fn sample_contract(title: &str) -> Contract {
    let mut contract = Contract::new("u-1", "Ada", title, "a sample agreement");
    contract.add_clause("Confidentiality", "Do not share.", &author());
    contract
}

fn open_store() -> (TempDir, FileContractStore) {
    let dir = TempDir::new().unwrap();
    let store = FileContractStore::open(dir.path()).unwrap();
    (dir, store)
}

#[tokio::test]
async fn create_then_load_round_trips() {
    let (_dir, store) = open_store();
    let contract = sample_contract("NDA");
    store.create(&contract).await.unwrap();

    let loaded = store.load(contract.id()).await.unwrap();
    assert_eq!(loaded, contract);
}

#[tokio::test]
async fn create_refuses_to_overwrite() {
    let (_dir, store) = open_store();
    let contract = sample_contract("NDA");
    store.create(&contract).await.unwrap();

    let err = store.create(&contract).await.unwrap_err();
    assert!(matches!(err, ContractError::Conflict(_)));
}

#[tokio::test]
async fn load_missing_is_not_found() {
    let (_dir, store) = open_store();
    let err = store.load(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));
}

#[tokio::test]
async fn corrupt_document_reads_as_not_found() {
    let (_dir, store) = open_store();
    let contract = sample_contract("NDA");
    store.create(&contract).await.unwrap();

    let path = store.root().join(format!("{}.json", contract.id()));
    std::fs::write(&path, b"{ not json").unwrap();

    let err = store.load(contract.id()).await.unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));

    let listed = store.list(&ContractFilter::default()).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn save_requires_an_existing_document() {
    let (_dir, store) = open_store();
    let contract = sample_contract("NDA");
    let err = store.save(&contract).await.unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));
}

#[tokio::test]
async fn stale_revision_save_is_rejected() {
    let (_dir, store) = open_store();
    let contract = sample_contract("NDA");
    store.create(&contract).await.unwrap();

    let mut first = store.load(contract.id()).await.unwrap();
    let mut second = store.load(contract.id()).await.unwrap();

    first.metadata.title = "NDA v2".to_string();
    store.save(&first).await.unwrap();

    second.metadata.title = "NDA v3".to_string();
    let err = store.save(&second).await.unwrap_err();
    assert!(matches!(err, ContractError::Conflict(_)));

    // The losing writer changed nothing on disk.
    let stored = store.load(contract.id()).await.unwrap();
    assert_eq!(stored.metadata.title, "NDA v2");
    assert_eq!(stored.revision, 1);
}

#[tokio::test]
async fn noop_save_preserves_every_field() {
    let (_dir, store) = open_store();
    let contract = sample_contract("NDA");
    store.create(&contract).await.unwrap();

    let loaded = store.load(contract.id()).await.unwrap();
    let revision = store.save(&loaded).await.unwrap();
    assert_eq!(revision, loaded.revision + 1);

    let reloaded = store.load(contract.id()).await.unwrap();
    let mut normalized = reloaded.clone();
    normalized.revision = loaded.revision;
    assert_eq!(normalized, loaded);

    // Serialization is deterministic, so an unchanged document persists
    // byte-for-byte identically.
    assert_eq!(
        serde_json::to_vec_pretty(&reloaded).unwrap(),
        serde_json::to_vec_pretty(&reloaded).unwrap()
    );
}

#[tokio::test]
async fn delete_reports_prior_existence() {
    let (_dir, store) = open_store();
    let contract = sample_contract("NDA");
    store.create(&contract).await.unwrap();

    assert!(store.delete(contract.id()).await.unwrap());
    assert!(!store.delete(contract.id()).await.unwrap());

    let err = store.load(contract.id()).await.unwrap_err();
    assert!(matches!(err, ContractError::NotFound(_)));
}

#[tokio::test]
async fn list_filters_by_creator_and_collaborator() {
    let (_dir, store) = open_store();

    let first = sample_contract("First");
    let mut second = sample_contract("Second");
    second
        .metadata
        .add_collaborator(Collaborator {
            user_id: "u-3".to_string(),
            name: "Cay".to_string(),
            email: "cay@example.com".to_string(),
            role: CollaboratorRole::Viewer,
            added_date: Utc::now(),
        })
        .unwrap();
    let mut third = sample_contract("Third");
    third.metadata.creator_id = "u-2".to_string();

    for contract in [&first, &second, &third] {
        store.create(contract).await.unwrap();
    }

    let all = store.list(&ContractFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    // Newest first.
    assert!(all[0].creation_date >= all[1].creation_date);
    assert!(all[1].creation_date >= all[2].creation_date);

    let by_creator = store
        .list(&ContractFilter {
            creator_id: Some("u-1".to_string()),
            collaborator_id: None,
        })
        .await
        .unwrap();
    assert_eq!(by_creator.len(), 2);

    let by_collaborator = store
        .list(&ContractFilter {
            creator_id: None,
            collaborator_id: Some("u-3".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(by_collaborator.len(), 1);
    assert_eq!(by_collaborator[0].title, "Second");
}

async fn exercise_store(store: &dyn ContractStore) -> Result<()> {
    let contract = sample_contract("NDA");
    store.create(&contract).await?;
    assert!(matches!(
        store.create(&contract).await.unwrap_err(),
        ContractError::Conflict(_)
    ));

    let mut loaded = store.load(contract.id()).await?;
    loaded.metadata.title = "NDA v2".to_string();
    let revision = store.save(&loaded).await?;
    assert_eq!(revision, 1);

    let stale = contract.clone();
    assert!(matches!(
        store.save(&stale).await.unwrap_err(),
        ContractError::Conflict(_)
    ));

    assert!(store.delete(contract.id()).await?);
    assert!(!store.delete(contract.id()).await?);
    Ok(())
}

#[tokio::test]
async fn memory_store_honors_the_same_contract() {
    exercise_store(&MemoryContractStore::new()).await.unwrap();
}

#[tokio::test]
async fn memory_store_lists_with_filters() {
    let store = MemoryContractStore::new();
    let mut owned = sample_contract("Mine");
    owned.metadata.creator_id = "u-5".to_string();
    store.create(&owned).await.unwrap();
    store.create(&sample_contract("Other")).await.unwrap();

    let mine = store
        .list(&ContractFilter {
            creator_id: Some("u-5".to_string()),
            collaborator_id: None,
        })
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].title, "Mine");
}
