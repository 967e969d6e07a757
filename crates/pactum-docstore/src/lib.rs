use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;
use uuid::Uuid;

use pactum_core::{
    Contract, ContractError, ContractFilter, ContractMetadata, ContractStore, Result,
};

// One pretty-printed JSON document per contract under `root`. A single
// write gate serializes create/save/delete; readers never see a partial
// document because every write lands via an atomic rename.
pub struct FileContractStore {
    root: PathBuf,
    write_gate: Mutex<()>,
}

impl FileContractStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(FileContractStore {
            root,
            write_gate: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn contract_path(&self, contract_id: Uuid) -> PathBuf {
        self.root.join(format!("{contract_id}.json"))
    }

    async fn read_document(&self, path: &Path) -> Result<Option<Contract>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice::<Contract>(&bytes) {
            Ok(contract) => {
                if contract.clauses.iter().any(|clause| clause.versions.is_empty()) {
                    warn!(
                        "skipping contract document {} with an empty version history",
                        path.display()
                    );
                    return Ok(None);
                }
                Ok(Some(contract))
            }
            Err(err) => {
                // A malformed document reads as absent rather than as partial state.
                warn!(
                    "skipping unreadable contract document {}: {err}",
                    path.display()
                );
                Ok(None)
            }
        }
    }

    async fn write_document(&self, contract: &Contract) -> Result<()> {
        let path = self.contract_path(contract.id());
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(contract)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ContractStore for FileContractStore {
    async fn create(&self, contract: &Contract) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let path = self.contract_path(contract.id());
        if tokio::fs::try_exists(&path).await? {
            return Err(ContractError::Conflict(format!(
                "contract '{}' already exists",
                contract.id()
            )));
        }
        self.write_document(contract).await
    }

    async fn load(&self, contract_id: Uuid) -> Result<Contract> {
        let path = self.contract_path(contract_id);
        self.read_document(&path)
            .await?
            .ok_or_else(|| ContractError::NotFound(format!("contract '{contract_id}'")))
    }

    async fn save(&self, contract: &Contract) -> Result<u64> {
        let _gate = self.write_gate.lock().await;
        let path = self.contract_path(contract.id());
        let current = self.read_document(&path).await?.ok_or_else(|| {
            ContractError::NotFound(format!("contract '{}'", contract.id()))
        })?;
        if current.revision != contract.revision {
            return Err(ContractError::Conflict(format!(
                "contract '{}' was modified concurrently (stored revision {}, caller revision {})",
                contract.id(),
                current.revision,
                contract.revision
            )));
        }

        let mut next = contract.clone();
        next.revision = contract.revision + 1;
        self.write_document(&next).await?;
        Ok(next.revision)
    }

    async fn delete(&self, contract_id: Uuid) -> Result<bool> {
        let _gate = self.write_gate.lock().await;
        match tokio::fs::remove_file(self.contract_path(contract_id)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self, filter: &ContractFilter) -> Result<Vec<ContractMetadata>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut results = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(contract) = self.read_document(&path).await? {
                if filter.matches(&contract.metadata) {
                    results.push(contract.metadata);
                }
            }
        }
        results.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        Ok(results)
    }
}

#[derive(Default)]
pub struct MemoryContractStore {
    contracts: RwLock<HashMap<Uuid, Contract>>,
}

impl MemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContractStore for MemoryContractStore {
    async fn create(&self, contract: &Contract) -> Result<()> {
        let mut contracts = self.contracts.write().await;
        if contracts.contains_key(&contract.id()) {
            return Err(ContractError::Conflict(format!(
                "contract '{}' already exists",
                contract.id()
            )));
        }
        contracts.insert(contract.id(), contract.clone());
        Ok(())
    }

    async fn load(&self, contract_id: Uuid) -> Result<Contract> {
        let contracts = self.contracts.read().await;
        contracts
            .get(&contract_id)
            .cloned()
            .ok_or_else(|| ContractError::NotFound(format!("contract '{contract_id}'")))
    }

    async fn save(&self, contract: &Contract) -> Result<u64> {
        let mut contracts = self.contracts.write().await;
        let current = contracts.get(&contract.id()).ok_or_else(|| {
            ContractError::NotFound(format!("contract '{}'", contract.id()))
        })?;
        if current.revision != contract.revision {
            return Err(ContractError::Conflict(format!(
                "contract '{}' was modified concurrently (stored revision {}, caller revision {})",
                contract.id(),
                current.revision,
                contract.revision
            )));
        }

        let mut next = contract.clone();
        next.revision = contract.revision + 1;
        let revision = next.revision;
        contracts.insert(contract.id(), next);
        Ok(revision)
    }

    async fn delete(&self, contract_id: Uuid) -> Result<bool> {
        let mut contracts = self.contracts.write().await;
        Ok(contracts.remove(&contract_id).is_some())
    }

    async fn list(&self, filter: &ContractFilter) -> Result<Vec<ContractMetadata>> {
        let contracts = self.contracts.read().await;
        let mut results: Vec<ContractMetadata> = contracts
            .values()
            .filter(|contract| filter.matches(&contract.metadata))
            .map(|contract| contract.metadata.clone())
            .collect();
        results.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        Ok(results)
    }
}
