//! In-memory Entity Store used for development and tests

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{Collection, EntityStore, Precondition, StoredDocument, WriteOp};
use crate::error::{AppError, AppResult};

type Collections = BTreeMap<Collection, Vec<StoredDocument>>;

/// Document store kept behind a single lock.
///
/// Commits are applied to a copy of the state which replaces the live state
/// only once every operation succeeded.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    failing: RwLock<HashSet<Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every commit touching `collection` fail as an I/O error would
    pub async fn fail_writes_to(&self, collection: Collection) {
        self.failing.write().await.insert(collection);
    }

    pub async fn clear_faults(&self) {
        self.failing.write().await.clear();
    }

    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn apply(state: &mut Collections, op: WriteOp) -> AppResult<()> {
    match op {
        WriteOp::Put { collection, id, precondition, body } => {
            let docs = state.entry(collection).or_default();
            let existing = docs.iter().position(|d| d.id == id);

            match (existing, precondition) {
                (Some(index), Precondition::Revision(expected))
                    if docs[index].revision == expected =>
                {
                    docs[index].revision += 1;
                    docs[index].body = body;
                }
                (Some(index), Precondition::Unconditional) => {
                    docs[index].revision += 1;
                    docs[index].body = body;
                }
                (None, Precondition::Absent) | (None, Precondition::Unconditional) => {
                    docs.push(StoredDocument { id, revision: 1, body });
                }
                (Some(index), Precondition::Revision(expected)) => {
                    return Err(AppError::Conflict(format!(
                        "{} {} is at revision {}, expected {}",
                        collection, id, docs[index].revision, expected
                    )));
                }
                (Some(_), Precondition::Absent) => {
                    return Err(AppError::Conflict(format!("{} {} already exists", collection, id)));
                }
                (None, Precondition::Revision(_)) => {
                    return Err(AppError::Conflict(format!("{} {} no longer exists", collection, id)));
                }
            }
        }
        WriteOp::Append { collection, id, body, retain } => {
            let docs = state.entry(collection).or_default();
            if docs.iter().any(|d| d.id == id) {
                return Err(AppError::Conflict(format!("{} {} already exists", collection, id)));
            }
            docs.push(StoredDocument { id, revision: 1, body });
            if let Some(keep) = retain {
                if docs.len() > keep {
                    let excess = docs.len() - keep;
                    docs.drain(..excess);
                }
            }
        }
        WriteOp::Delete { collection, id, revision } => {
            let docs = state.entry(collection).or_default();
            match docs.iter().position(|d| d.id == id) {
                Some(index) if docs[index].revision == revision => {
                    docs.remove(index);
                }
                Some(_) => {
                    return Err(AppError::Conflict(format!(
                        "{} {} changed since it was read",
                        collection, id
                    )));
                }
                None => {
                    return Err(AppError::Conflict(format!("{} {} no longer exists", collection, id)));
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> AppResult<Option<StoredDocument>> {
        let state = self.collections.read().await;
        Ok(state
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn list(&self, collection: Collection) -> AppResult<Vec<StoredDocument>> {
        let state = self.collections.read().await;
        Ok(state.get(&collection).cloned().unwrap_or_default())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> AppResult<()> {
        let failing = self.failing.read().await.clone();
        let mut state = self.collections.write().await;
        let mut staged = state.clone();

        for op in ops {
            if failing.contains(&op.collection()) {
                return Err(AppError::Fatal(format!(
                    "simulated write failure on {}",
                    op.collection()
                )));
            }
            apply(&mut staged, op)?;
        }

        *state = staged;
        Ok(())
    }
}
