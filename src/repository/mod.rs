//! Repository layer: typed access to the Entity Store and the write unit of work

pub mod memory;
pub mod postgres;
pub mod store;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{user::Presence, Asset, AssetHistory, AssetService, AuditLog, ByodEntry, Settings, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{Collection, EntityStore, Precondition, StoredDocument, WriteOp};

/// Key of the single settings document
pub const SETTINGS_KEY: &str = "global";

/// A record type living in one collection
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
    /// Human readable name used in error messages
    const NAME: &'static str;

    fn key(&self) -> String;
}

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;
    const NAME: &'static str = "User";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for Asset {
    const COLLECTION: Collection = Collection::Assets;
    const NAME: &'static str = "Asset";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for AssetService {
    const COLLECTION: Collection = Collection::AssetServices;
    const NAME: &'static str = "Service record";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for AssetHistory {
    const COLLECTION: Collection = Collection::AssetHistory;
    const NAME: &'static str = "History entry";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for ByodEntry {
    const COLLECTION: Collection = Collection::ByodEntries;
    const NAME: &'static str = "BYOD entry";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for AuditLog {
    const COLLECTION: Collection = Collection::AuditLogs;
    const NAME: &'static str = "Audit log";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for Settings {
    const COLLECTION: Collection = Collection::Settings;
    const NAME: &'static str = "Settings";

    fn key(&self) -> String {
        SETTINGS_KEY.to_string()
    }
}

impl Entity for Presence {
    const COLLECTION: Collection = Collection::Presence;
    const NAME: &'static str = "Presence";

    fn key(&self) -> String {
        self.user_id.to_string()
    }
}

/// An entity together with the revision it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub revision: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Versioned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Versioned<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

fn decode<T: Entity>(doc: StoredDocument) -> AppResult<Versioned<T>> {
    let value = serde_json::from_value(doc.body)?;
    Ok(Versioned { revision: doc.revision, value })
}

/// Ordered set of writes committed all-or-nothing
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity; fails the commit if the key already exists
    pub fn insert<T: Entity>(&mut self, value: &T) -> AppResult<()> {
        self.ops.push(WriteOp::Put {
            collection: T::COLLECTION,
            id: value.key(),
            precondition: Precondition::Absent,
            body: serde_json::to_value(value)?,
        });
        Ok(())
    }

    /// Overwrite an entity read earlier; fails the commit if it changed since
    pub fn update<T: Entity>(&mut self, entity: &Versioned<T>) -> AppResult<()> {
        self.ops.push(WriteOp::Put {
            collection: T::COLLECTION,
            id: entity.key(),
            precondition: Precondition::Revision(entity.revision),
            body: serde_json::to_value(&entity.value)?,
        });
        Ok(())
    }

    /// Claim an entity read earlier without changing it. Its revision is
    /// bumped, so any other unit of work that read it fails to commit.
    pub fn touch<T: Entity>(&mut self, entity: &Versioned<T>) -> AppResult<()> {
        self.update(entity)
    }

    pub fn upsert<T: Entity>(&mut self, value: &T) -> AppResult<()> {
        self.ops.push(WriteOp::Put {
            collection: T::COLLECTION,
            id: value.key(),
            precondition: Precondition::Unconditional,
            body: serde_json::to_value(value)?,
        });
        Ok(())
    }

    /// Append an immutable record, keeping at most `retain` of them
    pub fn append<T: Entity>(&mut self, value: &T, retain: Option<usize>) -> AppResult<()> {
        self.ops.push(WriteOp::Append {
            collection: T::COLLECTION,
            id: value.key(),
            body: serde_json::to_value(value)?,
            retain,
        });
        Ok(())
    }

    pub fn delete<T: Entity>(&mut self, entity: &Versioned<T>) {
        self.ops.push(WriteOp::Delete {
            collection: T::COLLECTION,
            id: entity.key(),
            revision: entity.revision,
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Typed facade over the configured Entity Store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn EntityStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: Entity>(&self, id: &str) -> AppResult<Option<Versioned<T>>> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Like `get`, but a missing entity is a `NotFound` error
    pub async fn require<T: Entity>(&self, id: &str) -> AppResult<Versioned<T>> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::NAME, id)))
    }

    /// Every entity of the collection, in insertion order
    pub async fn list<T: Entity>(&self) -> AppResult<Vec<Versioned<T>>> {
        self.store
            .list(T::COLLECTION)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn list_where<T, F>(&self, predicate: F) -> AppResult<Vec<Versioned<T>>>
    where
        T: Entity,
        F: Fn(&T) -> bool,
    {
        let all = self.list::<T>().await?;
        Ok(all.into_iter().filter(|e| predicate(&e.value)).collect())
    }

    /// Commit a unit of work.
    ///
    /// Revision conflicts come back as `Conflict`; any other persistence
    /// failure is reported as `Fatal`.
    pub async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let size = batch.len();

        match self.store.commit(batch.ops).await {
            Ok(()) => Ok(()),
            Err(AppError::Conflict(msg)) => Err(AppError::Conflict(msg)),
            Err(e) if e.is_fatal() => {
                tracing::error!(error = %e, ops = size, "Commit failed, nothing was persisted");
                Err(AppError::Fatal(format!("commit of {} writes failed: {}", size, e)))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}
