//! Entity Store contract: transactional key-document persistence over named collections

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppResult;

/// Named document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Assets,
    AssetServices,
    AssetHistory,
    ByodEntries,
    AuditLogs,
    Settings,
    Presence,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Users,
        Collection::Assets,
        Collection::AssetServices,
        Collection::AssetHistory,
        Collection::ByodEntries,
        Collection::AuditLogs,
        Collection::Settings,
        Collection::Presence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Assets => "assets",
            Collection::AssetServices => "asset_services",
            Collection::AssetHistory => "asset_history",
            Collection::ByodEntries => "byod_entries",
            Collection::AuditLogs => "audit_logs",
            Collection::Settings => "settings",
            Collection::Presence => "presence",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A document as persisted, with its revision stamp
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    /// Starts at 1, incremented on every overwrite
    pub revision: u64,
    pub body: Value,
}

/// Condition a put must satisfy for the batch to commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    Unconditional,
    /// Insert only; the id must not exist yet
    Absent,
    /// Compare-and-swap on the stored revision
    Revision(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        collection: Collection,
        id: String,
        precondition: Precondition,
        body: Value,
    },
    /// Insert a new immutable document, optionally trimming the collection to
    /// the `retain` most recently appended ones.
    Append {
        collection: Collection,
        id: String,
        body: Value,
        retain: Option<usize>,
    },
    Delete {
        collection: Collection,
        id: String,
        revision: u64,
    },
}

impl WriteOp {
    pub fn collection(&self) -> Collection {
        match self {
            WriteOp::Put { collection, .. }
            | WriteOp::Append { collection, .. }
            | WriteOp::Delete { collection, .. } => *collection,
        }
    }
}

/// Persistence backend.
///
/// `commit` applies every operation or none of them. A failed precondition
/// rejects the batch with `AppError::Conflict`; an I/O failure with a
/// fatal-class error.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> AppResult<Option<StoredDocument>>;

    /// All documents of a collection, in insertion order
    async fn list(&self, collection: Collection) -> AppResult<Vec<StoredDocument>>;

    async fn commit(&self, ops: Vec<WriteOp>) -> AppResult<()>;

    /// Connectivity check used by the readiness endpoint
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
