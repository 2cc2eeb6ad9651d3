//! Audit log recorder
//!
//! Entries are appended in the same unit of work as the mutation they
//! describe, so a lost audit entry always means the mutation was lost too.

use std::sync::Arc;

use uuid::Uuid;

use super::{clock::Clock, permissions::ensure_permission};
use crate::{
    error::AppResult,
    models::{
        audit::AUDIT_LOG_CAPACITY, Action, Asset, AuditAction, AuditLog, ByodEntry, Module, User,
    },
    repository::{Repository, WriteBatch},
};

/// What an audit entry is about
#[derive(Debug, Clone)]
pub struct AuditTarget {
    pub id: String,
    pub name: String,
}

impl AuditTarget {
    pub fn asset(asset: &Asset) -> Self {
        Self { id: asset.id.to_string(), name: asset.asset_code.clone() }
    }

    pub fn user(user: &User) -> Self {
        Self { id: user.id.to_string(), name: user.name.clone() }
    }

    pub fn byod(entry: &ByodEntry) -> Self {
        Self { id: entry.id.to_string(), name: entry.employee_name.clone() }
    }
}

#[derive(Clone)]
pub struct AuditService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl AuditService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Build an entry stamped with a fresh id and the current time
    pub fn entry(
        &self,
        actor: &User,
        action: AuditAction,
        target: Option<AuditTarget>,
        details: impl Into<String>,
    ) -> AuditLog {
        let (target_id, target_name) = match target {
            Some(t) => (Some(t.id), Some(t.name)),
            None => (None, None),
        };
        AuditLog {
            id: Uuid::new_v4(),
            action,
            performed_by: actor.id,
            performed_by_name: actor.name.clone(),
            target_id,
            target_name,
            details: details.into(),
            timestamp: self.clock.now(),
        }
    }

    /// Add an entry to `batch`; the log is trimmed to its capacity on commit
    pub fn stage(
        &self,
        batch: &mut WriteBatch,
        actor: &User,
        action: AuditAction,
        target: Option<AuditTarget>,
        details: impl Into<String>,
    ) -> AppResult<()> {
        let entry = self.entry(actor, action, target, details);
        batch.append(&entry, Some(AUDIT_LOG_CAPACITY))
    }

    /// Record a standalone entry
    pub async fn record(
        &self,
        actor: &User,
        action: AuditAction,
        target: Option<AuditTarget>,
        details: impl Into<String>,
    ) -> AppResult<()> {
        let mut batch = WriteBatch::new();
        self.stage(&mut batch, actor, action, target, details)?;
        self.repository.commit(batch).await
    }

    /// Most recent entries first
    pub async fn list(&self, actor: &User, limit: Option<usize>) -> AppResult<Vec<AuditLog>> {
        ensure_permission(actor, Module::Admin, Action::Read)?;

        let mut logs: Vec<AuditLog> = self
            .repository
            .list::<AuditLog>()
            .await?
            .into_iter()
            .map(|v| v.into_inner())
            .collect();
        logs.reverse();
        if let Some(limit) = limit {
            logs.truncate(limit);
        }
        Ok(logs)
    }
}
