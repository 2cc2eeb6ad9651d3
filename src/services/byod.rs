//! BYOD transition orchestrator
//!
//! Coordinates a user's provisioning mode, their BYOD entry and the
//! reclamation of company assets. Each workflow commits as one unit of work.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use super::{
    assets::stage_release,
    audit::{AuditService, AuditTarget},
    clock::Clock,
    permissions::ensure_permission,
    policy,
    settings::SettingsService,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        byod::{ByodApproval, ByodQuery, ByodReason, SubmitByodRequest},
        Action, Asset, AssetStatus, AssetUsage, AuditAction, ByodEntry, ByodStatus, Module, User,
    },
    repository::{Repository, Versioned, WriteBatch},
};

pub const BYOD_RECLAIM_NOTE: &str = "Automatic return due to BYOD approval";
pub const SWITCHED_TO_COMPANY_REASON: &str = "Admin switched mode to Company Assets";

#[derive(Clone)]
pub struct ByodService {
    repository: Repository,
    audit: AuditService,
    settings: SettingsService,
    clock: Arc<dyn Clock>,
}

impl ByodService {
    pub fn new(
        repository: Repository,
        audit: AuditService,
        settings: SettingsService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            audit,
            settings,
            clock,
        }
    }

    async fn entries_of(&self, user_id: Uuid) -> AppResult<Vec<Versioned<ByodEntry>>> {
        self.repository
            .list_where::<ByodEntry, _>(|e| e.user_id == user_id)
            .await
    }

    async fn holdings_of(&self, user_id: Uuid) -> AppResult<Vec<Versioned<Asset>>> {
        self.repository
            .list_where::<Asset, _>(|a| a.assigned_to == Some(user_id))
            .await
    }

    fn ensure_transition(entry: &ByodEntry, next: ByodStatus) -> AppResult<()> {
        if entry.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "BYOD entry is {} and cannot become {}",
                entry.status, next
            )))
        }
    }

    /// Employee submits a device for approval
    pub async fn submit_request(&self, actor: &User, request: SubmitByodRequest) -> AppResult<ByodEntry> {
        let settings = self.settings.current().await?;
        if !settings.allow_raise_byod_request {
            return Err(AppError::PermissionDenied(
                "BYOD requests are currently disabled".to_string(),
            ));
        }
        request.validate()?;
        if !request.agreement_accepted {
            return Err(AppError::Validation(
                "agreementAccepted: the BYOD policy agreement must be accepted".to_string(),
            ));
        }

        let existing = self.entries_of(actor.id).await?;
        if existing.iter().any(|e| e.status.is_outstanding()) {
            return Err(AppError::DuplicateRequest(
                "A BYOD request is already awaiting approval".to_string(),
            ));
        }
        if existing.iter().any(|e| e.status == ByodStatus::Active) {
            return Err(AppError::DuplicateRequest(
                "An active BYOD registration already exists".to_string(),
            ));
        }

        let now = self.clock.now();
        let entry = ByodEntry {
            id: Uuid::new_v4(),
            user_id: actor.id,
            employee_name: actor.name.clone(),
            email: actor.email.clone(),
            employee_type: request.employee_type,
            employee_id: request.employee_id.or_else(|| actor.employee_id.clone()),
            department: request.department.or_else(|| actor.department.clone()),
            phone: request.phone.or_else(|| actor.mobile.clone()),
            device_type: request.device_type,
            brand: request.brand,
            model: request.model,
            serial_number: request.serial_number,
            os_version: request.os_version,
            imei_mac: request.imei_mac,
            agreement_accepted: true,
            status: ByodStatus::AwaitingApproval,
            created_at: now,
            approved_at: None,
            approved_by: None,
            rejection_reason: None,
            retrieved_at: None,
            retrieval_reason: None,
            updated_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.insert(&entry)?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::ByodRequestSubmitted,
            Some(AuditTarget::byod(&entry)),
            format!("{} submitted {} {} ({})", entry.employee_name, entry.brand, entry.model, entry.serial_number),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(entry = %entry.id, user = %actor.id, "BYOD request submitted");
        Ok(entry)
    }

    /// Approve a request: activate the entry, reclaim every company asset the
    /// user holds into PENDING_AUDIT and switch the user to PERSONAL, atomically.
    pub async fn approve(&self, actor: &User, entry_id: Uuid) -> AppResult<ByodApproval> {
        ensure_permission(actor, Module::Byod, Action::Write)?;

        let mut entry = self.repository.require::<ByodEntry>(&entry_id.to_string()).await?;
        Self::ensure_transition(&entry, ByodStatus::Active)?;

        let mut user = self.repository.require::<User>(&entry.user_id.to_string()).await?;
        if !user.can_sign_in() {
            return Err(AppError::InvalidState(format!(
                "{} is inactive or deleted",
                user.name
            )));
        }
        let others = self.entries_of(user.id).await?;
        if others.iter().any(|e| e.id != entry.id && e.status == ByodStatus::Active) {
            return Err(AppError::InvalidState(format!(
                "{} already has an active BYOD entry",
                user.name
            )));
        }

        let now = self.clock.now();
        let mut batch = WriteBatch::new();

        entry.status = ByodStatus::Active;
        entry.approved_at = Some(now);
        entry.approved_by = Some(actor.id);
        entry.updated_at = now;
        batch.update(&entry)?;

        let mut reclaimed = Vec::new();
        for mut asset in self.holdings_of(user.id).await? {
            stage_release(
                &mut batch,
                &mut asset,
                AssetStatus::PendingAudit,
                Some(BYOD_RECLAIM_NOTE.to_string()),
                now,
            )?;
            reclaimed.push(asset.id);
        }

        user.asset_usage = AssetUsage::Personal;
        user.updated_at = now;
        batch.update(&user)?;

        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::ByodPolicyApproved,
            Some(AuditTarget::byod(&entry)),
            format!(
                "Approved BYOD for {}; {} asset(s) reclaimed to PENDING_AUDIT",
                user.name,
                reclaimed.len()
            ),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(entry = %entry.id, user = %user.id, reclaimed = reclaimed.len(), "BYOD approved");
        Ok(ByodApproval {
            entry: entry.into_inner(),
            reclaimed_asset_ids: reclaimed,
        })
    }

    pub async fn reject(&self, actor: &User, entry_id: Uuid, reason: ByodReason) -> AppResult<ByodEntry> {
        ensure_permission(actor, Module::Byod, Action::Write)?;
        reason.validate()?;

        let mut entry = self.repository.require::<ByodEntry>(&entry_id.to_string()).await?;
        Self::ensure_transition(&entry, ByodStatus::Rejected)?;

        let now = self.clock.now();
        entry.status = ByodStatus::Rejected;
        entry.rejection_reason = Some(reason.reason.clone());
        entry.updated_at = now;

        let mut batch = WriteBatch::new();
        batch.update(&entry)?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::ByodRejected,
            Some(AuditTarget::byod(&entry)),
            format!("Rejected BYOD for {}: {}", entry.employee_name, reason.reason),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(entry = %entry.id, "BYOD rejected");
        Ok(entry.into_inner())
    }

    /// Retrieve an active entry. The owner retrieves as employee; anyone else
    /// needs `byod.update` and retrieves as admin.
    pub async fn retrieve(&self, actor: &User, entry_id: Uuid, reason: ByodReason) -> AppResult<ByodEntry> {
        let mut entry = self.repository.require::<ByodEntry>(&entry_id.to_string()).await?;

        let (next, action) = if entry.user_id == actor.id {
            (ByodStatus::RetrievedByEmployee, AuditAction::ByodRetrievalRequest)
        } else {
            ensure_permission(actor, Module::Byod, Action::Update)?;
            (ByodStatus::RetrievedByAdmin, AuditAction::ByodAdminOverride)
        };
        reason.validate()?;
        Self::ensure_transition(&entry, next)?;

        let now = self.clock.now();
        entry.status = next;
        entry.retrieved_at = Some(now);
        entry.retrieval_reason = Some(reason.reason.clone());
        entry.updated_at = now;

        let mut batch = WriteBatch::new();
        batch.update(&entry)?;
        self.audit.stage(
            &mut batch,
            actor,
            action,
            Some(AuditTarget::byod(&entry)),
            format!("BYOD for {} set to {}: {}", entry.employee_name, next, reason.reason),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(entry = %entry.id, status = %next, "BYOD retrieved");
        Ok(entry.into_inner())
    }

    /// Change a user's provisioning mode.
    ///
    /// PERSONAL is refused while the user holds a non-spare primary device.
    /// COMPANY never requires reclamation and closes any active BYOD entry.
    /// Setting the current mode again changes nothing.
    pub async fn set_asset_usage(&self, actor: &User, user_id: Uuid, mode: AssetUsage) -> AppResult<User> {
        ensure_permission(actor, Module::Employees, Action::Update)?;

        let user = self.repository.require::<User>(&user_id.to_string()).await?;
        if user.is_deleted {
            return Err(AppError::InvalidState(format!("{} is deleted", user.name)));
        }

        match mode {
            AssetUsage::Personal => self.switch_to_personal(actor, user).await,
            AssetUsage::Company => self.switch_to_company(actor, user).await,
        }
    }

    async fn switch_to_personal(&self, actor: &User, mut user: Versioned<User>) -> AppResult<User> {
        if user.asset_usage == AssetUsage::Personal {
            return Ok(user.into_inner());
        }

        let holdings = self.holdings_of(user.id).await?;
        policy::ensure_can_switch_to_personal(&user, holdings.iter().map(|a| &a.value))?;

        user.asset_usage = AssetUsage::Personal;
        user.updated_at = self.clock.now();

        let mut batch = WriteBatch::new();
        batch.update(&user)?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::AssetUsageToggle,
            Some(AuditTarget::user(&user)),
            format!("{} switched from COMPANY to PERSONAL", user.name),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(user = %user.id, "Switched to personal devices");
        Ok(user.into_inner())
    }

    async fn switch_to_company(&self, actor: &User, mut user: Versioned<User>) -> AppResult<User> {
        let active: Vec<Versioned<ByodEntry>> = self
            .entries_of(user.id)
            .await?
            .into_iter()
            .filter(|e| e.status == ByodStatus::Active)
            .collect();

        if user.asset_usage == AssetUsage::Company && active.is_empty() {
            return Ok(user.into_inner());
        }

        let now = self.clock.now();
        let previous = user.asset_usage;
        user.asset_usage = AssetUsage::Company;
        user.updated_at = now;

        let mut batch = WriteBatch::new();
        batch.update(&user)?;
        for mut entry in active.iter().cloned() {
            entry.status = ByodStatus::InactiveSwitchedToCompany;
            entry.retrieved_at = Some(now);
            entry.retrieval_reason = Some(SWITCHED_TO_COMPANY_REASON.to_string());
            entry.updated_at = now;
            batch.update(&entry)?;
        }
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::AssetUsageToggle,
            Some(AuditTarget::user(&user)),
            format!(
                "{} switched from {} to COMPANY; {} BYOD entr{} closed",
                user.name,
                previous.as_str(),
                active.len(),
                if active.len() == 1 { "y" } else { "ies" }
            ),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(user = %user.id, closed = active.len(), "Switched to company devices");
        Ok(user.into_inner())
    }

    pub async fn list(&self, actor: &User, query: &ByodQuery) -> AppResult<Vec<ByodEntry>> {
        ensure_permission(actor, Module::Byod, Action::Read)?;

        Ok(self
            .repository
            .list_where::<ByodEntry, _>(|e| query.status.map_or(true, |s| e.status == s))
            .await?
            .into_iter()
            .map(|e| e.into_inner())
            .collect())
    }

    /// The caller's own entries
    pub async fn my_entries(&self, actor: &User) -> AppResult<Vec<ByodEntry>> {
        Ok(self
            .entries_of(actor.id)
            .await?
            .into_iter()
            .map(|e| e.into_inner())
            .collect())
    }
}
