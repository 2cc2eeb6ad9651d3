//! Asset lifecycle controller
//!
//! Owns the asset status machine. Every mutation re-reads the asset it
//! validates and commits against the revision it read, together with its
//! history rows and audit entry. Assignment also commits against the
//! assignee's revision.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use super::{
    audit::{AuditService, AuditTarget},
    clock::Clock,
    notifications::NotificationService,
    permissions::{can_perform, ensure_permission},
    policy,
    settings::SettingsService,
    valuation,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        asset::{
            AssetQuery, AssetValuation, AssetView, AssignAsset, DecommissionAsset, RegisterAsset,
            RemovalData, ReturnAsset, UpdateAssetDetails,
        },
        Action, Asset, AssetHistory, AssetStatus, AuditAction, HistoryKind, Module, Settings, User,
    },
    repository::{Repository, Versioned, WriteBatch},
};

/// Release `asset` from its holder into `destination`.
///
/// Stages the asset update and, when it was held, a RETURN history row.
/// Returns the previous holder.
pub(crate) fn stage_release(
    batch: &mut WriteBatch,
    asset: &mut Versioned<Asset>,
    destination: AssetStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<Option<Uuid>> {
    let holder = asset.assigned_to;
    asset.clear_assignment();
    asset.status = destination;
    asset.updated_at = now;
    batch.update(asset)?;

    if let Some(user_id) = holder {
        let history = AssetHistory::new(asset.id, user_id, HistoryKind::Return, now, note);
        batch.append(&history, None)?;
    }
    Ok(holder)
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Clone)]
pub struct AssetsService {
    repository: Repository,
    audit: AuditService,
    settings: SettingsService,
    notifications: NotificationService,
    clock: Arc<dyn Clock>,
}

impl AssetsService {
    pub fn new(
        repository: Repository,
        audit: AuditService,
        settings: SettingsService,
        notifications: NotificationService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            audit,
            settings,
            notifications,
            clock,
        }
    }

    /// Register a new asset in the requested initial status
    pub async fn register(&self, actor: &User, request: RegisterAsset) -> AppResult<Asset> {
        ensure_permission(actor, Module::Assets, Action::Write)?;
        request.validate()?;

        let status = request.status.unwrap_or(AssetStatus::ReadyToUse);
        if matches!(status, AssetStatus::Assigned | AssetStatus::Removed) {
            return Err(AppError::Validation(format!(
                "An asset cannot be registered as {}",
                status
            )));
        }
        if request.purchase_value < Decimal::ZERO {
            return Err(AppError::Validation("purchaseValue must not be negative".to_string()));
        }

        let code = normalize_code(&request.asset_code);
        let duplicate = self
            .repository
            .list_where::<Asset, _>(|a| normalize_code(&a.asset_code) == code)
            .await?;
        if !duplicate.is_empty() {
            return Err(AppError::Validation(format!("Asset code {} already exists", code)));
        }

        let now = self.clock.now();
        let asset = Asset {
            id: Uuid::new_v4(),
            asset_code: code,
            inventory_category: request.inventory_category,
            asset_type: request.asset_type,
            brand: request.brand,
            model: request.model,
            serial_number: request.serial_number,
            status,
            purchase_date: request.purchase_date,
            purchase_value: request.purchase_value,
            assigned_to: None,
            assigned_at: None,
            is_spare_assignment: false,
            spare_return_date: None,
            total_services: 0,
            open_services: 0,
            closed_services: 0,
            last_service_date: None,
            removal_data: None,
            created_at: now,
            updated_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.insert(&asset)?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::AssetCreate,
            Some(AuditTarget::asset(&asset)),
            format!("Registered {} as {}", asset.asset_code, asset.status),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(asset = %asset.asset_code, status = %asset.status, "Asset registered");
        Ok(asset)
    }

    /// Edit descriptive fields of a non-removed asset
    pub async fn update_details(
        &self,
        actor: &User,
        asset_id: Uuid,
        request: UpdateAssetDetails,
    ) -> AppResult<Asset> {
        ensure_permission(actor, Module::Assets, Action::Update)?;
        request.validate()?;

        let mut asset = self.repository.require::<Asset>(&asset_id.to_string()).await?;
        if asset.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "{} is removed and read-only",
                asset.asset_code
            )));
        }

        let mut changed = Vec::new();
        if let Some(v) = request.asset_type {
            asset.asset_type = Some(v);
            changed.push("assetType");
        }
        if let Some(v) = request.brand {
            asset.brand = Some(v);
            changed.push("brand");
        }
        if let Some(v) = request.model {
            asset.model = Some(v);
            changed.push("model");
        }
        if let Some(v) = request.serial_number {
            asset.serial_number = Some(v);
            changed.push("serialNumber");
        }
        if changed.is_empty() {
            return Ok(asset.into_inner());
        }
        asset.updated_at = self.clock.now();

        let mut batch = WriteBatch::new();
        batch.update(&asset)?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::AssetUpdate,
            Some(AuditTarget::asset(&asset)),
            format!("Updated {}", changed.join(", ")),
        )?;
        self.repository.commit(batch).await?;

        Ok(asset.into_inner())
    }

    /// Assign an asset to a user
    pub async fn assign(&self, actor: &User, asset_id: Uuid, request: AssignAsset) -> AppResult<Asset> {
        ensure_permission(actor, Module::Assets, Action::Update)?;

        let mut asset = self.repository.require::<Asset>(&asset_id.to_string()).await?;
        match asset.status {
            AssetStatus::Removed => {
                return Err(AppError::InvalidState(format!(
                    "{} is removed and cannot be assigned",
                    asset.asset_code
                )))
            }
            AssetStatus::Assigned => {
                return Err(AppError::InvalidState(format!(
                    "{} is already assigned",
                    asset.asset_code
                )))
            }
            _ => {}
        }

        let user = self.repository.require::<User>(&request.user_id.to_string()).await?;
        if !user.can_sign_in() {
            return Err(AppError::InvalidState(format!(
                "{} is inactive or deleted and cannot receive assets",
                user.name
            )));
        }
        policy::ensure_assignable(&user, &asset, request.is_spare)?;

        let now = self.clock.now();
        let previous = asset.status;
        asset.status = AssetStatus::Assigned;
        asset.assigned_to = Some(user.id);
        asset.assigned_at = Some(now);
        asset.is_spare_assignment = request.is_spare;
        asset.spare_return_date = if request.is_spare { request.spare_return_date } else { None };
        asset.updated_at = now;

        let note = if request.is_spare {
            let until = asset
                .spare_return_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "not set".to_string());
            Some(format!("Spare assignment. Expected return: {}", until))
        } else {
            None
        };

        let mut batch = WriteBatch::new();
        batch.update(&asset)?;
        // The assignee's mode and status were checked above
        batch.touch(&user)?;
        batch.append(
            &AssetHistory::new(asset.id, user.id, HistoryKind::Assignment, now, note),
            None,
        )?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::AssetAssign,
            Some(AuditTarget::asset(&asset)),
            format!(
                "Assigned {} to {} ({} -> ASSIGNED{})",
                asset.asset_code,
                user.name,
                previous,
                if request.is_spare { ", spare" } else { "" }
            ),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(asset = %asset.asset_code, user = %user.id, spare = request.is_spare, "Asset assigned");

        if let Some(settings) = self.notification_settings().await {
            self.notifications.asset_assigned(&settings, &asset, &user).await;
        }

        Ok(asset.into_inner())
    }

    /// Return an assigned asset into one of the return destinations
    pub async fn return_asset(&self, actor: &User, asset_id: Uuid, request: ReturnAsset) -> AppResult<Asset> {
        ensure_permission(actor, Module::Assets, Action::Update)?;

        let mut asset = self.repository.require::<Asset>(&asset_id.to_string()).await?;
        if asset.status != AssetStatus::Assigned {
            return Err(AppError::InvalidState(format!(
                "{} is {} and not assigned",
                asset.asset_code, asset.status
            )));
        }
        if !request.destination_status.is_return_destination() {
            return Err(AppError::InvalidState(format!(
                "{} is not a valid return destination",
                request.destination_status
            )));
        }

        let now = self.clock.now();
        let mut batch = WriteBatch::new();
        let holder_id = stage_release(&mut batch, &mut asset, request.destination_status, request.note.clone(), now)?;
        let holder = match holder_id {
            Some(id) => self.repository.get::<User>(&id.to_string()).await?.map(|u| u.into_inner()),
            None => None,
        };

        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::AssetReturn,
            Some(AuditTarget::asset(&asset)),
            format!(
                "Returned {} from {} to {}{}",
                asset.asset_code,
                holder.as_ref().map(|u| u.name.as_str()).unwrap_or("unknown holder"),
                asset.status,
                request.note.as_ref().map(|n| format!(": {}", n)).unwrap_or_default()
            ),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(asset = %asset.asset_code, status = %asset.status, "Asset returned");

        if let Some(settings) = self.notification_settings().await {
            self.notifications
                .asset_status_changed(&settings, &asset, AssetStatus::Assigned, holder.as_ref())
                .await;
        }

        Ok(asset.into_inner())
    }

    /// Manual status change; any status except REMOVED, never out of REMOVED
    pub async fn set_status(&self, actor: &User, asset_id: Uuid, status: AssetStatus) -> AppResult<Asset> {
        ensure_permission(actor, Module::Assets, Action::Update)?;

        let mut asset = self.repository.require::<Asset>(&asset_id.to_string()).await?;
        let previous = asset.status;

        if previous.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "{} is removed; its status can no longer change",
                asset.asset_code
            )));
        }
        if status == AssetStatus::Removed {
            return Err(AppError::InvalidTransition(
                "Use decommission to remove an asset".to_string(),
            ));
        }
        if status == AssetStatus::Assigned && previous != AssetStatus::Assigned {
            return Err(AppError::InvalidTransition(
                "Use assign to give an asset to a user".to_string(),
            ));
        }

        let now = self.clock.now();
        let mut batch = WriteBatch::new();
        let mut holder = None;

        if previous == AssetStatus::Assigned && status != AssetStatus::Assigned {
            let note = format!("Manual status transition: {} -> {}", previous, status);
            if let Some(id) = stage_release(&mut batch, &mut asset, status, Some(note), now)? {
                holder = self.repository.get::<User>(&id.to_string()).await?.map(|u| u.into_inner());
            }
        } else if previous != status {
            asset.status = status;
            asset.updated_at = now;
            batch.update(&asset)?;
        }

        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::AssetStatusChange,
            Some(AuditTarget::asset(&asset)),
            format!("Status of {} changed from {} to {}", asset.asset_code, previous, status),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(asset = %asset.asset_code, from = %previous, to = %status, "Asset status changed");

        if let Some(settings) = self.notification_settings().await {
            self.notifications
                .asset_status_changed(&settings, &asset, previous, holder.as_ref())
                .await;
        }

        Ok(asset.into_inner())
    }

    /// Permanently remove an asset, freezing its removal record
    pub async fn decommission(
        &self,
        actor: &User,
        asset_id: Uuid,
        request: DecommissionAsset,
    ) -> AppResult<Asset> {
        ensure_permission(actor, Module::Assets, Action::Update)?;
        request.validate()?;

        let mut asset = self.repository.require::<Asset>(&asset_id.to_string()).await?;
        if asset.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "{} is already removed",
                asset.asset_code
            )));
        }

        let settings = self.settings.current().await?;
        let now = self.clock.now();
        let value_at_removal = request
            .value_at_removal
            .unwrap_or_else(|| valuation::compute_book_value(&asset, &settings, now));

        let last_known_user = asset.assigned_to;
        let last_known_user_name = match last_known_user {
            Some(id) => self
                .repository
                .get::<User>(&id.to_string())
                .await?
                .map(|u| u.name.clone()),
            None => None,
        };

        asset.clear_assignment();
        asset.status = AssetStatus::Removed;
        asset.removal_data = Some(RemovalData {
            audit_status: request.audit_status,
            status_to_check: request.status_to_check,
            admin_removal_date: request.admin_removal_date,
            reason: request.reason.clone(),
            approved_by: request.approved_by.clone(),
            condition_at_removal: request.condition_at_removal,
            value_at_removal,
            proof_ref: request.proof_ref,
            remark: request.remark,
            last_known_user,
            last_known_user_name,
            removal_timestamp: now,
        });
        asset.updated_at = now;

        let mut batch = WriteBatch::new();
        batch.update(&asset)?;
        if let Some(user_id) = last_known_user {
            batch.append(
                &AssetHistory::new(
                    asset.id,
                    user_id,
                    HistoryKind::Return,
                    now,
                    Some(format!("Decommissioned: {}", request.reason)),
                ),
                None,
            )?;
        }
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::AssetDecommission,
            Some(AuditTarget::asset(&asset)),
            format!(
                "Decommissioned {} (reason: {}, approved by {}, value {}{})",
                asset.asset_code,
                request.reason,
                request.approved_by,
                settings.currency_symbol,
                value_at_removal
            ),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(asset = %asset.asset_code, "Asset decommissioned");
        Ok(asset.into_inner())
    }

    /// Settings for post-commit notifications; the mutation already succeeded,
    /// so a read failure only skips the notification
    async fn notification_settings(&self) -> Option<Settings> {
        match self.settings.current().await {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(error = %e, "Settings unavailable, notification skipped");
                None
            }
        }
    }

    fn show_value(actor: &User, settings: &Settings) -> bool {
        settings.allow_view_asset_value || can_perform(actor, Module::Assets, Action::Read)
    }

    pub async fn get_asset(&self, actor: &User, asset_id: Uuid) -> AppResult<AssetView> {
        ensure_permission(actor, Module::Assets, Action::Read)?;

        let asset = self.repository.require::<Asset>(&asset_id.to_string()).await?;
        let settings = self.settings.current().await?;
        Ok(valuation::view(asset.into_inner(), &settings, self.clock.now(), true))
    }

    /// List assets matching the query. Removed assets appear only when
    /// explicitly filtered for.
    pub async fn list_assets(&self, actor: &User, query: &AssetQuery) -> AppResult<Vec<AssetView>> {
        ensure_permission(actor, Module::Assets, Action::Read)?;

        let assets = self
            .repository
            .list_where::<Asset, _>(|a| {
                query.category.map_or(true, |c| a.inventory_category == c)
                    && match query.status {
                        Some(s) => a.status == s,
                        None => a.status != AssetStatus::Removed,
                    }
                    && query.assigned_to.map_or(true, |u| a.assigned_to == Some(u))
            })
            .await?;

        let settings = self.settings.current().await?;
        let now = self.clock.now();
        Ok(assets
            .into_iter()
            .map(|a| valuation::view(a.into_inner(), &settings, now, true))
            .collect())
    }

    /// Removed assets register
    pub async fn list_removed(&self, actor: &User) -> AppResult<Vec<AssetView>> {
        ensure_permission(actor, Module::Rar, Action::Read)?;

        let assets = self
            .repository
            .list_where::<Asset, _>(|a| a.status == AssetStatus::Removed)
            .await?;
        let settings = self.settings.current().await?;
        let now = self.clock.now();
        Ok(assets
            .into_iter()
            .map(|a| valuation::view(a.into_inner(), &settings, now, true))
            .collect())
    }

    /// Assets currently held by the caller
    pub async fn my_assets(&self, actor: &User) -> AppResult<Vec<AssetView>> {
        let assets = self
            .repository
            .list_where::<Asset, _>(|a| a.assigned_to == Some(actor.id))
            .await?;
        let settings = self.settings.current().await?;
        let show_value = Self::show_value(actor, &settings);
        let now = self.clock.now();
        Ok(assets
            .into_iter()
            .map(|a| valuation::view(a.into_inner(), &settings, now, show_value))
            .collect())
    }

    pub async fn history(&self, actor: &User, asset_id: Uuid) -> AppResult<Vec<AssetHistory>> {
        ensure_permission(actor, Module::Assets, Action::Read)?;
        self.repository.require::<Asset>(&asset_id.to_string()).await?;

        Ok(self
            .repository
            .list_where::<AssetHistory, _>(|h| h.asset_id == asset_id)
            .await?
            .into_iter()
            .map(|h| h.into_inner())
            .collect())
    }

    pub async fn valuation(&self, actor: &User, asset_id: Uuid) -> AppResult<AssetValuation> {
        ensure_permission(actor, Module::Assets, Action::Read)?;

        let asset = self.repository.require::<Asset>(&asset_id.to_string()).await?;
        let settings = self.settings.current().await?;
        let now = self.clock.now();

        Ok(AssetValuation {
            asset_id: asset.id,
            purchase_value: asset.purchase_value,
            book_value: valuation::compute_book_value(&asset, &settings, now),
            months_elapsed: valuation::months_elapsed(asset.purchase_date, now.date_naive()),
            depreciation_rate: settings.depreciation_rate,
            is_depreciation_enabled: settings.is_depreciation_enabled,
            currency_symbol: settings.currency_symbol,
        })
    }
}
