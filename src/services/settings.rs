//! Settings service

use std::sync::Arc;

use validator::Validate;

use super::{
    audit::AuditService,
    clock::Clock,
    permissions::ensure_permission,
};
use crate::{
    error::{AppError, AppResult},
    models::{settings::UpdateSettings, Action, AuditAction, Module, Settings, User},
    repository::{Repository, WriteBatch, SETTINGS_KEY},
};

#[derive(Clone)]
pub struct SettingsService {
    repository: Repository,
    audit: AuditService,
    clock: Arc<dyn Clock>,
}

/// Apply `new` over `field` when present and note the change as `key: old -> new`
fn apply<T>(changes: &mut Vec<String>, key: &str, field: &mut T, new: Option<T>)
where
    T: PartialEq + std::fmt::Display,
{
    if let Some(value) = new {
        if *field != value {
            changes.push(format!("{}: {} -> {}", key, field, value));
            *field = value;
        }
    }
}

impl SettingsService {
    pub fn new(repository: Repository, audit: AuditService, clock: Arc<dyn Clock>) -> Self {
        Self { repository, audit, clock }
    }

    /// Effective settings, falling back to defaults when none were saved
    pub async fn current(&self) -> AppResult<Settings> {
        Ok(self
            .repository
            .get::<Settings>(SETTINGS_KEY)
            .await?
            .map(|s| s.into_inner())
            .unwrap_or_default())
    }

    pub async fn get_settings(&self, actor: &User) -> AppResult<Settings> {
        ensure_permission(actor, Module::Settings, Action::Read)?;
        self.current().await
    }

    /// Update settings; one audit entry is written per changed key
    pub async fn update_settings(&self, actor: &User, update: UpdateSettings) -> AppResult<Settings> {
        ensure_permission(actor, Module::Settings, Action::Update)?;
        update.validate()?;

        if update.depreciation_rate.is_some_and(|r| r.is_sign_negative()) {
            return Err(AppError::Validation("depreciationRate must not be negative".to_string()));
        }
        if update.min_asset_value_threshold.is_some_and(|v| v.is_sign_negative()) {
            return Err(AppError::Validation(
                "minAssetValueThreshold must not be negative".to_string(),
            ));
        }
        if let Some(status) = update.default_asset_status {
            if !status.is_return_destination() {
                return Err(AppError::Validation(format!(
                    "defaultAssetStatus cannot be {}",
                    status
                )));
            }
        }

        let stored = self.repository.get::<Settings>(SETTINGS_KEY).await?;
        let mut settings = stored.as_ref().map(|s| s.value.clone()).unwrap_or_default();

        let mut changes = Vec::new();
        apply(&mut changes, "depreciationRate", &mut settings.depreciation_rate, update.depreciation_rate);
        apply(&mut changes, "currencySymbol", &mut settings.currency_symbol, update.currency_symbol);
        apply(
            &mut changes,
            "isDepreciationEnabled",
            &mut settings.is_depreciation_enabled,
            update.is_depreciation_enabled,
        );
        apply(
            &mut changes,
            "roundToNearestInteger",
            &mut settings.round_to_nearest_integer,
            update.round_to_nearest_integer,
        );
        apply(
            &mut changes,
            "minAssetValueThreshold",
            &mut settings.min_asset_value_threshold,
            update.min_asset_value_threshold,
        );
        apply(&mut changes, "autoMarkEWaste", &mut settings.auto_mark_e_waste, update.auto_mark_e_waste);
        apply(
            &mut changes,
            "defaultAssetStatus",
            &mut settings.default_asset_status,
            update.default_asset_status,
        );
        apply(
            &mut changes,
            "allowRaiseByodRequest",
            &mut settings.allow_raise_byod_request,
            update.allow_raise_byod_request,
        );
        apply(
            &mut changes,
            "allowViewAssetValue",
            &mut settings.allow_view_asset_value,
            update.allow_view_asset_value,
        );
        apply(
            &mut changes,
            "enableNotifications",
            &mut settings.enable_notifications,
            update.enable_notifications,
        );
        apply(
            &mut changes,
            "notifyOnStatusChange",
            &mut settings.notify_on_status_change,
            update.notify_on_status_change,
        );
        apply(
            &mut changes,
            "notifyOnAssignment",
            &mut settings.notify_on_assignment,
            update.notify_on_assignment,
        );
        apply(
            &mut changes,
            "adminEmailForNotifications",
            &mut settings.admin_email_for_notifications,
            update.admin_email_for_notifications,
        );

        if changes.is_empty() {
            return Ok(settings);
        }

        settings.last_updated = Some(self.clock.now());

        let mut batch = WriteBatch::new();
        match stored {
            Some(mut versioned) => {
                versioned.value = settings.clone();
                batch.update(&versioned)?;
            }
            None => batch.insert(&settings)?,
        }
        for change in &changes {
            self.audit.stage(&mut batch, actor, AuditAction::SettingChange, None, change.clone())?;
        }
        self.repository.commit(batch).await?;

        tracing::info!(changed = changes.len(), by = %actor.id, "Settings updated");
        Ok(settings)
    }
}
