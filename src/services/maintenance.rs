//! Maintenance (service) records
//!
//! Every write recomputes the service counters of all assets in the same
//! unit of work as the record change.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use super::{
    audit::{AuditService, AuditTarget},
    clock::Clock,
    permissions::ensure_permission,
    service_counters,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        asset_service::{CreateAssetService, ServiceQuery, UpdateAssetService},
        Action, Asset, AssetService, AuditAction, Module, ServiceStatus, User,
    },
    repository::{Repository, Versioned, WriteBatch},
};

#[derive(Clone)]
pub struct MaintenanceService {
    repository: Repository,
    audit: AuditService,
    clock: Arc<dyn Clock>,
}

fn ensure_cost(cost: Decimal) -> AppResult<()> {
    if cost < Decimal::ZERO {
        return Err(AppError::Validation("partsCost: cost cannot be negative".to_string()));
    }
    Ok(())
}

impl MaintenanceService {
    pub fn new(repository: Repository, audit: AuditService, clock: Arc<dyn Clock>) -> Self {
        Self { repository, audit, clock }
    }

    /// Stage the full counter recompute against `services`, the collection
    /// as it will look once the batch commits.
    async fn stage_counters(&self, batch: &mut WriteBatch, services: &[AssetService]) -> AppResult<Vec<Uuid>> {
        let assets = self.repository.list::<Asset>().await?;
        service_counters::stage_sync(batch, assets, services, self.clock.now())
    }

    async fn all_services(&self) -> AppResult<Vec<Versioned<AssetService>>> {
        self.repository.list::<AssetService>().await
    }

    pub async fn create(&self, actor: &User, request: CreateAssetService) -> AppResult<AssetService> {
        ensure_permission(actor, Module::Services, Action::Write)?;
        request.validate()?;
        ensure_cost(request.parts_cost)?;

        let asset = self.repository.require::<Asset>(&request.asset_id.to_string()).await?;
        if asset.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Asset {} is decommissioned",
                asset.asset_code
            )));
        }

        let user_id = request.user_id.or(asset.assigned_to);
        let user_name = match user_id {
            Some(id) => Some(self.repository.require::<User>(&id.to_string()).await?.name.clone()),
            None => None,
        };

        let now = self.clock.now();
        let record = AssetService {
            id: Uuid::new_v4(),
            asset_id: asset.id,
            asset_code: asset.asset_code.clone(),
            asset_type: asset.asset_type.clone(),
            brand: asset.brand.clone(),
            model: asset.model.clone(),
            serial_number: asset.serial_number.clone(),
            user_id,
            user_name,
            date_of_service: request.date_of_service,
            date_of_close: (request.status == ServiceStatus::CompletedClosed).then(|| now.date_naive()),
            category: request.category,
            technician_name: request.technician_name,
            summary: request.summary.trim().to_string(),
            status: request.status,
            parts_cost: request.parts_cost,
            invoice_reference: request.invoice_reference,
            conclusion: request.conclusion,
            created_at: now,
            updated_at: now,
        };

        let mut services: Vec<AssetService> = self
            .all_services()
            .await?
            .into_iter()
            .map(|s| s.into_inner())
            .collect();
        services.push(record.clone());

        let mut batch = WriteBatch::new();
        batch.insert(&record)?;
        self.stage_counters(&mut batch, &services).await?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::ServiceCreate,
            Some(AuditTarget::asset(&asset)),
            format!("Service recorded: {}", record.summary),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(service = %record.id, asset = %record.asset_id, "Service record created");
        Ok(record)
    }

    pub async fn update(
        &self,
        actor: &User,
        service_id: Uuid,
        request: UpdateAssetService,
    ) -> AppResult<AssetService> {
        ensure_permission(actor, Module::Services, Action::Update)?;
        request.validate()?;

        let mut record = self.repository.require::<AssetService>(&service_id.to_string()).await?;
        let was_closed = record.status == ServiceStatus::CompletedClosed;

        if let Some(v) = request.date_of_service {
            record.date_of_service = v;
        }
        if let Some(v) = request.category {
            record.category = Some(v);
        }
        if let Some(v) = request.technician_name {
            record.technician_name = Some(v);
        }
        if let Some(v) = request.summary {
            record.summary = v.trim().to_string();
        }
        if let Some(v) = request.parts_cost {
            ensure_cost(v)?;
            record.parts_cost = v;
        }
        if let Some(v) = request.invoice_reference {
            record.invoice_reference = Some(v);
        }
        if let Some(v) = request.conclusion {
            record.conclusion = Some(v);
        }

        let now = self.clock.now();
        if let Some(status) = request.status {
            record.status = status;
            match status {
                ServiceStatus::CompletedClosed if !was_closed => record.date_of_close = Some(now.date_naive()),
                ServiceStatus::UncompletedPending => record.date_of_close = None,
                _ => {}
            }
        }
        record.updated_at = now;

        let services: Vec<AssetService> = self
            .all_services()
            .await?
            .into_iter()
            .map(|s| if s.id == record.id { record.value.clone() } else { s.into_inner() })
            .collect();

        let mut batch = WriteBatch::new();
        batch.update(&record)?;
        self.stage_counters(&mut batch, &services).await?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::ServiceUpdate,
            Some(AuditTarget {
                id: record.id.to_string(),
                name: record.asset_code.clone(),
            }),
            format!("Service updated: {}", record.summary),
        )?;
        self.repository.commit(batch).await?;

        Ok(record.into_inner())
    }

    pub async fn delete(&self, actor: &User, service_id: Uuid) -> AppResult<()> {
        ensure_permission(actor, Module::Services, Action::Update)?;

        let record = self.repository.require::<AssetService>(&service_id.to_string()).await?;
        let services: Vec<AssetService> = self
            .all_services()
            .await?
            .into_iter()
            .filter(|s| s.id != record.id)
            .map(|s| s.into_inner())
            .collect();

        let mut batch = WriteBatch::new();
        batch.delete(&record);
        self.stage_counters(&mut batch, &services).await?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::ServiceDelete,
            Some(AuditTarget {
                id: record.id.to_string(),
                name: record.asset_code.clone(),
            }),
            format!("Service deleted: {}", record.summary),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(service = %record.id, "Service record deleted");
        Ok(())
    }

    /// Recompute every asset's counters from the stored records
    pub async fn resync_counters(&self, actor: &User) -> AppResult<usize> {
        ensure_permission(actor, Module::Services, Action::Update)?;

        let services: Vec<AssetService> = self
            .all_services()
            .await?
            .into_iter()
            .map(|s| s.into_inner())
            .collect();

        let mut batch = WriteBatch::new();
        let changed = self.stage_counters(&mut batch, &services).await?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::ServiceCountersResync,
            None,
            format!("Service counters resynchronized; {} asset(s) corrected", changed.len()),
        )?;
        self.repository.commit(batch).await?;

        Ok(changed.len())
    }

    pub async fn list(&self, actor: &User, query: &ServiceQuery) -> AppResult<Vec<AssetService>> {
        ensure_permission(actor, Module::Services, Action::Read)?;
        Ok(self
            .repository
            .list_where::<AssetService, _>(|s| query.asset_id.map_or(true, |id| s.asset_id == id))
            .await?
            .into_iter()
            .map(|s| s.into_inner())
            .collect())
    }

    /// Records raised for the caller
    pub async fn my_services(&self, actor: &User) -> AppResult<Vec<AssetService>> {
        Ok(self
            .repository
            .list_where::<AssetService, _>(|s| s.user_id == Some(actor.id))
            .await?
            .into_iter()
            .map(|s| s.into_inner())
            .collect())
    }
}
