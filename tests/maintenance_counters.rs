//! Maintenance records and the derived per-asset service counters

mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use assetdesk_server::{
    error::AppError,
    models::{
        asset::{AssignAsset, DecommissionAsset},
        asset_service::{CreateAssetService, ServiceQuery, UpdateAssetService},
        Asset, AuditAction, ServiceStatus,
    },
    repository::WriteBatch,
};
use common::Harness;

fn service_for(asset_id: uuid::Uuid, status: ServiceStatus, day: u32) -> CreateAssetService {
    CreateAssetService {
        asset_id,
        user_id: None,
        date_of_service: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        category: Some("Hardware".to_string()),
        technician_name: Some("Vendor".to_string()),
        summary: "Battery replacement".to_string(),
        status,
        parts_cost: Decimal::new(2500, 0),
        invoice_reference: None,
        conclusion: None,
    }
}

fn counters(asset: &Asset) -> (u32, u32, u32) {
    (asset.total_services, asset.open_services, asset.closed_services)
}

#[tokio::test]
async fn test_counters_follow_every_write() {
    let h = Harness::new().await;
    let laptop = h.laptop("LAP-001").await;
    let other = h.laptop("LAP-002").await;

    let first = h
        .services
        .maintenance
        .create(&h.admin, service_for(laptop.id, ServiceStatus::UncompletedPending, 3))
        .await
        .unwrap();
    assert_eq!(first.asset_code, "LAP-001");
    assert_eq!(first.date_of_close, None);
    h.services
        .maintenance
        .create(&h.admin, service_for(laptop.id, ServiceStatus::CompletedClosed, 10))
        .await
        .unwrap();

    let asset = h.asset(laptop.id).await;
    assert_eq!(counters(&asset), (2, 1, 1));
    assert_eq!(asset.last_service_date, NaiveDate::from_ymd_opt(2024, 6, 10));
    assert_eq!(counters(&h.asset(other.id).await), (0, 0, 0));

    let closed = h
        .services
        .maintenance
        .update(
            &h.admin,
            first.id,
            UpdateAssetService { status: Some(ServiceStatus::CompletedClosed), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(closed.date_of_close, Some(common::start_time().date_naive()));
    assert_eq!(counters(&h.asset(laptop.id).await), (2, 0, 2));

    h.services.maintenance.delete(&h.admin, first.id).await.unwrap();
    assert_eq!(counters(&h.asset(laptop.id).await), (1, 0, 1));

    let listed = h
        .services
        .maintenance
        .list(&h.admin, &ServiceQuery { asset_id: Some(laptop.id) })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_service_denormalizes_current_holder() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;
    let laptop = h.laptop("LAP-003").await;
    h.services
        .assets
        .assign(
            &h.admin,
            laptop.id,
            AssignAsset { user_id: anita.id, is_spare: false, spare_return_date: None },
        )
        .await
        .unwrap();

    let record = h
        .services
        .maintenance
        .create(&h.admin, service_for(laptop.id, ServiceStatus::UncompletedPending, 1))
        .await
        .unwrap();
    assert_eq!(record.user_id, Some(anita.id));
    assert_eq!(record.user_name.as_deref(), Some("Anita"));

    let mine = h.services.maintenance.my_services(&anita).await.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_removed_asset_takes_no_services() {
    let h = Harness::new().await;
    let laptop = h.laptop("LAP-004").await;
    h.services
        .assets
        .decommission(
            &h.admin,
            laptop.id,
            DecommissionAsset {
                reason: "Water damage".to_string(),
                approved_by: "IT Head".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = h
        .services
        .maintenance
        .create(&h.admin, service_for(laptop.id, ServiceStatus::UncompletedPending, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_negative_cost_is_rejected() {
    let h = Harness::new().await;
    let laptop = h.laptop("LAP-005").await;

    let err = h
        .services
        .maintenance
        .create(
            &h.admin,
            CreateAssetService {
                parts_cost: Decimal::new(-1, 0),
                ..service_for(laptop.id, ServiceStatus::CompletedClosed, 1)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_resync_repairs_drifted_counters() {
    let h = Harness::new().await;
    let laptop = h.laptop("LAP-006").await;
    h.services
        .maintenance
        .create(&h.admin, service_for(laptop.id, ServiceStatus::UncompletedPending, 2))
        .await
        .unwrap();

    // Corrupt the stored counters behind the service's back
    let mut stored = h.repository.require::<Asset>(&laptop.id.to_string()).await.unwrap();
    stored.total_services = 9;
    stored.open_services = 9;
    let mut batch = WriteBatch::new();
    batch.update(&stored).unwrap();
    h.repository.commit(batch).await.unwrap();

    let corrected = h.services.maintenance.resync_counters(&h.admin).await.unwrap();
    assert_eq!(corrected, 1);
    assert_eq!(counters(&h.asset(laptop.id).await), (1, 1, 0));
    assert_eq!(h.audit_actions().await.last(), Some(&AuditAction::ServiceCountersResync));

    // Nothing left to fix
    assert_eq!(h.services.maintenance.resync_counters(&h.admin).await.unwrap(), 0);
}

#[tokio::test]
async fn test_employee_cannot_record_services() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;
    let laptop = h.laptop("LAP-007").await;

    let err = h
        .services
        .maintenance
        .create(&anita, service_for(laptop.id, ServiceStatus::UncompletedPending, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
}
