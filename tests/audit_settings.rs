//! Audit log retention and global settings

mod common;

use rust_decimal::Decimal;

use assetdesk_server::{
    error::AppError,
    models::{settings::UpdateSettings, AdminRole, AssetStatus, AuditAction, AuditLog},
    services::audit::AuditTarget,
};
use common::Harness;

#[tokio::test]
async fn test_audit_log_keeps_latest_entries() {
    let h = Harness::new().await;

    for i in 0..501 {
        h.services
            .audit
            .record(&h.admin, AuditAction::SettingChange, None, format!("change {}", i))
            .await
            .unwrap();
    }

    let logs: Vec<AuditLog> = h.services.audit.list(&h.admin, None).await.unwrap();
    assert_eq!(logs.len(), 500);
    assert_eq!(logs[0].details, "change 500");
    assert_eq!(logs[499].details, "change 1");

    let limited = h.services.audit.list(&h.admin, Some(10)).await.unwrap();
    assert_eq!(limited.len(), 10);
}

#[tokio::test]
async fn test_audit_entries_carry_actor_and_target() {
    let h = Harness::new().await;
    let laptop = h.laptop("LAP-001").await;

    h.services
        .audit
        .record(
            &h.admin,
            AuditAction::AssetUpdate,
            Some(AuditTarget::asset(&laptop)),
            "manual note",
        )
        .await
        .unwrap();

    let latest = &h.services.audit.list(&h.admin, Some(1)).await.unwrap()[0];
    assert_eq!(latest.performed_by, h.admin.id);
    assert_eq!(latest.performed_by_name, "Root Admin");
    assert_eq!(latest.target_id.as_deref(), Some(laptop.id.to_string().as_str()));
    assert_eq!(latest.target_name.as_deref(), Some("LAP-001"));
    assert_eq!(latest.timestamp, common::start_time());
}

#[tokio::test]
async fn test_audit_log_requires_admin_read() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;
    let assistant = h.admin_with("Kiran", AdminRole::ComplaintAssistant).await;

    for actor in [&anita, &assistant] {
        let err = h.services.audit.list(actor, None).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }
}

#[tokio::test]
async fn test_settings_update_audits_each_change() {
    let h = Harness::new().await;

    let defaults = h.services.settings.get_settings(&h.admin).await.unwrap();
    assert_eq!(defaults.depreciation_rate, Decimal::new(277, 2));
    assert_eq!(defaults.default_asset_status, AssetStatus::Spare);

    let updated = h
        .services
        .settings
        .update_settings(
            &h.admin,
            UpdateSettings {
                depreciation_rate: Some(Decimal::new(3, 0)),
                allow_view_asset_value: Some(true),
                // Unchanged values are not audited
                currency_symbol: Some(defaults.currency_symbol.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.depreciation_rate, Decimal::new(3, 0));
    assert!(updated.allow_view_asset_value);

    let logs = h.services.audit.list(&h.admin, None).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.action == AuditAction::SettingChange));
    assert!(logs.iter().any(|l| l.details == "depreciationRate: 2.77 -> 3"));
}

#[tokio::test]
async fn test_settings_validation() {
    let h = Harness::new().await;

    let err = h
        .services
        .settings
        .update_settings(
            &h.admin,
            UpdateSettings { depreciation_rate: Some(Decimal::new(-1, 0)), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = h
        .services
        .settings
        .update_settings(
            &h.admin,
            UpdateSettings { default_asset_status: Some(AssetStatus::Stolen), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let anita = h.employee("Anita").await;
    let err = h.services.settings.get_settings(&anita).await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
}
