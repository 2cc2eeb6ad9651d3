//! BYOD workflow and provisioning-mode policy

mod common;

use chrono::NaiveDate;

use assetdesk_server::{
    error::AppError,
    models::{
        asset::{AssignAsset, ReturnAsset},
        byod::{ByodReason, DeviceType, EmployeeType, SubmitByodRequest},
        settings::UpdateSettings,
        AssetStatus, AssetUsage, AuditAction, ByodStatus, HistoryKind, InventoryCategory, User,
    },
    repository::Collection,
    services::byod::{BYOD_RECLAIM_NOTE, SWITCHED_TO_COMPANY_REASON},
};
use common::Harness;

fn device_request() -> SubmitByodRequest {
    SubmitByodRequest {
        employee_type: EmployeeType::Permanent,
        employee_id: Some("E1".to_string()),
        department: Some("Engineering".to_string()),
        phone: None,
        device_type: DeviceType::Laptop,
        brand: "Apple".to_string(),
        model: "MacBook Air".to_string(),
        serial_number: "C02XYZ".to_string(),
        os_version: Some("14.5".to_string()),
        imei_mac: None,
        agreement_accepted: true,
    }
}

fn reason(text: &str) -> ByodReason {
    ByodReason { reason: text.to_string() }
}

async fn holding_laptop(h: &Harness, user: &User, code: &str) -> uuid::Uuid {
    let laptop = h.laptop(code).await;
    h.services
        .assets
        .assign(
            &h.admin,
            laptop.id,
            AssignAsset { user_id: user.id, is_spare: false, spare_return_date: None },
        )
        .await
        .unwrap();
    laptop.id
}

#[tokio::test]
async fn test_approval_reclaims_company_hardware() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;
    let laptop = holding_laptop(&h, &e1, "LAP-001").await;

    let entry = h.services.byod.submit_request(&e1, device_request()).await.unwrap();
    assert_eq!(entry.status, ByodStatus::AwaitingApproval);
    assert_eq!(entry.employee_name, "E1");

    let approval = h.services.byod.approve(&h.admin, entry.id).await.unwrap();
    assert_eq!(approval.entry.status, ByodStatus::Active);
    assert_eq!(approval.entry.approved_by, Some(h.admin.id));
    assert_eq!(approval.reclaimed_asset_ids, vec![laptop]);

    let asset = h.asset(laptop).await;
    assert_eq!(asset.status, AssetStatus::PendingAudit);
    assert_eq!(asset.assigned_to, None);
    assert_eq!(h.user(e1.id).await.asset_usage, AssetUsage::Personal);

    let history = h.services.assets.history(&h.admin, laptop).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.kind, HistoryKind::Return);
    assert_eq!(last.note.as_deref(), Some(BYOD_RECLAIM_NOTE));

    assert_eq!(h.audit_actions().await.last(), Some(&AuditAction::ByodPolicyApproved));
}

#[tokio::test]
async fn test_failed_approval_changes_nothing() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;
    let laptop = holding_laptop(&h, &e1, "LAP-001").await;
    let entry = h.services.byod.submit_request(&e1, device_request()).await.unwrap();
    let audit_before = h.audit_actions().await.len();

    h.store.fail_writes_to(Collection::Users).await;
    let err = h.services.byod.approve(&h.admin, entry.id).await.unwrap_err();
    assert!(matches!(err, AppError::Fatal(_)));
    h.store.clear_faults().await;

    let asset = h.asset(laptop).await;
    assert_eq!(asset.status, AssetStatus::Assigned);
    assert_eq!(asset.assigned_to, Some(e1.id));
    assert_eq!(h.user(e1.id).await.asset_usage, AssetUsage::Company);
    let entries = h.services.byod.my_entries(&e1).await.unwrap();
    assert_eq!(entries[0].status, ByodStatus::AwaitingApproval);
    assert_eq!(h.audit_actions().await.len(), audit_before);

    // The same approval succeeds once the store recovers
    h.services.byod.approve(&h.admin, entry.id).await.unwrap();
    assert_eq!(h.asset(laptop).await.status, AssetStatus::PendingAudit);
}

#[tokio::test]
async fn test_duplicate_request_is_refused() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;

    h.services.byod.submit_request(&e1, device_request()).await.unwrap();
    let err = h.services.byod.submit_request(&e1, device_request()).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateRequest(_)));
    assert_eq!(h.services.byod.my_entries(&e1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_request_after_rejection_is_allowed() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;

    let first = h.services.byod.submit_request(&e1, device_request()).await.unwrap();
    let rejected = h
        .services
        .byod
        .reject(&h.admin, first.id, reason("Device too old"))
        .await
        .unwrap();
    assert_eq!(rejected.status, ByodStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Device too old"));

    h.services.byod.submit_request(&e1, device_request()).await.unwrap();
    assert_eq!(h.services.byod.my_entries(&e1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rejected_entry_cannot_be_approved() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;
    let entry = h.services.byod.submit_request(&e1, device_request()).await.unwrap();
    h.services.byod.reject(&h.admin, entry.id, reason("Missing paperwork")).await.unwrap();

    let err = h.services.byod.approve(&h.admin, entry.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_agreement_must_be_accepted() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;

    let err = h
        .services
        .byod
        .submit_request(
            &e1,
            SubmitByodRequest { agreement_accepted: false, ..device_request() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_requests_can_be_disabled() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;
    h.services
        .settings
        .update_settings(
            &h.admin,
            UpdateSettings { allow_raise_byod_request: Some(false), ..Default::default() },
        )
        .await
        .unwrap();

    let err = h.services.byod.submit_request(&e1, device_request()).await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_retrieval_by_owner_and_by_admin() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;
    let e2 = h.employee("E2").await;

    let own = h.services.byod.submit_request(&e1, device_request()).await.unwrap();
    h.services.byod.approve(&h.admin, own.id).await.unwrap();
    let retrieved = h
        .services
        .byod
        .retrieve(&e1, own.id, reason("Going back to a company laptop"))
        .await
        .unwrap();
    assert_eq!(retrieved.status, ByodStatus::RetrievedByEmployee);

    let other = h.services.byod.submit_request(&e2, device_request()).await.unwrap();
    h.services.byod.approve(&h.admin, other.id).await.unwrap();

    // Another employee lacks byod.update
    let err = h
        .services
        .byod
        .retrieve(&e1, other.id, reason("Not mine"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));

    let overridden = h
        .services
        .byod
        .retrieve(&h.admin, other.id, reason("Security incident"))
        .await
        .unwrap();
    assert_eq!(overridden.status, ByodStatus::RetrievedByAdmin);

    let actions = h.audit_actions().await;
    assert!(actions.contains(&AuditAction::ByodRetrievalRequest));
    assert_eq!(actions.last(), Some(&AuditAction::ByodAdminOverride));
}

#[tokio::test]
async fn test_personal_user_takes_spares_only() {
    let h = Harness::new().await;
    let e1 = h.personal_employee("E1").await;
    let laptop = h.laptop("LAP-001").await;

    let err = h
        .services
        .assets
        .assign(
            &h.admin,
            laptop.id,
            AssignAsset { user_id: e1.id, is_spare: false, spare_return_date: None },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PolicyViolation(_)));
    assert_eq!(h.asset(laptop.id).await.status, AssetStatus::ReadyToUse);

    let spare = h
        .services
        .assets
        .assign(
            &h.admin,
            laptop.id,
            AssignAsset {
                user_id: e1.id,
                is_spare: true,
                spare_return_date: NaiveDate::from_ymd_opt(2024, 7, 15),
            },
        )
        .await
        .unwrap();
    assert!(spare.is_spare_assignment);

    // Peripherals are never restricted
    let mouse = h.register("MOU-001", InventoryCategory::Mouse).await;
    h.services
        .assets
        .assign(
            &h.admin,
            mouse.id,
            AssignAsset { user_id: e1.id, is_spare: false, spare_return_date: None },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_switch_to_personal_requires_no_company_laptop() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;
    let laptop = h.laptop("LAP-001").await;

    let assigned = h
        .services
        .assets
        .assign(
            &h.admin,
            laptop.id,
            AssignAsset { user_id: e1.id, is_spare: false, spare_return_date: None },
        )
        .await
        .unwrap();
    assert_eq!(assigned.status, AssetStatus::Assigned);
    let history = h.services.assets.history(&h.admin, laptop.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, HistoryKind::Assignment);

    let err = h
        .services
        .byod
        .set_asset_usage(&h.admin, e1.id, AssetUsage::Personal)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PolicyViolation(_)));
    assert_eq!(h.user(e1.id).await.asset_usage, AssetUsage::Company);

    h.services
        .assets
        .return_asset(
            &h.admin,
            laptop.id,
            ReturnAsset { destination_status: AssetStatus::ReadyToUse, note: None },
        )
        .await
        .unwrap();

    let user = h
        .services
        .byod
        .set_asset_usage(&h.admin, e1.id, AssetUsage::Personal)
        .await
        .unwrap();
    assert_eq!(user.asset_usage, AssetUsage::Personal);
    assert_eq!(h.user(e1.id).await.asset_usage, AssetUsage::Personal);
    assert_eq!(h.audit_actions().await.last(), Some(&AuditAction::AssetUsageToggle));
}

#[tokio::test]
async fn test_assignment_during_switch_to_personal_conflicts() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;
    let laptop = h.laptop("LAP-001").await;

    // The switch has validated E1's (empty) holdings and is about to commit
    let held = h.gate.hold_next_commit().await;
    let (services, admin, e1_id) = (h.services.clone(), h.admin.clone(), e1.id);
    let switch = tokio::spawn(async move {
        services.byod.set_asset_usage(&admin, e1_id, AssetUsage::Personal).await
    });
    let release = held.parked().await;

    h.services
        .assets
        .assign(
            &h.admin,
            laptop.id,
            AssignAsset { user_id: e1.id, is_spare: false, spare_return_date: None },
        )
        .await
        .unwrap();
    release.send(()).unwrap();

    let err = switch.await.unwrap().unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(h.user(e1.id).await.asset_usage, AssetUsage::Company);
    assert_eq!(h.asset(laptop.id).await.assigned_to, Some(e1.id));
    assert!(!h.audit_actions().await.contains(&AuditAction::AssetUsageToggle));
}

#[tokio::test]
async fn test_switch_to_personal_during_assignment_conflicts() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;
    let laptop = h.laptop("LAP-001").await;

    // The assignment has checked E1 is on COMPANY mode and is about to commit
    let held = h.gate.hold_next_commit().await;
    let (services, admin) = (h.services.clone(), h.admin.clone());
    let (e1_id, laptop_id) = (e1.id, laptop.id);
    let assign = tokio::spawn(async move {
        services
            .assets
            .assign(
                &admin,
                laptop_id,
                AssignAsset { user_id: e1_id, is_spare: false, spare_return_date: None },
            )
            .await
    });
    let release = held.parked().await;

    h.services
        .byod
        .set_asset_usage(&h.admin, e1.id, AssetUsage::Personal)
        .await
        .unwrap();
    release.send(()).unwrap();

    let err = assign.await.unwrap().unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let stored = h.asset(laptop.id).await;
    assert_eq!(stored.status, AssetStatus::ReadyToUse);
    assert_eq!(stored.assigned_to, None);
    assert!(h.services.assets.history(&h.admin, laptop.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_switch_to_company_closes_active_entry() {
    let h = Harness::new().await;
    let e1 = h.employee("E1").await;
    let entry = h.services.byod.submit_request(&e1, device_request()).await.unwrap();
    h.services.byod.approve(&h.admin, entry.id).await.unwrap();

    let user = h
        .services
        .byod
        .set_asset_usage(&h.admin, e1.id, AssetUsage::Company)
        .await
        .unwrap();
    assert_eq!(user.asset_usage, AssetUsage::Company);

    let entries = h.services.byod.my_entries(&e1).await.unwrap();
    assert_eq!(entries[0].status, ByodStatus::InactiveSwitchedToCompany);
    assert_eq!(entries[0].retrieval_reason.as_deref(), Some(SWITCHED_TO_COMPANY_REASON));

    // Same mode again is a no-op
    let audit_len = h.audit_actions().await.len();
    h.services
        .byod
        .set_asset_usage(&h.admin, e1.id, AssetUsage::Company)
        .await
        .unwrap();
    assert_eq!(h.audit_actions().await.len(), audit_len);
}
