//! User administration: accounts, permissions, deactivation and soft deletion

mod common;

use std::sync::Arc;

use chrono::Duration;

use assetdesk_server::{
    config::AuthConfig,
    error::AppError,
    models::{
        asset::AssignAsset,
        user::{CreateAdmin, CreateEmployee, UpdateUser, UserQuery},
        Action, AdminRole, AssetStatus, AssetUsage, AuditAction, HistoryKind, Module, ModuleAccess,
        PermissionMatrix, User, UserRole,
    },
    repository::{MemoryStore, Repository},
    services::{
        clock::{Clock, FixedClock},
        notifications::LogNotifier,
        permissions::can_perform,
        Services,
    },
};
use common::Harness;

fn new_employee(email: &str) -> CreateEmployee {
    CreateEmployee {
        name: "Meera".to_string(),
        email: email.to_string(),
        password: "s3cret-pass".to_string(),
        mobile: None,
        employee_id: Some("E-204".to_string()),
        location: None,
        department: Some("Finance".to_string()),
        asset_usage: None,
    }
}

#[tokio::test]
async fn test_created_employee_can_sign_in() {
    let h = Harness::new().await;
    let meera = h
        .services
        .users
        .create_employee(&h.admin, new_employee("Meera@Company.com"))
        .await
        .unwrap();
    assert_eq!(meera.email, "meera@company.com");
    assert_eq!(meera.role, UserRole::Employee);
    assert_eq!(meera.asset_usage, AssetUsage::Company);
    assert!(can_perform(&meera, Module::Dashboard, Action::Read));
    assert!(!can_perform(&meera, Module::Assets, Action::Read));

    let (token, user) = h
        .services
        .users
        .authenticate("meera@company.com", "s3cret-pass")
        .await
        .unwrap();
    assert!(!token.is_empty());
    assert_eq!(user.id, meera.id);

    let err = h
        .services
        .users
        .authenticate("meera@company.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authentication(_)));

    let err = h
        .services
        .users
        .create_employee(&h.admin, new_employee("meera@company.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_admin_preset_is_copied_once() {
    let h = Harness::new().await;
    let manager = h
        .services
        .users
        .create_admin(
            &h.admin,
            CreateAdmin {
                name: "Arun".to_string(),
                email: "arun@company.com".to_string(),
                password: "s3cret-pass".to_string(),
                admin_role: AdminRole::AssetsManager,
                mobile: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(manager.permissions, AdminRole::AssetsManager.preset());

    // Narrowing the matrix leaves the role label untouched
    let mut narrowed = manager.permissions.clone();
    narrowed.set(Module::Services, Action::Read, false);
    let updated = h
        .services
        .users
        .update_permissions(&h.admin, manager.id, narrowed)
        .await
        .unwrap();
    assert_eq!(updated.admin_role, Some(AdminRole::AssetsManager));
    assert_eq!(updated.permissions.access(Module::Services), ModuleAccess::NONE);
    assert_eq!(h.audit_actions().await.last(), Some(&AuditAction::PermissionsUpdate));
}

#[tokio::test]
async fn test_inconsistent_matrix_is_rejected() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;

    let mut matrix = PermissionMatrix::employee_default();
    matrix.assets = ModuleAccess { read: false, write: true, update: false };
    let err = h
        .services
        .users
        .update_permissions(&h.admin, anita.id, matrix)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_toggling_one_flag_cascades() {
    let h = Harness::new().await;
    let operator = h.admin_with("Ops", AdminRole::Operator).await;

    // Granting update brings read along
    let updated = h
        .services
        .users
        .toggle_permission(&h.admin, operator.id, Module::Byod, Action::Update, true)
        .await
        .unwrap();
    assert!(updated.permissions.allows(Module::Byod, Action::Update));
    assert!(updated.permissions.allows(Module::Byod, Action::Read));

    // Revoking read takes every flag of the module away
    let updated = h
        .services
        .users
        .toggle_permission(&h.admin, operator.id, Module::Byod, Action::Read, false)
        .await
        .unwrap();
    assert_eq!(updated.permissions.access(Module::Byod), ModuleAccess::NONE);
    assert!(updated.permissions.validate().is_ok());
    assert_eq!(h.user(operator.id).await.permissions.access(Module::Byod), ModuleAccess::NONE);
    assert_eq!(h.audit_actions().await.last(), Some(&AuditAction::PermissionsUpdate));
}

#[tokio::test]
async fn test_admin_cannot_edit_own_permissions() {
    let h = Harness::new().await;

    let err = h
        .services
        .users
        .toggle_permission(&h.admin, h.admin.id, Module::Admin, Action::Update, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let err = h
        .services
        .users
        .update_permissions(&h.admin, h.admin.id, PermissionMatrix::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert!(h.user(h.admin.id).await.permissions.allows(Module::Admin, Action::Update));
}

#[tokio::test]
async fn test_permission_changes_apply_to_next_request() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;

    let mut matrix = PermissionMatrix::employee_default();
    matrix.set(Module::Assets, Action::Read, true);
    h.services
        .users
        .update_permissions(&h.admin, anita.id, matrix)
        .await
        .unwrap();

    // The request extractor re-reads the user; a stale copy keeps its old grants
    assert!(h
        .services
        .assets
        .list_assets(&anita, &Default::default())
        .await
        .is_err());
    let fresh = h.user(anita.id).await;
    assert!(h
        .services
        .assets
        .list_assets(&fresh, &Default::default())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_deactivation_refused_while_holding_assets() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;
    let laptop = h.laptop("LAP-001").await;
    h.services
        .assets
        .assign(
            &h.admin,
            laptop.id,
            AssignAsset { user_id: anita.id, is_spare: false, spare_return_date: None },
        )
        .await
        .unwrap();

    let err = h
        .services
        .users
        .set_active(&h.admin, anita.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert!(h.user(anita.id).await.is_active);

    let err = h
        .services
        .users
        .set_active(&h.admin, h.admin.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_soft_delete_releases_every_holding() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;
    let laptop = h.laptop("LAP-001").await;
    let mouse = h.register("MOU-001", assetdesk_server::models::InventoryCategory::Mouse).await;
    for id in [laptop.id, mouse.id] {
        h.services
            .assets
            .assign(
                &h.admin,
                id,
                AssignAsset { user_id: anita.id, is_spare: false, spare_return_date: None },
            )
            .await
            .unwrap();
    }

    let deleted = h
        .services
        .users
        .soft_delete(&h.admin, anita.id, "Left the company")
        .await
        .unwrap();
    assert!(deleted.is_deleted);
    assert!(!deleted.is_active);
    assert_eq!(deleted.delete_reason.as_deref(), Some("Left the company"));

    for id in [laptop.id, mouse.id] {
        let asset = h.asset(id).await;
        assert_eq!(asset.status, AssetStatus::Spare);
        assert_eq!(asset.assigned_to, None);
        let history = h.services.assets.history(&h.admin, id).await.unwrap();
        assert_eq!(history.last().unwrap().kind, HistoryKind::Return);
    }
    assert_eq!(h.audit_actions().await.last(), Some(&AuditAction::EmployeeSoftDelete));

    // Deleted users can neither sign in nor be reactivated
    let err = h
        .services
        .users
        .set_active(&h.admin, anita.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let listed = h.services.users.list_users(&h.admin, &UserQuery::default()).await.unwrap();
    assert!(listed.iter().all(|u| u.id != anita.id));
    let with_deleted = h
        .services
        .users
        .list_users(
            &h.admin,
            &UserQuery { role: Some(UserRole::Employee), include_deleted: Some(true) },
        )
        .await
        .unwrap();
    assert_eq!(with_deleted.len(), 1);
}

#[tokio::test]
async fn test_update_user_rejects_deleted() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;
    h.services
        .users
        .soft_delete(&h.admin, anita.id, "Contract ended")
        .await
        .unwrap();

    let err = h
        .services
        .users
        .update_user(
            &h.admin,
            anita.id,
            UpdateUser { department: Some("Sales".to_string()), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_employee_can_read_only_self() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;
    let ravi = h.employee("Ravi").await;

    assert_eq!(h.services.users.get_user(&anita, anita.id).await.unwrap().id, anita.id);
    let err = h.services.users.get_user(&anita, ravi.id).await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_heartbeat_marks_user_online() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;

    let before = h.repository.require::<User>(&anita.id.to_string()).await.unwrap();
    let seen = h.services.users.heartbeat(&anita).await.unwrap();
    assert!(seen.is_online(h.clock.now()));

    // Presence is reported on reads but the user record is not rewritten
    let read = h.services.users.get_user(&h.admin, anita.id).await.unwrap();
    assert_eq!(read.last_active, Some(h.clock.now()));
    let after = h.repository.require::<User>(&anita.id.to_string()).await.unwrap();
    assert_eq!(after.revision, before.revision);

    h.clock.advance(Duration::seconds(31));
    let read = h.services.users.get_user(&h.admin, anita.id).await.unwrap();
    assert!(!read.is_online(h.clock.now()));
}

#[tokio::test]
async fn test_heartbeat_does_not_disturb_admin_workflows() {
    let h = Harness::new().await;
    let anita = h.employee("Anita").await;

    // A heartbeat lands between the soft delete's read and its commit
    let held = h.gate.hold_next_commit().await;
    let (services, admin, anita_id) = (h.services.clone(), h.admin.clone(), anita.id);
    let delete = tokio::spawn(async move {
        services.users.soft_delete(&admin, anita_id, "left the company").await
    });
    let release = held.parked().await;

    h.services.users.heartbeat(&anita).await.unwrap();
    release.send(()).unwrap();

    let deleted = delete.await.unwrap().unwrap();
    assert!(deleted.is_deleted);
    assert!(h.user(anita.id).await.is_deleted);
}

#[tokio::test]
async fn test_bootstrap_admin_only_on_empty_store() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(common::start_time()));
    let services = Services::new(
        Repository::new(store),
        clock,
        Arc::new(LogNotifier),
        AuthConfig::default(),
    );

    let admin = services.users.bootstrap_admin().await.unwrap().unwrap();
    assert_eq!(admin.admin_role, Some(AdminRole::SuperAdmin));
    assert!(can_perform(&admin, Module::Settings, Action::Update));

    assert!(services.users.bootstrap_admin().await.unwrap().is_none());
    services
        .users
        .authenticate(&AuthConfig::default().bootstrap_admin_email, &AuthConfig::default().bootstrap_admin_password)
        .await
        .unwrap();
}
