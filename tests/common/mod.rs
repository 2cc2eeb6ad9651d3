//! Shared fixtures for integration tests: in-memory store, fixed clock and seeded users

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use assetdesk_server::{
    config::AuthConfig,
    error::AppResult,
    models::{
        asset::RegisterAsset, AdminRole, Asset, AssetUsage, AuditAction, AuditLog, InventoryCategory,
        PermissionMatrix, User, UserRole,
    },
    repository::{Collection, EntityStore, MemoryStore, Repository, StoredDocument, WriteBatch, WriteOp},
    services::{clock::FixedClock, notifications::LogNotifier, Services},
};

struct Gate {
    parked: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// Memory store able to hold one commit back, to interleave two workflows
/// between their reads and their commit
pub struct GatedStore {
    inner: Arc<MemoryStore>,
    gate: Mutex<Option<Gate>>,
}

/// Handle on a commit held by `GatedStore::hold_next_commit`
pub struct HeldCommit {
    parked: oneshot::Receiver<()>,
    release: oneshot::Sender<()>,
}

impl HeldCommit {
    /// Wait for the held commit to arrive; send on the returned channel to let it through
    pub async fn parked(self) -> oneshot::Sender<()> {
        self.parked.await.unwrap();
        self.release
    }
}

impl GatedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            gate: Mutex::new(None),
        }
    }

    /// The next commit waits, unapplied, until released
    pub async fn hold_next_commit(&self) -> HeldCommit {
        let (parked_tx, parked_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.gate.lock().await = Some(Gate {
            parked: parked_tx,
            release: release_rx,
        });
        HeldCommit {
            parked: parked_rx,
            release: release_tx,
        }
    }
}

#[async_trait]
impl EntityStore for GatedStore {
    async fn get(&self, collection: Collection, id: &str) -> AppResult<Option<StoredDocument>> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: Collection) -> AppResult<Vec<StoredDocument>> {
        self.inner.list(collection).await
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> AppResult<()> {
        let gate = self.gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.parked.send(());
            let _ = gate.release.await;
        }
        self.inner.commit(ops).await
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub services: Services,
    pub store: Arc<MemoryStore>,
    pub gate: Arc<GatedStore>,
    pub clock: Arc<FixedClock>,
    pub repository: Repository,
    pub admin: User,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gate = Arc::new(GatedStore::new(store.clone()));
        let clock = Arc::new(FixedClock::new(start_time()));
        let repository = Repository::new(gate.clone());
        let services = Services::new(
            repository.clone(),
            clock.clone(),
            Arc::new(LogNotifier),
            AuthConfig::default(),
        );

        let mut harness = Self {
            services,
            store,
            gate,
            clock,
            repository,
            admin: placeholder_user(),
        };
        harness.admin = harness
            .seed_user("Root Admin", UserRole::Admin, Some(AdminRole::SuperAdmin), AssetUsage::Company)
            .await;
        harness
    }

    /// Insert a user directly, bypassing permission checks and password hashing
    pub async fn seed_user(
        &self,
        name: &str,
        role: UserRole,
        admin_role: Option<AdminRole>,
        asset_usage: AssetUsage,
    ) -> User {
        let now = self.clock_now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@company.com", name.to_lowercase().replace(' ', ".")),
            password_hash: String::new(),
            role,
            admin_role,
            permissions: admin_role
                .map(|r| r.preset())
                .unwrap_or_else(PermissionMatrix::employee_default),
            asset_usage,
            mobile: None,
            employee_id: None,
            location: None,
            department: None,
            is_active: true,
            is_deleted: false,
            delete_reason: None,
            deleted_at: None,
            last_active: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        let mut batch = WriteBatch::new();
        batch.insert(&user).unwrap();
        self.repository.commit(batch).await.unwrap();
        user
    }

    pub async fn employee(&self, name: &str) -> User {
        self.seed_user(name, UserRole::Employee, None, AssetUsage::Company).await
    }

    pub async fn personal_employee(&self, name: &str) -> User {
        self.seed_user(name, UserRole::Employee, None, AssetUsage::Personal).await
    }

    pub async fn admin_with(&self, name: &str, role: AdminRole) -> User {
        self.seed_user(name, UserRole::Admin, Some(role), AssetUsage::Company).await
    }

    pub async fn register(&self, code: &str, category: InventoryCategory) -> Asset {
        self.services
            .assets
            .register(
                &self.admin,
                RegisterAsset {
                    asset_code: code.to_string(),
                    inventory_category: category,
                    asset_type: None,
                    brand: Some("Lenovo".to_string()),
                    model: Some("T14".to_string()),
                    serial_number: Some(format!("SN-{}", code)),
                    status: None,
                    purchase_date: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
                    purchase_value: Decimal::new(60000, 0),
                },
            )
            .await
            .unwrap()
    }

    pub async fn laptop(&self, code: &str) -> Asset {
        self.register(code, InventoryCategory::Asset).await
    }

    pub async fn user(&self, id: Uuid) -> User {
        self.repository.require::<User>(&id.to_string()).await.unwrap().into_inner()
    }

    pub async fn asset(&self, id: Uuid) -> Asset {
        self.repository.require::<Asset>(&id.to_string()).await.unwrap().into_inner()
    }

    /// Audit actions in the order they were recorded
    pub async fn audit_actions(&self) -> Vec<AuditAction> {
        self.repository
            .list::<AuditLog>()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.action)
            .collect()
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use assetdesk_server::services::clock::Clock;
        self.clock.now()
    }
}

fn placeholder_user() -> User {
    let now = start_time();
    User {
        id: Uuid::nil(),
        name: String::new(),
        email: String::new(),
        password_hash: String::new(),
        role: UserRole::Admin,
        admin_role: None,
        permissions: PermissionMatrix::default(),
        asset_usage: AssetUsage::Company,
        mobile: None,
        employee_id: None,
        location: None,
        department: None,
        is_active: true,
        is_deleted: false,
        delete_reason: None,
        deleted_at: None,
        last_active: None,
        created_by: None,
        created_at: now,
        updated_at: now,
    }
}
