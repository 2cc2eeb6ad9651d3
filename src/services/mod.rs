//! Business logic services

pub mod assets;
pub mod audit;
pub mod byod;
pub mod clock;
pub mod maintenance;
pub mod notifications;
pub mod permissions;
pub mod policy;
pub mod service_counters;
pub mod settings;
pub mod users;
pub mod valuation;

use std::sync::Arc;

use crate::{config::AuthConfig, repository::Repository};

use self::{clock::Clock, notifications::Notifier};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub assets: assets::AssetsService,
    pub byod: byod::ByodService,
    pub maintenance: maintenance::MaintenanceService,
    pub settings: settings::SettingsService,
    pub audit: audit::AuditService,
    pub notifications: notifications::NotificationService,
    pub clock: Arc<dyn Clock>,
    pub repository: Repository,
}

impl Services {
    /// Create all services sharing one repository, clock and notifier
    pub fn new(
        repository: Repository,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        auth_config: AuthConfig,
    ) -> Self {
        let audit = audit::AuditService::new(repository.clone(), clock.clone());
        let settings = settings::SettingsService::new(repository.clone(), audit.clone(), clock.clone());
        let notifications = notifications::NotificationService::new(notifier);

        Self {
            users: users::UsersService::new(
                repository.clone(),
                audit.clone(),
                settings.clone(),
                auth_config,
                clock.clone(),
            ),
            assets: assets::AssetsService::new(
                repository.clone(),
                audit.clone(),
                settings.clone(),
                notifications.clone(),
                clock.clone(),
            ),
            byod: byod::ByodService::new(repository.clone(), audit.clone(), settings.clone(), clock.clone()),
            maintenance: maintenance::MaintenanceService::new(repository.clone(), audit.clone(), clock.clone()),
            settings,
            audit,
            notifications,
            clock,
            repository,
        }
    }
}
