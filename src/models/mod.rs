//! Data models for AssetDesk

pub mod asset;
pub mod asset_service;
pub mod audit;
pub mod byod;
pub mod history;
pub mod permissions;
pub mod settings;
pub mod user;

pub use asset::{Asset, AssetStatus, InventoryCategory};
pub use asset_service::{AssetService, ServiceStatus};
pub use audit::{AuditAction, AuditLog};
pub use byod::{ByodEntry, ByodStatus};
pub use history::{AssetHistory, HistoryKind};
pub use permissions::{Action, AdminRole, Module, ModuleAccess, PermissionMatrix};
pub use settings::Settings;
pub use user::{AssetUsage, User, UserRole};
