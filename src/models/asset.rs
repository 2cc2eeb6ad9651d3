//! Asset models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryCategory {
    /// Laptops and other primary computing devices
    Asset,
    Mouse,
    Accessory,
}

/// Asset lifecycle status. `Removed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    ReadyToUse,
    Spare,
    Assigned,
    PendingAudit,
    UnderRepair,
    Unrepairable,
    Stolen,
    Missing,
    EWaste,
    Removed,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::ReadyToUse => "READY_TO_USE",
            AssetStatus::Spare => "SPARE",
            AssetStatus::Assigned => "ASSIGNED",
            AssetStatus::PendingAudit => "PENDING_AUDIT",
            AssetStatus::UnderRepair => "UNDER_REPAIR",
            AssetStatus::Unrepairable => "UNREPAIRABLE",
            AssetStatus::Stolen => "STOLEN",
            AssetStatus::Missing => "MISSING",
            AssetStatus::EWaste => "E_WASTE",
            AssetStatus::Removed => "REMOVED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AssetStatus::Removed)
    }

    /// Statuses an asset may be returned into
    pub fn is_return_destination(&self) -> bool {
        matches!(
            self,
            AssetStatus::ReadyToUse
                | AssetStatus::Spare
                | AssetStatus::PendingAudit
                | AssetStatus::UnderRepair
        )
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Frozen record written when an asset is decommissioned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemovalData {
    pub audit_status: Option<String>,
    pub status_to_check: Option<String>,
    pub admin_removal_date: Option<NaiveDate>,
    pub reason: String,
    pub approved_by: String,
    pub condition_at_removal: Option<String>,
    pub value_at_removal: Decimal,
    pub proof_ref: Option<String>,
    pub remark: Option<String>,
    pub last_known_user: Option<Uuid>,
    pub last_known_user_name: Option<String>,
    pub removal_timestamp: DateTime<Utc>,
}

/// Stored asset record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    pub asset_code: String,
    pub inventory_category: InventoryCategory,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    pub status: AssetStatus,
    pub purchase_date: NaiveDate,
    pub purchase_value: Decimal,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_spare_assignment: bool,
    #[serde(default)]
    pub spare_return_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_services: u32,
    #[serde(default)]
    pub open_services: u32,
    #[serde(default)]
    pub closed_services: u32,
    #[serde(default)]
    pub last_service_date: Option<NaiveDate>,
    #[serde(default)]
    pub removal_data: Option<RemovalData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// A non-spare primary device, which PERSONAL-mode users may not hold
    pub fn is_restricted_holding(&self) -> bool {
        self.inventory_category == InventoryCategory::Asset && !self.is_spare_assignment
    }

    /// Drop every assignment field
    pub fn clear_assignment(&mut self) {
        self.assigned_to = None;
        self.assigned_at = None;
        self.is_spare_assignment = false;
        self.spare_return_date = None;
    }
}

/// Asset enriched with its computed valuation for display
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Asset,
    /// Current book value; hidden from employees when value display is disabled
    pub book_value: Option<Decimal>,
    pub age_months: i64,
    pub below_value_threshold: bool,
    /// Fully depreciated and flagged by the auto e-waste setting
    pub e_waste_candidate: bool,
}

/// Book value breakdown for a single asset
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetValuation {
    pub asset_id: Uuid,
    pub purchase_value: Decimal,
    pub book_value: Decimal,
    pub months_elapsed: i64,
    pub depreciation_rate: Decimal,
    pub is_depreciation_enabled: bool,
    pub currency_symbol: String,
}

/// Asset query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetQuery {
    pub category: Option<InventoryCategory>,
    pub status: Option<AssetStatus>,
    pub assigned_to: Option<Uuid>,
}

/// Register asset request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAsset {
    #[validate(length(min = 1, max = 64, message = "Asset code is required"))]
    pub asset_code: String,
    pub inventory_category: InventoryCategory,
    pub asset_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    /// Initial status (default READY_TO_USE)
    pub status: Option<AssetStatus>,
    pub purchase_date: NaiveDate,
    pub purchase_value: Decimal,
}

/// Descriptive fields that can be edited after registration
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetDetails {
    pub asset_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignAsset {
    pub user_id: Uuid,
    #[serde(default)]
    pub is_spare: bool,
    pub spare_return_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnAsset {
    pub destination_status: AssetStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetAssetStatus {
    pub status: AssetStatus,
}

/// Decommission request; system fields of the removal record are filled server side
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecommissionAsset {
    pub audit_status: Option<String>,
    pub status_to_check: Option<String>,
    pub admin_removal_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "A removal reason is required"))]
    pub reason: String,
    #[validate(length(min = 1, message = "Approver is required"))]
    pub approved_by: String,
    pub condition_at_removal: Option<String>,
    /// Defaults to the current book value
    pub value_at_removal: Option<Decimal>,
    pub proof_ref: Option<String>,
    pub remark: Option<String>,
}
