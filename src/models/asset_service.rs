//! Maintenance (service) records attached to assets

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    CompletedClosed,
    UncompletedPending,
}

/// Stored maintenance record. Asset and user fields are denormalized at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetService {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub asset_code: String,
    pub asset_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub date_of_service: NaiveDate,
    pub date_of_close: Option<NaiveDate>,
    pub category: Option<String>,
    pub technician_name: Option<String>,
    pub summary: String,
    pub status: ServiceStatus,
    pub parts_cost: Decimal,
    pub invoice_reference: Option<String>,
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuery {
    pub asset_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetService {
    pub asset_id: Uuid,
    /// User the asset was serviced for (defaults to the current holder)
    pub user_id: Option<Uuid>,
    pub date_of_service: NaiveDate,
    pub category: Option<String>,
    pub technician_name: Option<String>,
    #[validate(length(min = 1, message = "Summary is required"))]
    pub summary: String,
    pub status: ServiceStatus,
    #[serde(default)]
    pub parts_cost: Decimal,
    pub invoice_reference: Option<String>,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetService {
    pub date_of_service: Option<NaiveDate>,
    pub category: Option<String>,
    pub technician_name: Option<String>,
    #[validate(length(min = 1, message = "Summary cannot be empty"))]
    pub summary: Option<String>,
    pub status: Option<ServiceStatus>,
    pub parts_cost: Option<Decimal>,
    pub invoice_reference: Option<String>,
    pub conclusion: Option<String>,
}

/// Counters recomputed onto an asset from its service records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceCounters {
    pub total: u32,
    pub open: u32,
    pub closed: u32,
    pub last_service_date: Option<NaiveDate>,
}
