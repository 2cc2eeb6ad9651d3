//! Global application settings

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::asset::AssetStatus;

/// Single settings document; missing keys fall back to defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Monthly straight-line depreciation, in percent
    pub depreciation_rate: Decimal,
    pub currency_symbol: String,
    pub is_depreciation_enabled: bool,
    pub round_to_nearest_integer: bool,
    pub min_asset_value_threshold: Decimal,
    pub auto_mark_e_waste: bool,
    /// Where held assets go when their holder is soft-deleted
    pub default_asset_status: AssetStatus,
    pub allow_raise_byod_request: bool,
    pub allow_view_asset_value: bool,
    pub enable_notifications: bool,
    pub notify_on_status_change: bool,
    pub notify_on_assignment: bool,
    pub admin_email_for_notifications: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            depreciation_rate: Decimal::new(277, 2),
            currency_symbol: "₹".to_string(),
            is_depreciation_enabled: true,
            round_to_nearest_integer: true,
            min_asset_value_threshold: Decimal::new(500, 0),
            auto_mark_e_waste: false,
            default_asset_status: AssetStatus::Spare,
            allow_raise_byod_request: true,
            allow_view_asset_value: false,
            enable_notifications: true,
            notify_on_status_change: true,
            notify_on_assignment: true,
            admin_email_for_notifications: "it-support@company.com".to_string(),
            last_updated: None,
        }
    }
}

/// Partial settings update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettings {
    pub depreciation_rate: Option<Decimal>,
    #[validate(length(min = 1, max = 8, message = "Currency symbol must be 1-8 characters"))]
    pub currency_symbol: Option<String>,
    pub is_depreciation_enabled: Option<bool>,
    pub round_to_nearest_integer: Option<bool>,
    pub min_asset_value_threshold: Option<Decimal>,
    pub auto_mark_e_waste: Option<bool>,
    pub default_asset_status: Option<AssetStatus>,
    pub allow_raise_byod_request: Option<bool>,
    pub allow_view_asset_value: Option<bool>,
    pub enable_notifications: Option<bool>,
    pub notify_on_status_change: Option<bool>,
    pub notify_on_assignment: Option<bool>,
    #[validate(email(message = "Invalid notification email"))]
    pub admin_email_for_notifications: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_uses_defaults() {
        let settings: Settings =
            serde_json::from_value(serde_json::json!({ "roundToNearestInteger": false })).unwrap();
        assert!(!settings.round_to_nearest_integer);
        assert_eq!(settings.depreciation_rate, Decimal::new(277, 2));
        assert_eq!(settings.default_asset_status, AssetStatus::Spare);
    }
}
