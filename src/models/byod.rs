//! BYOD (bring your own device) registrations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ByodStatus {
    Pending,
    AwaitingApproval,
    Active,
    Rejected,
    RetrievedByEmployee,
    RetrievedByAdmin,
    InactiveSwitchedToCompany,
}

impl ByodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ByodStatus::Pending => "PENDING",
            ByodStatus::AwaitingApproval => "AWAITING_APPROVAL",
            ByodStatus::Active => "ACTIVE",
            ByodStatus::Rejected => "REJECTED",
            ByodStatus::RetrievedByEmployee => "RETRIEVED_BY_EMPLOYEE",
            ByodStatus::RetrievedByAdmin => "RETRIEVED_BY_ADMIN",
            ByodStatus::InactiveSwitchedToCompany => "INACTIVE_SWITCHED_TO_COMPANY",
        }
    }

    /// A request that has not been decided yet
    pub fn is_outstanding(&self) -> bool {
        matches!(self, ByodStatus::Pending | ByodStatus::AwaitingApproval)
    }

    pub fn can_transition_to(&self, next: ByodStatus) -> bool {
        use ByodStatus::*;
        matches!(
            (self, next),
            (Pending, AwaitingApproval)
                | (AwaitingApproval, Active)
                | (AwaitingApproval, Rejected)
                | (Active, RetrievedByEmployee)
                | (Active, RetrievedByAdmin)
                | (Active, InactiveSwitchedToCompany)
        )
    }
}

impl std::fmt::Display for ByodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeType {
    Permanent,
    Contract,
    Intern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    Laptop,
    Mobile,
    Tablet,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ByodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub employee_name: String,
    pub email: String,
    pub employee_type: EmployeeType,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub device_type: DeviceType,
    pub brand: String,
    pub model: String,
    pub serial_number: String,
    pub os_version: Option<String>,
    pub imei_mac: Option<String>,
    pub agreement_accepted: bool,
    pub status: ByodStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub retrieved_at: Option<DateTime<Utc>>,
    pub retrieval_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ByodQuery {
    pub status: Option<ByodStatus>,
}

/// Device details submitted by the employee
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitByodRequest {
    pub employee_type: EmployeeType,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub device_type: DeviceType,
    #[validate(length(min = 1, message = "Brand is required"))]
    pub brand: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    #[validate(length(min = 1, message = "Serial number is required"))]
    pub serial_number: String,
    pub os_version: Option<String>,
    pub imei_mac: Option<String>,
    pub agreement_accepted: bool,
}

/// Reason given when rejecting or retrieving an entry
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ByodReason {
    #[validate(length(min = 3, max = 500, message = "A reason of 3 to 500 characters is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ByodApproval {
    pub entry: ByodEntry,
    pub reclaimed_asset_ids: Vec<Uuid>,
}
