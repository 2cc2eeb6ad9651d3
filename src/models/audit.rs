//! Audit log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Number of most recent entries kept in the audit log
pub const AUDIT_LOG_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    AssetCreate,
    AssetUpdate,
    AssetAssign,
    AssetReturn,
    AssetStatusChange,
    AssetDecommission,
    ServiceCreate,
    ServiceUpdate,
    ServiceDelete,
    ServiceCountersResync,
    ByodRequestSubmitted,
    ByodPolicyApproved,
    ByodRejected,
    ByodAdminOverride,
    ByodRetrievalRequest,
    AssetUsageToggle,
    EmployeeCreate,
    EmployeeUpdate,
    EmployeeStatusToggle,
    EmployeeSoftDelete,
    AdminCreate,
    AdminUpdate,
    PermissionsUpdate,
    SettingChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub action: AuditAction,
    pub performed_by: Uuid,
    pub performed_by_name: String,
    pub target_id: Option<String>,
    pub target_name: Option<String>,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct AuditQuery {
    /// Maximum number of entries to return, newest first
    pub limit: Option<usize>,
}
