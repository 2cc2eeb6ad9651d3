//! Audit log endpoint

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{audit::AuditQuery, AuditLog},
};

use super::AuthenticatedUser;

/// Most recent audit entries, newest first
#[utoipa::path(
    get,
    path = "/audit-logs",
    tag = "audit",
    security(("bearer_auth" = [])),
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit entries", body = Vec<AuditLog>),
        (status = 403, description = "Missing admin.read")
    )
)]
pub async fn list_audit_logs(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<Vec<AuditLog>>> {
    let logs = state.services.audit.list(&user, query.limit).await?;
    Ok(Json(logs))
}
