//! BYOD workflow endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        byod::{ByodApproval, ByodQuery, ByodReason, SubmitByodRequest},
        ByodEntry,
    },
};

use super::AuthenticatedUser;

/// List BYOD entries
#[utoipa::path(
    get,
    path = "/byod",
    tag = "byod",
    security(("bearer_auth" = [])),
    params(ByodQuery),
    responses(
        (status = 200, description = "BYOD entries", body = Vec<ByodEntry>)
    )
)]
pub async fn list_byod(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ByodQuery>,
) -> AppResult<Json<Vec<ByodEntry>>> {
    let entries = state.services.byod.list(&user, &query).await?;
    Ok(Json(entries))
}

/// Submit a BYOD request for the current user
#[utoipa::path(
    post,
    path = "/byod",
    tag = "byod",
    security(("bearer_auth" = [])),
    request_body = SubmitByodRequest,
    responses(
        (status = 201, description = "Request submitted", body = ByodEntry),
        (status = 409, description = "An outstanding or active entry already exists")
    )
)]
pub async fn submit_byod(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<SubmitByodRequest>,
) -> AppResult<(StatusCode, Json<ByodEntry>)> {
    let entry = state.services.byod.submit_request(&user, request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Approve a BYOD request and reclaim the user's company hardware
#[utoipa::path(
    post,
    path = "/byod/{id}/approve",
    tag = "byod",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "BYOD entry ID")),
    responses(
        (status = 200, description = "Request approved", body = ByodApproval),
        (status = 409, description = "Entry is not awaiting approval")
    )
)]
pub async fn approve_byod(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ByodApproval>> {
    let approval = state.services.byod.approve(&user, id).await?;
    Ok(Json(approval))
}

/// Reject a BYOD request
#[utoipa::path(
    post,
    path = "/byod/{id}/reject",
    tag = "byod",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "BYOD entry ID")),
    request_body = ByodReason,
    responses(
        (status = 200, description = "Request rejected", body = ByodEntry)
    )
)]
pub async fn reject_byod(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(reason): Json<ByodReason>,
) -> AppResult<Json<ByodEntry>> {
    let entry = state.services.byod.reject(&user, id, reason).await?;
    Ok(Json(entry))
}

/// Withdraw an active BYOD entry, by its owner or by an admin
#[utoipa::path(
    post,
    path = "/byod/{id}/retrieve",
    tag = "byod",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "BYOD entry ID")),
    request_body = ByodReason,
    responses(
        (status = 200, description = "Entry retrieved", body = ByodEntry)
    )
)]
pub async fn retrieve_byod(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(reason): Json<ByodReason>,
) -> AppResult<Json<ByodEntry>> {
    let entry = state.services.byod.retrieve(&user, id, reason).await?;
    Ok(Json(entry))
}
