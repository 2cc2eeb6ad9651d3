//! Maintenance record endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        asset_service::{CreateAssetService, ServiceQuery, UpdateAssetService},
        AssetService,
    },
};

use super::AuthenticatedUser;

#[derive(Serialize, ToSchema)]
pub struct ResyncResponse {
    /// Number of assets whose counters were corrected
    pub corrected: usize,
}

/// List maintenance records
#[utoipa::path(
    get,
    path = "/services",
    tag = "services",
    security(("bearer_auth" = [])),
    params(ServiceQuery),
    responses(
        (status = 200, description = "Maintenance records", body = Vec<AssetService>)
    )
)]
pub async fn list_services(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ServiceQuery>,
) -> AppResult<Json<Vec<AssetService>>> {
    let services = state.services.maintenance.list(&user, &query).await?;
    Ok(Json(services))
}

/// Record a maintenance intervention
#[utoipa::path(
    post,
    path = "/services",
    tag = "services",
    security(("bearer_auth" = [])),
    request_body = CreateAssetService,
    responses(
        (status = 201, description = "Record created", body = AssetService),
        (status = 409, description = "Asset is decommissioned")
    )
)]
pub async fn create_service(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<CreateAssetService>,
) -> AppResult<(StatusCode, Json<AssetService>)> {
    let record = state.services.maintenance.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Update a maintenance record
#[utoipa::path(
    put,
    path = "/services/{id}",
    tag = "services",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Service record ID")),
    request_body = UpdateAssetService,
    responses(
        (status = 200, description = "Record updated", body = AssetService),
        (status = 404, description = "Record not found")
    )
)]
pub async fn update_service(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAssetService>,
) -> AppResult<Json<AssetService>> {
    let record = state.services.maintenance.update(&user, id, request).await?;
    Ok(Json(record))
}

/// Delete a maintenance record
#[utoipa::path(
    delete,
    path = "/services/{id}",
    tag = "services",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Service record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn delete_service(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.maintenance.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Recompute every asset's service counters
#[utoipa::path(
    post,
    path = "/services/resync",
    tag = "services",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Counters recomputed", body = ResyncResponse)
    )
)]
pub async fn resync_counters(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<ResyncResponse>> {
    let corrected = state.services.maintenance.resync_counters(&user).await?;
    Ok(Json(ResyncResponse { corrected }))
}
