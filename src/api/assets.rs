//! Asset lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        asset::{
            AssetQuery, AssetValuation, AssetView, AssignAsset, DecommissionAsset, RegisterAsset,
            ReturnAsset, SetAssetStatus, UpdateAssetDetails,
        },
        Asset, AssetHistory,
    },
};

use super::AuthenticatedUser;

/// List assets
#[utoipa::path(
    get,
    path = "/assets",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(AssetQuery),
    responses(
        (status = 200, description = "Assets with their current book value", body = Vec<AssetView>),
        (status = 403, description = "Missing assets.read")
    )
)]
pub async fn list_assets(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<AssetQuery>,
) -> AppResult<Json<Vec<AssetView>>> {
    let assets = state.services.assets.list_assets(&user, &query).await?;
    Ok(Json(assets))
}

/// Register a new asset
#[utoipa::path(
    post,
    path = "/assets",
    tag = "assets",
    security(("bearer_auth" = [])),
    request_body = RegisterAsset,
    responses(
        (status = 201, description = "Asset registered", body = Asset),
        (status = 400, description = "Invalid input or duplicate asset code")
    )
)]
pub async fn register_asset(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<RegisterAsset>,
) -> AppResult<(StatusCode, Json<Asset>)> {
    let asset = state.services.assets.register(&user, request).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// Removed Assets Register
#[utoipa::path(
    get,
    path = "/assets/removed",
    tag = "assets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Decommissioned assets", body = Vec<AssetView>)
    )
)]
pub async fn list_removed_assets(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<AssetView>>> {
    let assets = state.services.assets.list_removed(&user).await?;
    Ok(Json(assets))
}

/// Get asset details
#[utoipa::path(
    get,
    path = "/assets/{id}",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset details", body = AssetView),
        (status = 404, description = "Asset not found")
    )
)]
pub async fn get_asset(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AssetView>> {
    let asset = state.services.assets.get_asset(&user, id).await?;
    Ok(Json(asset))
}

/// Edit descriptive fields
#[utoipa::path(
    put,
    path = "/assets/{id}",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = UpdateAssetDetails,
    responses(
        (status = 200, description = "Asset updated", body = Asset),
        (status = 409, description = "Asset is decommissioned")
    )
)]
pub async fn update_asset(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAssetDetails>,
) -> AppResult<Json<Asset>> {
    let asset = state.services.assets.update_details(&user, id, request).await?;
    Ok(Json(asset))
}

/// Assign an asset to a user
#[utoipa::path(
    post,
    path = "/assets/{id}/assign",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = AssignAsset,
    responses(
        (status = 200, description = "Asset assigned", body = Asset),
        (status = 409, description = "Asset not assignable"),
        (status = 422, description = "Assignment violates the provisioning policy")
    )
)]
pub async fn assign_asset(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignAsset>,
) -> AppResult<Json<Asset>> {
    let asset = state.services.assets.assign(&user, id, request).await?;
    Ok(Json(asset))
}

/// Return an assigned asset
#[utoipa::path(
    post,
    path = "/assets/{id}/return",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = ReturnAsset,
    responses(
        (status = 200, description = "Asset returned", body = Asset),
        (status = 409, description = "Asset is not assigned or destination is invalid")
    )
)]
pub async fn return_asset(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ReturnAsset>,
) -> AppResult<Json<Asset>> {
    let asset = state.services.assets.return_asset(&user, id, request).await?;
    Ok(Json(asset))
}

/// Manual status transition
#[utoipa::path(
    put,
    path = "/assets/{id}/status",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = SetAssetStatus,
    responses(
        (status = 200, description = "Status changed", body = Asset),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn set_asset_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetAssetStatus>,
) -> AppResult<Json<Asset>> {
    let asset = state.services.assets.set_status(&user, id, request.status).await?;
    Ok(Json(asset))
}

/// Decommission an asset
#[utoipa::path(
    post,
    path = "/assets/{id}/decommission",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = DecommissionAsset,
    responses(
        (status = 200, description = "Asset decommissioned", body = Asset),
        (status = 409, description = "Asset already removed")
    )
)]
pub async fn decommission_asset(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<DecommissionAsset>,
) -> AppResult<Json<Asset>> {
    let asset = state.services.assets.decommission(&user, id, request).await?;
    Ok(Json(asset))
}

/// Assignment history of an asset
#[utoipa::path(
    get,
    path = "/assets/{id}/history",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "History entries, oldest first", body = Vec<AssetHistory>)
    )
)]
pub async fn asset_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<AssetHistory>>> {
    let history = state.services.assets.history(&user, id).await?;
    Ok(Json(history))
}

/// Current book value
#[utoipa::path(
    get,
    path = "/assets/{id}/value",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Valuation breakdown", body = AssetValuation)
    )
)]
pub async fn asset_value(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AssetValuation>> {
    let valuation = state.services.assets.valuation(&user, id).await?;
    Ok(Json(valuation))
}
