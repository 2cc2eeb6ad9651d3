//! Self-service endpoints for the signed-in user

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{asset::AssetView, AssetService, ByodEntry},
};

use super::AuthenticatedUser;

/// Assets currently held by the caller
#[utoipa::path(
    get,
    path = "/me/assets",
    tag = "me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Held assets", body = Vec<AssetView>)
    )
)]
pub async fn my_assets(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<AssetView>>> {
    let assets = state.services.assets.my_assets(&user).await?;
    Ok(Json(assets))
}

/// Maintenance records raised for the caller
#[utoipa::path(
    get,
    path = "/me/services",
    tag = "me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Maintenance records", body = Vec<AssetService>)
    )
)]
pub async fn my_services(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<AssetService>>> {
    let services = state.services.maintenance.my_services(&user).await?;
    Ok(Json(services))
}

/// The caller's BYOD entries
#[utoipa::path(
    get,
    path = "/me/byod",
    tag = "me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "BYOD entries", body = Vec<ByodEntry>)
    )
)]
pub async fn my_byod(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<ByodEntry>>> {
    let entries = state.services.byod.my_entries(&user).await?;
    Ok(Json(entries))
}
