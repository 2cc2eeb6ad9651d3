//! Settings endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{settings::UpdateSettings, Settings},
};

use super::AuthenticatedUser;

/// Get current settings
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current settings", body = Settings)
    )
)]
pub async fn get_settings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Settings>> {
    let settings = state.services.settings.get_settings(&user).await?;
    Ok(Json(settings))
}

/// Update settings
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Updated settings", body = Settings),
        (status = 400, description = "Invalid value")
    )
)]
pub async fn update_settings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<UpdateSettings>,
) -> AppResult<Json<Settings>> {
    let settings = state.services.settings.update_settings(&user, request).await?;
    Ok(Json(settings))
}
