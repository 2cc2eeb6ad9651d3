//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{
        CreateAdmin, CreateEmployee, SetActive, SetAssetUsage, SoftDeleteUser, TogglePermission,
        UpdatePermissions, UpdateUser, UserQuery, UserResponse,
    },
};

use super::AuthenticatedUser;

/// List users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "List of users", body = Vec<UserResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let now = state.services.clock.now();
    let users = state.services.users.list_users(&user, &query).await?;
    Ok(Json(users.iter().map(|u| UserResponse::from_user(u, now)).collect()))
}

/// Create an employee
#[utoipa::path(
    post,
    path = "/users/employees",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = UserResponse),
        (status = 400, description = "Invalid input or email already in use")
    )
)]
pub async fn create_employee(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<CreateEmployee>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let created = state.services.users.create_employee(&user, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::from_user(&created, state.services.clock.now())),
    ))
}

/// Create an admin from a role preset
#[utoipa::path(
    post,
    path = "/users/admins",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateAdmin,
    responses(
        (status = 201, description = "Admin created", body = UserResponse),
        (status = 400, description = "Invalid input or email already in use")
    )
)]
pub async fn create_admin(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<CreateAdmin>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let created = state.services.users.create_admin(&user, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::from_user(&created, state.services.clock.now())),
    ))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let found = state.services.users.get_user(&user, id).await?;
    Ok(Json(UserResponse::from_user(&found, state.services.clock.now())))
}

/// Update profile fields of a user
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUser>,
) -> AppResult<Json<UserResponse>> {
    let updated = state.services.users.update_user(&user, id, request).await?;
    Ok(Json(UserResponse::from_user(&updated, state.services.clock.now())))
}

/// Replace the permission matrix of a user
#[utoipa::path(
    put,
    path = "/users/{id}/permissions",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdatePermissions,
    responses(
        (status = 200, description = "Permissions updated", body = UserResponse),
        (status = 400, description = "Inconsistent permission matrix")
    )
)]
pub async fn update_permissions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePermissions>,
) -> AppResult<Json<UserResponse>> {
    let updated = state
        .services
        .users
        .update_permissions(&user, id, request.permissions)
        .await?;
    Ok(Json(UserResponse::from_user(&updated, state.services.clock.now())))
}

/// Grant or revoke a single permission flag
#[utoipa::path(
    patch,
    path = "/users/{id}/permissions",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = TogglePermission,
    responses(
        (status = 200, description = "Permissions updated", body = UserResponse),
        (status = 409, description = "Own permissions cannot be changed")
    )
)]
pub async fn toggle_permission(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<TogglePermission>,
) -> AppResult<Json<UserResponse>> {
    let updated = state
        .services
        .users
        .toggle_permission(&user, id, request.module, request.action, request.granted)
        .await?;
    Ok(Json(UserResponse::from_user(&updated, state.services.clock.now())))
}

/// Switch a user between company and personal devices
#[utoipa::path(
    put,
    path = "/users/{id}/asset-usage",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = SetAssetUsage,
    responses(
        (status = 200, description = "Provisioning mode updated", body = UserResponse),
        (status = 422, description = "User still holds company hardware")
    )
)]
pub async fn set_asset_usage(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetAssetUsage>,
) -> AppResult<Json<UserResponse>> {
    let updated = state
        .services
        .byod
        .set_asset_usage(&user, id, request.asset_usage)
        .await?;
    Ok(Json(UserResponse::from_user(&updated, state.services.clock.now())))
}

/// Activate or deactivate a user
#[utoipa::path(
    put,
    path = "/users/{id}/active",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = SetActive,
    responses(
        (status = 200, description = "Status updated", body = UserResponse),
        (status = 409, description = "User still holds assets")
    )
)]
pub async fn set_active(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetActive>,
) -> AppResult<Json<UserResponse>> {
    let updated = state.services.users.set_active(&user, id, request.is_active).await?;
    Ok(Json(UserResponse::from_user(&updated, state.services.clock.now())))
}

/// Soft-delete an employee and release their assets
#[utoipa::path(
    post,
    path = "/users/{id}/soft-delete",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = SoftDeleteUser,
    responses(
        (status = 200, description = "User deleted", body = UserResponse),
        (status = 409, description = "User already deleted or not an employee")
    )
)]
pub async fn soft_delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SoftDeleteUser>,
) -> AppResult<Json<UserResponse>> {
    request.validate()?;
    let deleted = state.services.users.soft_delete(&user, id, &request.reason).await?;
    Ok(Json(UserResponse::from_user(&deleted, state.services.clock.now())))
}
