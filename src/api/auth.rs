//! Authentication endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{user::UserResponse, Action, Module},
    services::permissions::can_perform,
};

use super::AuthenticatedUser;

#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct CanQuery {
    pub module: Module,
    pub action: Action,
}

#[derive(Serialize, ToSchema)]
pub struct CanResponse {
    pub allowed: bool,
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    request.validate()?;

    let (token, user) = state
        .services
        .users
        .authenticate(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.auth.jwt_expiration_hours * 3600,
        user: UserResponse::from_user(&user, state.services.clock.now()),
    }))
}

/// Current user
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(UserResponse::from_user(&user, state.services.clock.now())))
}

/// Presence heartbeat
#[utoipa::path(
    post,
    path = "/auth/heartbeat",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Presence recorded", body = UserResponse)
    )
)]
pub async fn heartbeat(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.users.heartbeat(&user).await?;
    Ok(Json(UserResponse::from_user(&user, state.services.clock.now())))
}

/// Whether the current user may perform `action` on `module`
#[utoipa::path(
    get,
    path = "/auth/can",
    tag = "auth",
    security(("bearer_auth" = [])),
    params(CanQuery),
    responses(
        (status = 200, description = "Permission check result", body = CanResponse)
    )
)]
pub async fn can(
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<CanQuery>,
) -> Json<CanResponse> {
    Json(CanResponse {
        allowed: can_perform(&user, query.module, query.action),
    })
}
