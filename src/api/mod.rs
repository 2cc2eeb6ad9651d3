//! API handlers for AssetDesk REST endpoints

pub mod assets;
pub mod audit;
pub mod auth;
pub mod byod;
pub mod health;
pub mod maintenance;
pub mod me;
pub mod openapi;
pub mod settings;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::{user::UserClaims, User},
    AppState,
};

/// Extractor for the authenticated user.
///
/// The token only identifies the user; the stored record is re-read on every
/// request so deactivation and permission changes apply immediately.
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        let user = state.services.users.resolve_session(&claims).await?;
        Ok(AuthenticatedUser(user))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/heartbeat", post(auth::heartbeat))
        .route("/auth/can", get(auth::can))
        // Assets
        .route("/assets", get(assets::list_assets).post(assets::register_asset))
        .route("/assets/removed", get(assets::list_removed_assets))
        .route("/assets/:id", get(assets::get_asset).put(assets::update_asset))
        .route("/assets/:id/assign", post(assets::assign_asset))
        .route("/assets/:id/return", post(assets::return_asset))
        .route("/assets/:id/status", put(assets::set_asset_status))
        .route("/assets/:id/decommission", post(assets::decommission_asset))
        .route("/assets/:id/history", get(assets::asset_history))
        .route("/assets/:id/value", get(assets::asset_value))
        // Maintenance records
        .route("/services", get(maintenance::list_services).post(maintenance::create_service))
        .route("/services/resync", post(maintenance::resync_counters))
        .route(
            "/services/:id",
            put(maintenance::update_service).delete(maintenance::delete_service),
        )
        // BYOD
        .route("/byod", get(byod::list_byod).post(byod::submit_byod))
        .route("/byod/:id/approve", post(byod::approve_byod))
        .route("/byod/:id/reject", post(byod::reject_byod))
        .route("/byod/:id/retrieve", post(byod::retrieve_byod))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/employees", post(users::create_employee))
        .route("/users/admins", post(users::create_admin))
        .route("/users/:id", get(users::get_user).put(users::update_user))
        .route(
            "/users/:id/permissions",
            put(users::update_permissions).patch(users::toggle_permission),
        )
        .route("/users/:id/asset-usage", put(users::set_asset_usage))
        .route("/users/:id/active", put(users::set_active))
        .route("/users/:id/soft-delete", post(users::soft_delete_user))
        // Self service
        .route("/me/assets", get(me::my_assets))
        .route("/me/services", get(me::my_services))
        .route("/me/byod", get(me::my_byod))
        // Settings & audit
        .route("/settings", get(settings::get_settings).put(settings::update_settings))
        .route("/audit-logs", get(audit::list_audit_logs))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
