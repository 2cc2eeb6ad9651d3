//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{assets, audit, auth, byod, health, maintenance, me, settings, users};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AssetDesk API",
        version = "0.4.0",
        description = "IT asset lifecycle and BYOD policy REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        auth::heartbeat,
        auth::can,
        // Assets
        assets::list_assets,
        assets::register_asset,
        assets::list_removed_assets,
        assets::get_asset,
        assets::update_asset,
        assets::assign_asset,
        assets::return_asset,
        assets::set_asset_status,
        assets::decommission_asset,
        assets::asset_history,
        assets::asset_value,
        // Maintenance
        maintenance::list_services,
        maintenance::create_service,
        maintenance::update_service,
        maintenance::delete_service,
        maintenance::resync_counters,
        // BYOD
        byod::list_byod,
        byod::submit_byod,
        byod::approve_byod,
        byod::reject_byod,
        byod::retrieve_byod,
        // Users
        users::list_users,
        users::create_employee,
        users::create_admin,
        users::get_user,
        users::update_user,
        users::update_permissions,
        users::toggle_permission,
        users::set_asset_usage,
        users::set_active,
        users::soft_delete_user,
        // Self service
        me::my_assets,
        me::my_services,
        me::my_byod,
        // Settings & audit
        settings::get_settings,
        settings::update_settings,
        audit::list_audit_logs,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::CanQuery,
            auth::CanResponse,
            // Permissions
            crate::models::Module,
            crate::models::Action,
            crate::models::ModuleAccess,
            crate::models::PermissionMatrix,
            crate::models::AdminRole,
            // Users
            crate::models::user::UserRole,
            crate::models::user::AssetUsage,
            crate::models::user::UserResponse,
            crate::models::user::UserQuery,
            crate::models::user::CreateEmployee,
            crate::models::user::CreateAdmin,
            crate::models::user::UpdateUser,
            crate::models::user::UpdatePermissions,
            crate::models::user::TogglePermission,
            crate::models::user::SetAssetUsage,
            crate::models::user::SetActive,
            crate::models::user::SoftDeleteUser,
            // Assets
            crate::models::asset::InventoryCategory,
            crate::models::asset::AssetStatus,
            crate::models::asset::RemovalData,
            crate::models::asset::Asset,
            crate::models::asset::AssetView,
            crate::models::asset::AssetValuation,
            crate::models::asset::AssetQuery,
            crate::models::asset::RegisterAsset,
            crate::models::asset::UpdateAssetDetails,
            crate::models::asset::AssignAsset,
            crate::models::asset::ReturnAsset,
            crate::models::asset::SetAssetStatus,
            crate::models::asset::DecommissionAsset,
            crate::models::history::HistoryKind,
            crate::models::history::AssetHistory,
            // Maintenance
            crate::models::asset_service::ServiceStatus,
            crate::models::asset_service::AssetService,
            crate::models::asset_service::CreateAssetService,
            crate::models::asset_service::UpdateAssetService,
            maintenance::ResyncResponse,
            // BYOD
            crate::models::byod::ByodStatus,
            crate::models::byod::EmployeeType,
            crate::models::byod::DeviceType,
            crate::models::byod::ByodEntry,
            crate::models::byod::SubmitByodRequest,
            crate::models::byod::ByodReason,
            crate::models::byod::ByodApproval,
            // Settings & audit
            crate::models::settings::Settings,
            crate::models::settings::UpdateSettings,
            crate::models::audit::AuditAction,
            crate::models::audit::AuditLog,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "assets", description = "Asset lifecycle"),
        (name = "services", description = "Maintenance records"),
        (name = "byod", description = "Bring-your-own-device workflow"),
        (name = "users", description = "User administration"),
        (name = "me", description = "Self service"),
        (name = "settings", description = "Global settings"),
        (name = "audit", description = "Audit log")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
