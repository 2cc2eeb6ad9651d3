//! User models and JWT claims

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::permissions::{Action, AdminRole, Module, PermissionMatrix};

/// Seconds after the last heartbeat during which a user counts as online
pub const PRESENCE_WINDOW_SECS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Employee,
}

/// Provisioning mode: company-issued hardware or the employee's own (BYOD)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetUsage {
    #[default]
    Company,
    Personal,
}

impl AssetUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetUsage::Company => "COMPANY",
            AssetUsage::Personal => "PERSONAL",
        }
    }
}

/// Stored user record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub role: UserRole,
    #[serde(default)]
    pub admin_role: Option<AdminRole>,
    #[serde(default)]
    pub permissions: PermissionMatrix,
    #[serde(default)]
    pub asset_usage: AssetUsage,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub delete_reason: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Loaded from the presence collection, never stored with the user
    #[serde(skip)]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Deleted users are never active, so this is the single login gate
    pub fn can_sign_in(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    pub fn is_online(&self, now: DateTime<Utc>) -> bool {
        self.last_active
            .map(|seen| now - seen <= Duration::seconds(PRESENCE_WINDOW_SECS))
            .unwrap_or(false)
    }
}

/// Last heartbeat of a user. Kept apart from the user record so presence
/// updates do not change the user's revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub user_id: Uuid,
    pub last_active: DateTime<Utc>,
}

/// User as exposed through the API (no password hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub admin_role: Option<AdminRole>,
    pub permissions: PermissionMatrix,
    pub asset_usage: AssetUsage,
    pub mobile: Option<String>,
    pub employee_id: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub delete_reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
    pub is_online: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            admin_role: user.admin_role,
            permissions: user.permissions.clone(),
            asset_usage: user.asset_usage,
            mobile: user.mobile.clone(),
            employee_id: user.employee_id.clone(),
            location: user.location.clone(),
            department: user.department.clone(),
            is_active: user.is_active,
            is_deleted: user.is_deleted,
            delete_reason: user.delete_reason.clone(),
            deleted_at: user.deleted_at,
            last_active: user.last_active,
            is_online: user.is_online(now),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// User query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub role: Option<UserRole>,
    /// Include soft-deleted users (default false)
    pub include_deleted: Option<bool>,
}

/// Create employee request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub mobile: Option<String>,
    pub employee_id: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    /// Initial provisioning mode (default COMPANY)
    pub asset_usage: Option<AssetUsage>,
}

/// Create admin request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdmin {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub admin_role: AdminRole,
    pub mobile: Option<String>,
}

/// Update user request; provisioning mode is changed through its own endpoint
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    pub mobile: Option<String>,
    pub employee_id: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissions {
    pub permissions: PermissionMatrix,
}

/// Grant or revoke one flag of a user's matrix
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TogglePermission {
    pub module: Module,
    pub action: Action,
    pub granted: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetAssetUsage {
    pub asset_usage: AssetUsage,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetActive {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SoftDeleteUser {
    #[validate(length(min = 3, message = "A deletion reason is required"))]
    pub reason: String,
}

/// JWT Claims for authenticated users.
///
/// Only identity is carried; permissions are always read from the stored user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: Uuid,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Priya".to_string(),
            email: "priya@example.com".to_string(),
            password_hash: String::new(),
            role: UserRole::Employee,
            admin_role: None,
            permissions: PermissionMatrix::employee_default(),
            asset_usage: AssetUsage::Company,
            mobile: None,
            employee_id: None,
            location: None,
            department: None,
            is_active: true,
            is_deleted: false,
            delete_reason: None,
            deleted_at: None,
            last_active: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_presence_window() {
        let now = Utc::now();
        let mut user = sample_user();
        assert!(!user.is_online(now));

        user.last_active = Some(now - Duration::seconds(30));
        assert!(user.is_online(now));

        user.last_active = Some(now - Duration::seconds(31));
        assert!(!user.is_online(now));
    }

    #[test]
    fn test_token_round_trip() {
        let user = sample_user();
        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        };
        let token = claims.create_token("secret").unwrap();
        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, user.id);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_stored_user_keeps_hash_but_response_does_not() {
        let mut user = sample_user();
        user.password_hash = "$argon2id$stub".to_string();

        let stored = serde_json::to_value(&user).unwrap();
        assert_eq!(stored["passwordHash"], "$argon2id$stub");

        let response = serde_json::to_value(UserResponse::from_user(&user, Utc::now())).unwrap();
        assert!(response.get("passwordHash").is_none());
        assert_eq!(response["assetUsage"], "COMPANY");
    }
}
