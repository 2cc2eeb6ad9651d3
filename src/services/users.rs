//! Authentication and user administration service

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;
use validator::Validate;

use super::{
    assets::stage_release,
    audit::{AuditService, AuditTarget},
    clock::Clock,
    permissions::ensure_permission,
    settings::SettingsService,
};
use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        user::{CreateAdmin, CreateEmployee, Presence, UpdateUser, UserClaims, UserQuery},
        Action, AdminRole, Asset, AssetStatus, AssetUsage, AuditAction, Module, PermissionMatrix, User,
        UserRole,
    },
    repository::{Repository, Versioned, WriteBatch},
};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    audit: AuditService,
    settings: SettingsService,
    config: AuthConfig,
    clock: Arc<dyn Clock>,
}

impl UsersService {
    pub fn new(
        repository: Repository,
        audit: AuditService,
        settings: SettingsService,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            audit,
            settings,
            config,
            clock,
        }
    }

    /// Authenticate by email and password and return a JWT with the user
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let email = normalize_email(email);
        let user = self
            .repository
            .list_where::<User, _>(|u| u.email == email && !u.is_deleted)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user.password_hash, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }
        if !user.is_active {
            return Err(AppError::Authentication("Account is deactivated".to_string()));
        }

        let token = self.create_token(&user)?;
        tracing::info!(user = %user.id, "User signed in");
        Ok((token, user.into_inner()))
    }

    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let now = self.clock.now().timestamp();
        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };
        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Load the current state of the user a token was issued to
    pub async fn resolve_session(&self, claims: &UserClaims) -> AppResult<User> {
        let user = self
            .repository
            .get::<User>(&claims.user_id.to_string())
            .await?
            .ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))?;
        if !user.can_sign_in() {
            return Err(AppError::Authentication("Account is deactivated".to_string()));
        }
        self.with_presence(user.into_inner()).await
    }

    async fn with_presence(&self, mut user: User) -> AppResult<User> {
        user.last_active = self
            .repository
            .get::<Presence>(&user.id.to_string())
            .await?
            .map(|p| p.last_active);
        Ok(user)
    }

    /// Create the first super admin when no user exists
    pub async fn bootstrap_admin(&self) -> AppResult<Option<User>> {
        if !self.repository.list::<User>().await?.is_empty() {
            return Ok(None);
        }

        let now = self.clock.now();
        let admin = User {
            id: Uuid::new_v4(),
            name: self.config.bootstrap_admin_name.clone(),
            email: normalize_email(&self.config.bootstrap_admin_email),
            password_hash: hash_password(&self.config.bootstrap_admin_password)?,
            role: UserRole::Admin,
            admin_role: Some(AdminRole::SuperAdmin),
            permissions: AdminRole::SuperAdmin.preset(),
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
        };

        let mut batch = WriteBatch::new();
        batch.insert(&admin)?;
        self.audit.stage(
            &mut batch,
            &admin,
            AuditAction::AdminCreate,
            Some(AuditTarget::user(&admin)),
            "Bootstrap super admin created",
        )?;
        self.repository.commit(batch).await?;

        tracing::warn!(email = %admin.email, "Created bootstrap super admin; change its password");
        Ok(Some(admin))
    }

    async fn ensure_email_available(&self, email: &str, except: Option<Uuid>) -> AppResult<()> {
        let taken = self
            .repository
            .list_where::<User, _>(|u| u.email == email && Some(u.id) != except)
            .await?;
        if taken.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!("Email {} is already in use", email)))
        }
    }

    /// Module governing administration of `target`
    fn managing_module(target: &User) -> Module {
        if target.is_admin() {
            Module::Admin
        } else {
            Module::Employees
        }
    }

    pub async fn create_employee(&self, actor: &User, request: CreateEmployee) -> AppResult<User> {
        ensure_permission(actor, Module::Employees, Action::Write)?;
        request.validate()?;

        let email = normalize_email(&request.email);
        self.ensure_email_available(&email, None).await?;

        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email,
            password_hash: hash_password(&request.password)?,
            role: UserRole::Employee,
            admin_role: None,
            permissions: PermissionMatrix::employee_default(),
            asset_usage: request.asset_usage.unwrap_or_default(),
            mobile: request.mobile,
            employee_id: request.employee_id,
            location: request.location,
            department: request.department,
            is_active: true,
            is_deleted: false,
            delete_reason: None,
            deleted_at: None,
            last_active: None,
            created_by: Some(actor.id),
            created_at: now,
            updated_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.insert(&user)?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::EmployeeCreate,
            Some(AuditTarget::user(&user)),
            format!("Created employee {} ({})", user.name, user.asset_usage.as_str()),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(user = %user.id, "Employee created");
        Ok(user)
    }

    /// Create an admin; the role preset is copied into the new matrix once
    pub async fn create_admin(&self, actor: &User, request: CreateAdmin) -> AppResult<User> {
        ensure_permission(actor, Module::Admin, Action::Write)?;
        request.validate()?;

        let email = normalize_email(&request.email);
        self.ensure_email_available(&email, None).await?;

        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email,
            password_hash: hash_password(&request.password)?,
            role: UserRole::Admin,
            admin_role: Some(request.admin_role),
            permissions: request.admin_role.preset(),
            asset_usage: AssetUsage::Company,
            mobile: request.mobile,
            employee_id: None,
            location: None,
            department: None,
            is_active: true,
            is_deleted: false,
            delete_reason: None,
            deleted_at: None,
            last_active: None,
            created_by: Some(actor.id),
            created_at: now,
            updated_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.insert(&user)?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::AdminCreate,
            Some(AuditTarget::user(&user)),
            format!("Created admin {} with {:?} preset", user.name, request.admin_role),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(user = %user.id, "Admin created");
        Ok(user)
    }

    /// A user may always read themselves; others need the managing module
    pub async fn get_user(&self, actor: &User, user_id: Uuid) -> AppResult<User> {
        let user = self.repository.require::<User>(&user_id.to_string()).await?;
        if user.id != actor.id {
            ensure_permission(actor, Self::managing_module(&user), Action::Read)?;
        }
        self.with_presence(user.into_inner()).await
    }

    /// Users visible to the caller: employees with `employees.read`, admins with `admin.read`
    pub async fn list_users(&self, actor: &User, query: &UserQuery) -> AppResult<Vec<User>> {
        let employees = ensure_permission(actor, Module::Employees, Action::Read).is_ok();
        let admins = ensure_permission(actor, Module::Admin, Action::Read).is_ok();
        if !employees && !admins {
            ensure_permission(actor, Module::Employees, Action::Read)?;
        }
        let include_deleted = query.include_deleted.unwrap_or(false);

        let seen: HashMap<Uuid, _> = self
            .repository
            .list::<Presence>()
            .await?
            .into_iter()
            .map(|p| (p.user_id, p.last_active))
            .collect();

        Ok(self
            .repository
            .list_where::<User, _>(|u| {
                let visible = if u.is_admin() { admins } else { employees };
                visible
                    && (include_deleted || !u.is_deleted)
                    && query.role.map_or(true, |r| u.role == r)
            })
            .await?
            .into_iter()
            .map(|u| {
                let mut user = u.into_inner();
                user.last_active = seen.get(&user.id).copied();
                user
            })
            .collect())
    }

    pub async fn update_user(&self, actor: &User, user_id: Uuid, request: UpdateUser) -> AppResult<User> {
        request.validate()?;
        let mut user = self.repository.require::<User>(&user_id.to_string()).await?;
        ensure_permission(actor, Self::managing_module(&user), Action::Update)?;
        if user.is_deleted {
            return Err(AppError::InvalidState(format!("{} is deleted", user.name)));
        }

        let mut changed = Vec::new();
        if let Some(name) = request.name {
            user.name = name.trim().to_string();
            changed.push("name");
        }
        if let Some(email) = request.email {
            let email = normalize_email(&email);
            if email != user.email {
                self.ensure_email_available(&email, Some(user.id)).await?;
                user.email = email;
                changed.push("email");
            }
        }
        if let Some(password) = request.password {
            user.password_hash = hash_password(&password)?;
            changed.push("password");
        }
        if let Some(v) = request.mobile {
            user.mobile = Some(v);
            changed.push("mobile");
        }
        if let Some(v) = request.employee_id {
            user.employee_id = Some(v);
            changed.push("employeeId");
        }
        if let Some(v) = request.location {
            user.location = Some(v);
            changed.push("location");
        }
        if let Some(v) = request.department {
            user.department = Some(v);
            changed.push("department");
        }
        if changed.is_empty() {
            return Ok(user.into_inner());
        }
        user.updated_at = self.clock.now();

        let action = if user.is_admin() {
            AuditAction::AdminUpdate
        } else {
            AuditAction::EmployeeUpdate
        };
        let mut batch = WriteBatch::new();
        batch.update(&user)?;
        self.audit.stage(
            &mut batch,
            actor,
            action,
            Some(AuditTarget::user(&user)),
            format!("Updated {}", changed.join(", ")),
        )?;
        self.repository.commit(batch).await?;

        Ok(user.into_inner())
    }

    /// Load a user whose permissions `actor` is about to change
    async fn permissions_target(&self, actor: &User, user_id: Uuid) -> AppResult<Versioned<User>> {
        ensure_permission(actor, Module::Admin, Action::Update)?;
        if user_id == actor.id {
            return Err(AppError::InvalidState(
                "You cannot change your own permissions".to_string(),
            ));
        }

        let user = self.repository.require::<User>(&user_id.to_string()).await?;
        if user.is_deleted {
            return Err(AppError::InvalidState(format!("{} is deleted", user.name)));
        }
        Ok(user)
    }

    async fn commit_permissions(
        &self,
        actor: &User,
        mut user: Versioned<User>,
        permissions: PermissionMatrix,
        summary: String,
    ) -> AppResult<User> {
        if user.permissions == permissions {
            return Ok(user.into_inner());
        }
        user.permissions = permissions;
        user.updated_at = self.clock.now();

        let mut batch = WriteBatch::new();
        batch.update(&user)?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::PermissionsUpdate,
            Some(AuditTarget::user(&user)),
            summary,
        )?;
        self.repository.commit(batch).await?;

        Ok(user.into_inner())
    }

    /// Replace a user's matrix after checking it holds no write/update without read
    pub async fn update_permissions(
        &self,
        actor: &User,
        user_id: Uuid,
        permissions: PermissionMatrix,
    ) -> AppResult<User> {
        permissions.validate()?;
        let user = self.permissions_target(actor, user_id).await?;
        let summary = format!("Permissions of {} updated", user.name);
        self.commit_permissions(actor, user, permissions, summary).await
    }

    /// Grant or revoke one flag. Granting write or update also grants read;
    /// revoking read revokes the whole module.
    pub async fn toggle_permission(
        &self,
        actor: &User,
        user_id: Uuid,
        module: Module,
        action: Action,
        granted: bool,
    ) -> AppResult<User> {
        let user = self.permissions_target(actor, user_id).await?;

        let mut permissions = user.permissions.clone();
        permissions.set(module, action, granted);
        let summary = format!(
            "{} {}.{} {} {}",
            if granted { "Granted" } else { "Revoked" },
            module.as_str(),
            action.as_str(),
            if granted { "to" } else { "from" },
            user.name
        );
        self.commit_permissions(actor, user, permissions, summary).await
    }

    /// Activate or deactivate; users holding assets cannot be deactivated
    pub async fn set_active(&self, actor: &User, user_id: Uuid, active: bool) -> AppResult<User> {
        let mut user = self.repository.require::<User>(&user_id.to_string()).await?;
        ensure_permission(actor, Self::managing_module(&user), Action::Update)?;

        if user.is_deleted {
            return Err(AppError::InvalidState(format!(
                "{} is deleted and cannot be reactivated",
                user.name
            )));
        }
        if user.is_active == active {
            return Ok(user.into_inner());
        }
        if !active {
            if user.id == actor.id {
                return Err(AppError::InvalidState("You cannot deactivate your own account".to_string()));
            }
            let held = self
                .repository
                .list_where::<Asset, _>(|a| a.assigned_to == Some(user.id))
                .await?;
            if !held.is_empty() {
                return Err(AppError::InvalidState(format!(
                    "{} still holds {} asset(s); return them first",
                    user.name,
                    held.len()
                )));
            }
        }

        user.is_active = active;
        user.updated_at = self.clock.now();

        let mut batch = WriteBatch::new();
        batch.update(&user)?;
        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::EmployeeStatusToggle,
            Some(AuditTarget::user(&user)),
            format!("{} {}", user.name, if active { "activated" } else { "deactivated" }),
        )?;
        self.repository.commit(batch).await?;

        Ok(user.into_inner())
    }

    /// Soft-delete an employee and release everything they hold, as one unit of work
    pub async fn soft_delete(&self, actor: &User, user_id: Uuid, reason: &str) -> AppResult<User> {
        ensure_permission(actor, Module::Employees, Action::Update)?;
        let reason = reason.trim();
        if reason.len() < 3 {
            return Err(AppError::Validation("reason: A deletion reason is required".to_string()));
        }

        let mut user = self.repository.require::<User>(&user_id.to_string()).await?;
        if user.is_admin() {
            return Err(AppError::InvalidState("Only employees can be soft-deleted".to_string()));
        }
        if user.is_deleted {
            return Err(AppError::InvalidState(format!("{} is already deleted", user.name)));
        }

        let settings = self.settings.current().await?;
        let destination = if settings.default_asset_status.is_return_destination() {
            settings.default_asset_status
        } else {
            AssetStatus::PendingAudit
        };

        let now = self.clock.now();
        let mut batch = WriteBatch::new();

        user.is_deleted = true;
        user.is_active = false;
        user.delete_reason = Some(reason.to_string());
        user.deleted_at = Some(now);
        user.updated_at = now;
        batch.update(&user)?;

        let held: Vec<Versioned<Asset>> = self
            .repository
            .list_where::<Asset, _>(|a| a.assigned_to == Some(user.id))
            .await?;
        let released = held.len();
        for mut asset in held {
            stage_release(
                &mut batch,
                &mut asset,
                destination,
                Some(format!("Automatic return: {} was deleted", user.name)),
                now,
            )?;
        }

        self.audit.stage(
            &mut batch,
            actor,
            AuditAction::EmployeeSoftDelete,
            Some(AuditTarget::user(&user)),
            format!(
                "Deleted {} ({}); {} asset(s) released to {}",
                user.name, reason, released, destination
            ),
        )?;
        self.repository.commit(batch).await?;

        tracing::info!(user = %user.id, released, "Employee soft-deleted");
        Ok(user.into_inner())
    }

    /// Presence heartbeat. Written to the presence collection, so the user
    /// record and its revision stay untouched.
    pub async fn heartbeat(&self, actor: &User) -> AppResult<User> {
        let mut user = self.repository.require::<User>(&actor.id.to_string()).await?.into_inner();
        let presence = Presence {
            user_id: user.id,
            last_active: self.clock.now(),
        };

        let mut batch = WriteBatch::new();
        batch.upsert(&presence)?;
        self.repository.commit(batch).await?;

        user.last_active = Some(presence.last_active);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password(&hash, "s3cret-pass").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  Priya@Example.COM "), "priya@example.com");
    }
}
