//! Permission evaluation against a user's stored matrix

use crate::{
    error::{AppError, AppResult},
    models::{Action, Module, User},
};

/// Whether `user` may perform `action` on `module`.
///
/// Only the stored matrix counts; role presets were copied into it when the
/// account was created and are not consulted again.
pub fn can_perform(user: &User, module: Module, action: Action) -> bool {
    user.permissions.allows(module, action)
}

pub fn ensure_permission(user: &User, module: Module, action: Action) -> AppResult<()> {
    if can_perform(user, module, action) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!(
            "{} access to {} is required",
            action.as_str(),
            module.as_str()
        )))
    }
}
