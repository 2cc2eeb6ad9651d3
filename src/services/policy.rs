//! Provisioning-mode guard shared by assignment and mode switches
//!
//! A PERSONAL-mode user may hold primary (`ASSET` category) devices only as
//! spare assignments.

use crate::{
    error::{AppError, AppResult},
    models::{Asset, AssetUsage, InventoryCategory, User},
};

/// Check that assigning `asset` to `user` keeps the guard satisfied
pub fn ensure_assignable(user: &User, asset: &Asset, is_spare: bool) -> AppResult<()> {
    if user.asset_usage == AssetUsage::Personal
        && asset.inventory_category == InventoryCategory::Asset
        && !is_spare
    {
        return Err(AppError::PolicyViolation(format!(
            "{} uses a personal device; {} can only be assigned as a spare",
            user.name, asset.asset_code
        )));
    }
    Ok(())
}

/// Check that `user` may switch to PERSONAL given what they currently hold
pub fn ensure_can_switch_to_personal<'a, I>(user: &User, holdings: I) -> AppResult<()>
where
    I: IntoIterator<Item = &'a Asset>,
{
    let blocking: Vec<&str> = holdings
        .into_iter()
        .filter(|a| a.assigned_to == Some(user.id) && a.is_restricted_holding())
        .map(|a| a.asset_code.as_str())
        .collect();

    if blocking.is_empty() {
        Ok(())
    } else {
        Err(AppError::PolicyViolation(format!(
            "{} still holds company asset(s) {}; return them before switching to personal",
            user.name,
            blocking.join(", ")
        )))
    }
}
