//! Closed permission vocabulary and the access-control predicates built on it.

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Admin,
    User,
    ItemCreate,
    ItemUpdate,
    ItemDelete,
    PermissionUpdate,
}

pub type PermissionSet = BTreeSet<Permission>;

/// Permissions that allow deleting somebody else's item.
pub const ITEM_DELETE_PERMISSIONS: &[Permission] = &[Permission::Admin, Permission::ItemDelete];

/// Permissions that allow editing somebody else's item.
pub const ITEM_UPDATE_PERMISSIONS: &[Permission] = &[Permission::Admin, Permission::ItemUpdate];

/// Permissions that allow listing users and rewriting their permissions.
pub const PERMISSION_UPDATE_PERMISSIONS: &[Permission] =
    &[Permission::Admin, Permission::PermissionUpdate];

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Admin => "ADMIN",
            Permission::User => "USER",
            Permission::ItemCreate => "ITEMCREATE",
            Permission::ItemUpdate => "ITEMUPDATE",
            Permission::ItemDelete => "ITEMDELETE",
            Permission::PermissionUpdate => "PERMISSIONUPDATE",
        }
    }
}

/// True when the user holds at least one of `allowed`.
pub fn has_any_permission(user_permissions: &PermissionSet, allowed: &[Permission]) -> bool {
    allowed.iter().any(|p| user_permissions.contains(p))
}

/// Fails with [`DomainError::Authorization`] unless the user holds one of `allowed`.
pub fn require_permission(
    user_permissions: &PermissionSet,
    allowed: &[Permission],
) -> Result<(), DomainError> {
    if has_any_permission(user_permissions, allowed) {
        return Ok(());
    }

    let needed = allowed
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let held = user_permissions
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(DomainError::Authorization(format!(
        "You do not have sufficient permissions: need one of [{}], you have [{}]",
        needed, held
    )))
}

/// Item deletion policy.
///
/// FIXME: this is the recorded policy and it is inverted. It denies a non-owner
/// who *holds* ADMIN/ITEMDELETE and lets a non-owner without those permissions
/// through. The intended rule is most likely `!owns_item && !has_permission`.
/// Changing it is a product decision; flip the second operand once signed off.
pub fn delete_item_denied(owns_item: bool, has_permission: bool) -> bool {
    !owns_item && has_permission
}

/// Item update policy.
///
/// FIXME: updates are not gated on ownership or permissions at all. Tighten
/// here (e.g. `owns_item || has_permission`) once the intended rule is agreed.
pub fn update_item_allowed(_owns_item: bool, _has_permission: bool) -> bool {
    true
}
