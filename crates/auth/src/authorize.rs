use std::collections::HashSet;

use thiserror::Error;

use salonbook_core::OwnerId;

use crate::{OwnerMembership, Permission, PrincipalId, Role};

/// A fully resolved principal for authorization decisions.
///
/// Construction of this object is decoupled from storage and transport: the
/// API derives it from verified session claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_owner_id: OwnerId,
    pub membership: OwnerMembership,
}

impl Principal {
    /// Build a principal whose permissions come from the role policy.
    pub fn from_roles(principal_id: PrincipalId, owner_id: OwnerId, roles: Vec<Role>) -> Self {
        let permissions = permissions_for_roles(&roles);
        Self {
            principal_id,
            active_owner_id: owner_id,
            membership: OwnerMembership {
                owner_id,
                roles,
                permissions,
            },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("owner mismatch")]
    OwnerMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal within its active owner context.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_owner_id != principal.membership.owner_id {
        return Err(AuthzError::OwnerMismatch);
    }

    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Resources readable by every authenticated role.
const FRONT_DESK_READ: &[&str] = &["customers", "services", "appointments", "inventory", "vouchers"];

/// Resources a manager may read and write.
const MANAGER_RESOURCES: &[&str] = &[
    "customers",
    "services",
    "appointments",
    "staff",
    "attendance",
    "inventory",
    "vouchers",
    "points",
    "finance",
];

/// Role → permission policy.
///
/// Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    let mut push = |p: Permission| {
        if !out.contains(&p) {
            out.push(p);
        }
    };

    for role in roles {
        match role.as_str() {
            "owner" | "admin" => push(Permission::new("*")),
            "manager" => {
                for r in MANAGER_RESOURCES {
                    push(Permission::read(r));
                    push(Permission::write(r));
                }
                push(Permission::read("payroll"));
                push(Permission::read("settings"));
            }
            "staff" => {
                for r in FRONT_DESK_READ {
                    push(Permission::read(r));
                }
                push(Permission::write("appointments"));
                push(Permission::read("attendance"));
                push(Permission::write("attendance"));
                push(Permission::read("settings"));
            }
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: Vec<Role>) -> Principal {
        Principal::from_roles(PrincipalId::new(), OwnerId::new(), roles)
    }

    #[test]
    fn owner_role_is_wildcard() {
        let p = principal(vec![Role::OWNER]);
        assert!(authorize(&p, &Permission::write("settings")).is_ok());
        assert!(authorize(&p, &Permission::write("payroll")).is_ok());
    }

    #[test]
    fn manager_cannot_write_settings_or_payroll() {
        let p = principal(vec![Role::MANAGER]);
        assert!(authorize(&p, &Permission::write("customers")).is_ok());
        assert!(authorize(&p, &Permission::read("payroll")).is_ok());
        assert_eq!(
            authorize(&p, &Permission::write("settings")),
            Err(AuthzError::Forbidden("settings.write".to_string()))
        );
        assert!(authorize(&p, &Permission::write("payroll")).is_err());
    }

    #[test]
    fn staff_can_book_but_not_touch_finance() {
        let p = principal(vec![Role::STAFF]);
        assert!(authorize(&p, &Permission::write("appointments")).is_ok());
        assert!(authorize(&p, &Permission::read("customers")).is_ok());
        assert!(authorize(&p, &Permission::read("finance")).is_err());
        assert!(authorize(&p, &Permission::write("customers")).is_err());
    }

    #[test]
    fn unknown_role_grants_nothing() {
        let p = principal(vec![Role::new("viewer")]);
        assert!(p.membership.permissions.is_empty());
        assert!(authorize(&p, &Permission::read("customers")).is_err());
    }

    #[test]
    fn owner_mismatch_is_rejected_before_permissions() {
        let mut p = principal(vec![Role::OWNER]);
        p.active_owner_id = OwnerId::new();
        assert_eq!(
            authorize(&p, &Permission::read("customers")),
            Err(AuthzError::OwnerMismatch)
        );
    }

    #[test]
    fn combined_roles_do_not_duplicate_permissions() {
        let perms = permissions_for_roles(&[Role::STAFF, Role::MANAGER]);
        let unique: HashSet<_> = perms.iter().collect();
        assert_eq!(unique.len(), perms.len());
    }
}
