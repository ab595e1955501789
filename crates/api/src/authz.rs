//! Permission checks at the handler boundary.
//!
//! Handlers call [`require`] before touching storage; domain crates and infra
//! stay auth-agnostic.

use salonbook_auth::{AuthzError, Permission, Principal, authorize};

use crate::context::{OwnerContext, PrincipalContext};

/// Fail with [`AuthzError::Forbidden`] unless the request's roles grant `permission`.
pub fn require(
    owner: &OwnerContext,
    principal: &PrincipalContext,
    permission: Permission,
) -> Result<(), AuthzError> {
    let principal = Principal::from_roles(
        principal.principal_id(),
        owner.owner_id(),
        principal.roles().to_vec(),
    );
    authorize(&principal, &permission)
}

pub fn require_read(owner: &OwnerContext, principal: &PrincipalContext, resource: &str) -> Result<(), AuthzError> {
    require(owner, principal, Permission::read(resource))
}

pub fn require_write(owner: &OwnerContext, principal: &PrincipalContext, resource: &str) -> Result<(), AuthzError> {
    require(owner, principal, Permission::write(resource))
}
