use serde::{Deserialize, Serialize};

use salonbook_core::{OwnerId, UserId};

/// Identity of an authenticated principal: the account's user id.
pub type PrincipalId = UserId;

/// A principal's membership in an owner's business.
///
/// This is an authorization boundary object: it states *which owner* the
/// principal is acting for and which roles/permissions are granted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerMembership {
    pub owner_id: OwnerId,
    pub roles: Vec<crate::Role>,
    pub permissions: Vec<crate::Permission>,
}
