use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; [`crate::permissions_for_roles`]
/// maps the well-known ones to permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Salon account holder. Everything is allowed.
    pub const OWNER: Role = Role(Cow::Borrowed("owner"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    /// Front-desk manager: day-to-day operations, no settings/payroll writes.
    pub const MANAGER: Role = Role(Cow::Borrowed("manager"));
    /// Stylist / therapist: bookings and own attendance.
    pub const STAFF: Role = Role(Cow::Borrowed("staff"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
