//! Entity traits: identity + continuity across state changes.

use crate::id::OwnerId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity that belongs to exactly one owner (the salon account).
///
/// Every persisted record is owned; storage must never hand a record to a
/// caller acting for a different owner.
pub trait Owned {
    fn owner_id(&self) -> OwnerId;

    fn is_owned_by(&self, owner_id: OwnerId) -> bool {
        self.owner_id() == owner_id
    }
}

/// A record whose writes are checked against the version it was read at.
///
/// Storage bumps the version on every successful update and rejects an
/// update that carries a stale one.
pub trait Versioned {
    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);
}
