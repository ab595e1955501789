//! `salonbook-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod patch;

pub use entity::{Entity, Owned, Versioned};
pub use error::{DomainError, DomainResult};
pub use id::{OwnerId, RecordId, UserId};
pub use money::Money;
