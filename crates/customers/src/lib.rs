//! Customers domain module.
//!
//! Business rules for customer records, implemented as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod customer;

pub use customer::{Customer, CustomerDraft, CustomerPatch, Gender};
