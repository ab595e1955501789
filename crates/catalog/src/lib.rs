//! Service menu: the treatments a salon sells (cuts, colour, nails, spa...).

pub mod service;

pub use service::{ServiceDraft, ServiceItem, ServicePatch, MAX_DURATION_MINUTES};
