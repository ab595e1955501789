//! Per-owner business settings.

pub mod business;

pub use business::{BusinessSettings, OpeningHours, SettingsUpdate};
