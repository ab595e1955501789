//! Appointments domain module.
//!
//! A booking of one or more menu services for a customer, optionally with a
//! specific staff member, and its `booked → completed | cancelled | no_show`
//! lifecycle.

pub mod appointment;
pub mod schedule;

pub use appointment::{
    Appointment, AppointmentDraft, AppointmentLine, AppointmentPatch, AppointmentStatus,
};
pub use schedule::{find_staff_conflict, overlaps};
