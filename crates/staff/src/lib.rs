//! Staff domain module: team members, daily attendance, and payroll.
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod attendance;
pub mod member;
pub mod payroll;

pub use attendance::{AttendanceDraft, AttendancePatch, AttendanceRecord, AttendanceStatus};
pub use member::{StaffDraft, StaffMember, StaffPatch};
pub use payroll::{PayrollInput, PayrollPeriod, PayrollRecord};
