//! Staff calendar conflicts.

use chrono::{DateTime, Utc};

use crate::appointment::Appointment;

/// Half-open interval overlap: `[a_start, a_end)` vs `[b_start, b_end)`.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// First booked appointment in `existing` that double-books `candidate`'s
/// staff member. Unassigned or non-booked candidates never conflict; the
/// candidate itself (same id) is ignored so edits can be re-checked.
pub fn find_staff_conflict<'a>(
    candidate: &Appointment,
    existing: &'a [Appointment],
) -> Option<&'a Appointment> {
    let staff_id = candidate.staff_id?;
    if !candidate.is_booked() {
        return None;
    }
    existing.iter().find(|other| {
        other.id != candidate.id
            && other.owner_id == candidate.owner_id
            && other.staff_id == Some(staff_id)
            && other.is_booked()
            && overlaps(candidate.start_at, candidate.end_at, other.start_at, other.end_at)
    })
}
