use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use salonbook_core::error::optional_text;
use salonbook_core::patch::nullable;
use salonbook_core::{DomainError, DomainResult, Entity, Owned, OwnerId, RecordId, Versioned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Leave,
}

impl AttendanceStatus {
    /// Whether the day counts as worked for payroll.
    pub fn is_worked(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

/// One staff member's attendance for one calendar day.
///
/// At most one record exists per `(owner, staff_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub staff_id: RecordId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceDraft {
    pub staff_id: RecordId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Partial update. `null` clears `check_in`/`check_out`, which is how a
/// clocked-in day becomes absent or leave.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendancePatch {
    pub status: Option<AttendanceStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub check_in: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub check_out: Option<Option<DateTime<Utc>>>,
    pub note: Option<String>,
}

impl AttendanceRecord {
    pub fn create(owner_id: OwnerId, draft: AttendanceDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let record = Self {
            id: RecordId::new(),
            owner_id,
            version: 0,
            staff_id: draft.staff_id,
            date: draft.date,
            status: draft.status,
            check_in: draft.check_in,
            check_out: draft.check_out,
            note: optional_text(draft.note),
            created_at: now,
            updated_at: now,
        };
        record.validate()?;
        Ok(record)
    }

    /// Clock in at `at`; the record's date is `at`'s UTC date.
    pub fn check_in(owner_id: OwnerId, staff_id: RecordId, status: AttendanceStatus, at: DateTime<Utc>) -> DomainResult<Self> {
        if !status.is_worked() {
            return Err(DomainError::validation("check-in status must be present or late"));
        }
        Self::create(
            owner_id,
            AttendanceDraft {
                staff_id,
                date: at.date_naive(),
                status,
                check_in: Some(at),
                check_out: None,
                note: None,
            },
            at,
        )
    }

    pub fn check_out(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.check_in.is_none() {
            return Err(DomainError::invariant("cannot check out without a check-in"));
        }
        if self.check_out.is_some() {
            return Err(DomainError::conflict("already checked out"));
        }
        let mut next = self.clone();
        next.check_out = Some(at);
        next.validate()?;
        next.updated_at = at;
        *self = next;
        Ok(())
    }

    pub fn apply_patch(&mut self, patch: AttendancePatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(s) = patch.status {
            next.status = s;
        }
        if let Some(t) = patch.check_in {
            next.check_in = t;
        }
        if let Some(t) = patch.check_out {
            next.check_out = t;
        }
        if let Some(n) = patch.note {
            next.note = optional_text(Some(n));
        }
        next.validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Minutes between check-in and check-out; zero while still clocked in.
    pub fn worked_minutes(&self) -> i64 {
        match (self.check_in, self.check_out) {
            (Some(i), Some(o)) => (o - i).num_minutes().max(0),
            _ => 0,
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if !self.status.is_worked() && (self.check_in.is_some() || self.check_out.is_some()) {
            return Err(DomainError::validation("absent/leave days cannot have check-in or check-out times"));
        }
        if self.check_out.is_some() && self.check_in.is_none() {
            return Err(DomainError::validation("check_out requires check_in"));
        }
        if let (Some(i), Some(o)) = (self.check_in, self.check_out) {
            if o <= i {
                return Err(DomainError::validation("check_out must be after check_in"));
            }
        }
        Ok(())
    }
}

impl Entity for AttendanceRecord {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for AttendanceRecord {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for AttendanceRecord {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
