//! Payroll computation.
//!
//! Pay for a period is `base + commission + allowances - deductions`, never
//! below zero. The monthly base salary is prorated by the share of working
//! days the member was present for.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

use crate::attendance::{AttendanceRecord, AttendanceStatus};
use crate::member::StaffMember;

/// Inclusive date range a payroll record covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PayrollPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::validation("period_end must not be before period_start"));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// True when the two periods share at least one day.
    pub fn overlaps(&self, other: &PayrollPeriod) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Days in the period excluding Sundays.
    pub fn working_days(&self) -> u32 {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .filter(|d| d.weekday() != Weekday::Sun)
            .count() as u32
    }
}

/// Everything payroll needs besides the staff member and attendance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayrollInput {
    /// Sum of completed appointment totals for the member in the period.
    #[serde(default)]
    pub commission_base: Money,
    #[serde(default)]
    pub allowances: Money,
    #[serde(default)]
    pub deductions: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub staff_id: RecordId,
    pub staff_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub working_days: u32,
    pub days_present: u32,
    pub days_absent: u32,
    pub base_pay: Money,
    pub commission_base: Money,
    pub commission_rate_bps: u32,
    pub commission: Money,
    pub allowances: Money,
    pub deductions: Money,
    pub net_pay: Money,
    pub created_at: DateTime<Utc>,
}

impl PayrollRecord {
    pub fn period(&self) -> PayrollPeriod {
        PayrollPeriod {
            start: self.period_start,
            end: self.period_end,
        }
    }

    /// Compute pay for `staff` over `period`.
    ///
    /// Attendance rows for other members or outside the period are ignored.
    /// Multiple rows on the same date count once.
    pub fn compute(
        staff: &StaffMember,
        period: PayrollPeriod,
        attendance: &[AttendanceRecord],
        input: PayrollInput,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let relevant = attendance
            .iter()
            .filter(|a| a.owner_id == staff.owner_id && a.staff_id == staff.id && period.contains(a.date));

        let mut present = BTreeSet::new();
        let mut absent = BTreeSet::new();
        for a in relevant {
            if a.status.is_worked() {
                present.insert(a.date);
            } else if a.status == AttendanceStatus::Absent {
                absent.insert(a.date);
            }
        }

        let working_days = period.working_days();
        let days_present = present.len() as u32;
        let days_absent = absent.difference(&present).count() as u32;

        let base_pay = staff
            .base_salary
            .prorate(days_present.min(working_days), working_days);
        let commission = input.commission_base.apply_bps(staff.commission_rate_bps);
        let gross = Money::sum([base_pay, commission, input.allowances])?;
        let net_pay = gross.saturating_sub(input.deductions);

        Ok(Self {
            id: RecordId::new(),
            owner_id: staff.owner_id,
            version: 0,
            staff_id: staff.id,
            staff_name: staff.name.clone(),
            period_start: period.start,
            period_end: period.end,
            working_days,
            days_present,
            days_absent,
            base_pay,
            commission_base: input.commission_base,
            commission_rate_bps: staff.commission_rate_bps,
            commission,
            allowances: input.allowances,
            deductions: input.deductions,
            net_pay,
            created_at: now,
        })
    }
}

impl Entity for PayrollRecord {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for PayrollRecord {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for PayrollRecord {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
