use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use salonbook_catalog::ServiceItem;
use salonbook_core::error::optional_text;
use salonbook_core::patch::nullable;
use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

/// One booked service, snapshotted at booking time so later menu price
/// changes do not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentLine {
    pub service_id: RecordId,
    pub name: String,
    pub price: Money,
    pub duration_minutes: u32,
}

impl AppointmentLine {
    fn from_service(service: &ServiceItem) -> DomainResult<Self> {
        service.ensure_bookable()?;
        Ok(Self {
            service_id: service.id,
            name: service.name.clone(),
            price: service.price,
            duration_minutes: service.duration_minutes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub customer_id: RecordId,
    pub staff_id: Option<RecordId>,
    pub lines: Vec<AppointmentLine>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub voucher_code: Option<String>,
    pub notes: Option<String>,
    pub subtotal: Money,
    pub discount: Money,
    /// `subtotal - discount`, never negative.
    pub total: Money,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentDraft {
    pub customer_id: RecordId,
    pub staff_id: Option<RecordId>,
    pub service_ids: Vec<RecordId>,
    pub start_at: DateTime<Utc>,
    /// Derived from the services' durations when omitted.
    pub end_at: Option<DateTime<Utc>>,
    pub voucher_code: Option<String>,
    pub notes: Option<String>,
}

/// Partial update. `null` unassigns the staff member or drops the voucher.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentPatch {
    #[serde(default, deserialize_with = "nullable")]
    pub staff_id: Option<Option<RecordId>>,
    pub service_ids: Option<Vec<RecordId>>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub voucher_code: Option<Option<String>>,
    pub notes: Option<String>,
}

impl Appointment {
    /// Book an appointment. `services` must be the resolved records for
    /// `draft.service_ids`, in any order.
    pub fn book(
        owner_id: OwnerId,
        draft: AppointmentDraft,
        services: &[ServiceItem],
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let lines = resolve_lines(&draft.service_ids, services)?;
        let end_at = resolve_end(draft.start_at, draft.end_at, &lines)?;
        let subtotal = Money::sum(lines.iter().map(|l| l.price))?;

        Ok(Self {
            id: RecordId::new(),
            owner_id,
            version: 0,
            customer_id: draft.customer_id,
            staff_id: draft.staff_id,
            lines,
            start_at: draft.start_at,
            end_at,
            status: AppointmentStatus::Booked,
            voucher_code: normalize_code(draft.voucher_code),
            notes: optional_text(draft.notes),
            subtotal,
            discount: Money::ZERO,
            total: subtotal,
            completed_at: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reschedule / edit a booked appointment. `services` is only consulted
    /// when the patch replaces the service list.
    pub fn apply_patch(
        &mut self,
        patch: AppointmentPatch,
        services: &[ServiceItem],
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_booked("edit")?;

        let lines = match &patch.service_ids {
            Some(ids) => resolve_lines(ids, services)?,
            None => self.lines.clone(),
        };
        let start_at = patch.start_at.unwrap_or(self.start_at);
        let end_at = match (patch.end_at, patch.start_at, &patch.service_ids) {
            (Some(end), _, _) => resolve_end(start_at, Some(end), &lines)?,
            // Moving the start or changing services re-derives the end.
            (None, Some(_), _) | (None, None, Some(_)) => resolve_end(start_at, None, &lines)?,
            (None, None, None) => self.end_at,
        };
        let subtotal = Money::sum(lines.iter().map(|l| l.price))?;

        self.lines = lines;
        self.start_at = start_at;
        self.end_at = end_at;
        self.subtotal = subtotal;
        self.discount = self.discount.min(subtotal);
        self.total = subtotal.saturating_sub(self.discount);
        if let Some(staff_id) = patch.staff_id {
            self.staff_id = staff_id;
        }
        if let Some(code) = patch.voucher_code {
            self.voucher_code = normalize_code(code);
        }
        if let Some(notes) = patch.notes {
            self.notes = optional_text(Some(notes));
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn is_booked(&self) -> bool {
        self.status == AppointmentStatus::Booked
    }

    /// Complete the appointment with a (possibly zero) discount, capped at the subtotal.
    pub fn complete(&mut self, discount: Money, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_booked("complete")?;
        self.discount = discount.min(self.subtotal);
        self.total = self.subtotal.saturating_sub(self.discount);
        self.status = AppointmentStatus::Completed;
        self.completed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    pub fn cancel(&mut self, reason: Option<String>, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_booked("cancel")?;
        self.status = AppointmentStatus::Cancelled;
        self.cancel_reason = optional_text(reason);
        self.updated_at = at;
        Ok(())
    }

    pub fn mark_no_show(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_booked("mark as no-show")?;
        self.status = AppointmentStatus::NoShow;
        self.updated_at = at;
        Ok(())
    }

    fn ensure_booked(&self, action: &str) -> DomainResult<()> {
        if !self.is_booked() {
            return Err(DomainError::invariant(format!(
                "cannot {action} an appointment that is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

impl Entity for Appointment {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Appointment {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for Appointment {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

fn resolve_lines(ids: &[RecordId], services: &[ServiceItem]) -> DomainResult<Vec<AppointmentLine>> {
    if ids.is_empty() {
        return Err(DomainError::validation("at least one service is required"));
    }
    ids.iter()
        .map(|id| {
            let service = services
                .iter()
                .find(|s| s.id == *id)
                .ok_or_else(|| DomainError::validation(format!("unknown service {id}")))?;
            AppointmentLine::from_service(service)
        })
        .collect()
}

fn resolve_end(
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
    lines: &[AppointmentLine],
) -> DomainResult<DateTime<Utc>> {
    let end_at = match end_at {
        Some(end) => end,
        None => {
            let minutes: i64 = lines.iter().map(|l| l.duration_minutes as i64).sum();
            start_at + Duration::minutes(minutes)
        }
    };
    if end_at <= start_at {
        return Err(DomainError::validation("end_at must be after start_at"));
    }
    Ok(end_at)
}

fn normalize_code(code: Option<String>) -> Option<String> {
    optional_text(code).map(|c| c.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use salonbook_catalog::ServiceDraft;

    fn service(owner: OwnerId, name: &str, price: i64, minutes: u32) -> ServiceItem {
        ServiceItem::create(
            owner,
            ServiceDraft {
                name: name.to_string(),
                category: None,
                description: None,
                duration_minutes: minutes,
                price: Money::new(price).unwrap(),
                active: true,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, 0).unwrap()
    }

    fn booked() -> (Appointment, Vec<ServiceItem>) {
        let owner = OwnerId::new();
        let services = vec![service(owner, "Cut", 200, 30), service(owner, "Wash", 50, 15)];
        let appt = Appointment::book(
            owner,
            AppointmentDraft {
                customer_id: RecordId::new(),
                staff_id: Some(RecordId::new()),
                service_ids: services.iter().map(|s| s.id).collect(),
                start_at: at(10, 0),
                end_at: None,
                voucher_code: Some(" spring10 ".to_string()),
                notes: None,
            },
            &services,
            Utc::now(),
        )
        .unwrap();
        (appt, services)
    }

    #[test]
    fn book_derives_end_and_totals() {
        let (appt, _) = booked();
        assert_eq!(appt.end_at, at(10, 45));
        assert_eq!(appt.subtotal.amount(), 250);
        assert_eq!(appt.total.amount(), 250);
        assert_eq!(appt.voucher_code.as_deref(), Some("SPRING10"));
        assert_eq!(appt.lines.len(), 2);
        assert_eq!(appt.lines[0].name, "Cut");
    }

    #[test]
    fn book_rejects_unknown_or_missing_services() {
        let owner = OwnerId::new();
        let draft = AppointmentDraft {
            customer_id: RecordId::new(),
            staff_id: None,
            service_ids: vec![],
            start_at: at(9, 0),
            end_at: None,
            voucher_code: None,
            notes: None,
        };
        assert!(Appointment::book(owner, draft.clone(), &[], Utc::now()).is_err());

        let mut d = draft;
        d.service_ids = vec![RecordId::new()];
        assert!(matches!(
            Appointment::book(owner, d, &[], Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn book_rejects_inverted_window() {
        let owner = OwnerId::new();
        let s = service(owner, "Cut", 100, 30);
        let draft = AppointmentDraft {
            customer_id: RecordId::new(),
            staff_id: None,
            service_ids: vec![s.id],
            start_at: at(10, 0),
            end_at: Some(at(9, 0)),
            voucher_code: None,
            notes: None,
        };
        assert!(Appointment::book(owner, draft, &[s], Utc::now()).is_err());
    }

    #[test]
    fn moving_start_rederives_end() {
        let (mut appt, services) = booked();
        appt.apply_patch(
            AppointmentPatch {
                start_at: Some(at(14, 0)),
                ..Default::default()
            },
            &services,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(appt.start_at, at(14, 0));
        assert_eq!(appt.end_at, at(14, 45));
    }

    #[test]
    fn replacing_services_recomputes_subtotal() {
        let (mut appt, services) = booked();
        appt.apply_patch(
            AppointmentPatch {
                service_ids: Some(vec![services[1].id]),
                ..Default::default()
            },
            &services,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(appt.subtotal.amount(), 50);
        assert_eq!(appt.end_at, at(10, 15));
    }

    #[test]
    fn patch_nulls_unassign_staff_and_drop_voucher() {
        let (mut appt, services) = booked();
        let staff_id = appt.staff_id;
        appt.apply_patch(serde_json::from_str(r#"{"notes":"window seat"}"#).unwrap(), &services, Utc::now())
            .unwrap();
        assert_eq!(appt.staff_id, staff_id);
        assert_eq!(appt.voucher_code.as_deref(), Some("SPRING10"));

        appt.apply_patch(
            serde_json::from_str(r#"{"staff_id":null,"voucher_code":null}"#).unwrap(),
            &services,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(appt.staff_id, None);
        assert_eq!(appt.voucher_code, None);
    }

    #[test]
    fn complete_caps_discount_and_locks_record() {
        let (mut appt, services) = booked();
        appt.complete(Money::new(1000).unwrap(), at(11, 0)).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Completed);
        assert_eq!(appt.discount.amount(), 250);
        assert_eq!(appt.total, Money::ZERO);

        let err = appt
            .apply_patch(AppointmentPatch::default(), &services, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(appt.cancel(None, Utc::now()).is_err());
        assert!(appt.mark_no_show(Utc::now()).is_err());
    }

    #[test]
    fn cancel_records_reason() {
        let (mut appt, _) = booked();
        appt.cancel(Some(" sick ".to_string()), Utc::now()).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Cancelled);
        assert_eq!(appt.cancel_reason.as_deref(), Some("sick"));
        assert!(appt.complete(Money::ZERO, Utc::now()).is_err());
    }
}
