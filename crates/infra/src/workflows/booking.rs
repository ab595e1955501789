//! Booking and rescheduling with staff double-booking checks.

use chrono::{DateTime, Utc};

use salonbook_appointments::{Appointment, AppointmentDraft, AppointmentPatch, find_staff_conflict};
use salonbook_catalog::ServiceItem;
use salonbook_core::{DomainError, OwnerId, RecordId};

use super::WorkflowResult;
use crate::repository::{ListQuery, Repository, RepositoryError};
use crate::stores::Stores;

pub const TOUCHES: &[&str] = &["appointments"];

async fn load_services(stores: &Stores, owner: OwnerId, ids: &[RecordId]) -> WorkflowResult<Vec<ServiceItem>> {
    let mut services = Vec::with_capacity(ids.len());
    for id in ids {
        let service = stores
            .services
            .get(owner, *id)
            .await?
            .ok_or_else(|| DomainError::validation(format!("service {id} does not exist")))?;
        service.ensure_bookable()?;
        services.push(service);
    }
    Ok(services)
}

async fn check_references(stores: &Stores, owner: OwnerId, appt: &Appointment) -> WorkflowResult<()> {
    if stores.customers.get(owner, appt.customer_id).await?.is_none() {
        return Err(DomainError::validation(format!("customer {} does not exist", appt.customer_id)).into());
    }
    if let Some(staff_id) = appt.staff_id {
        match stores.staff.get(owner, staff_id).await? {
            Some(s) if s.active => {}
            Some(s) => return Err(DomainError::invariant(format!("staff member {} is inactive", s.name)).into()),
            None => return Err(DomainError::validation(format!("staff member {staff_id} does not exist")).into()),
        }
    }
    Ok(())
}

async fn check_staff_calendar(stores: &Stores, owner: OwnerId, appt: &Appointment) -> WorkflowResult<()> {
    let Some(staff_id) = appt.staff_id else {
        return Ok(());
    };
    let booked = stores
        .appointments
        .list_all(
            owner,
            &ListQuery::new()
                .filter("staff_id", staff_id.to_string())
                .filter("status", "booked"),
        )
        .await?;
    if let Some(clash) = find_staff_conflict(appt, &booked) {
        return Err(RepositoryError::Conflict(format!(
            "staff member is already booked from {} to {}",
            clash.start_at.to_rfc3339(),
            clash.end_at.to_rfc3339()
        ))
        .into());
    }
    Ok(())
}

pub async fn book_appointment(
    stores: &Stores,
    owner: OwnerId,
    draft: AppointmentDraft,
    now: DateTime<Utc>,
) -> WorkflowResult<Appointment> {
    let tx = stores.begin().await?;
    let s = tx.stores();
    let services = load_services(s, owner, &draft.service_ids).await?;
    let appt = Appointment::book(owner, draft, &services, now)?;
    check_references(s, owner, &appt).await?;
    check_staff_calendar(s, owner, &appt).await?;
    let appt = s.appointments.insert(appt).await?;
    tx.commit().await?;
    Ok(appt)
}

pub async fn reschedule_appointment(
    stores: &Stores,
    owner: OwnerId,
    id: RecordId,
    patch: AppointmentPatch,
    now: DateTime<Utc>,
) -> WorkflowResult<Appointment> {
    let tx = stores.begin().await?;
    let s = tx.stores();
    let mut appt = s.appointments.require(owner, id).await?;
    let services = match &patch.service_ids {
        Some(ids) => load_services(s, owner, ids).await?,
        None => Vec::new(),
    };
    appt.apply_patch(patch, &services, now)?;
    check_references(s, owner, &appt).await?;
    check_staff_calendar(s, owner, &appt).await?;
    let appt = s.appointments.update(appt).await?;
    tx.commit().await?;
    Ok(appt)
}
