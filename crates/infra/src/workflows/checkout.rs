//! Appointment checkout.
//!
//! voucher → complete → voucher usage → customer visit stats → finance
//! income → loyalty points, in one unit of work. Versioned updates run
//! before the inserts, so a concurrent checkout or voucher redemption fails
//! before anything is appended.

use chrono::{DateTime, Utc};
use serde::Serialize;

use salonbook_appointments::Appointment;
use salonbook_core::{DomainError, Money, OwnerId, RecordId};
use salonbook_customers::Customer;
use salonbook_finance::{FinanceTransaction, TransactionDraft, TransactionKind};
use salonbook_loyalty::{PointsAdjustment, PointsEntry, Voucher, points_for_spend};

use super::WorkflowResult;
use crate::repository::{ListQuery, Repository};
use crate::stores::Stores;

pub const TOUCHES: &[&str] = &["appointments", "finance_transactions", "vouchers", "customers", "points"];

/// Finance category for appointment revenue.
pub const SERVICES_CATEGORY: &str = "services";

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub appointment: Appointment,
    pub transaction: Option<FinanceTransaction>,
    pub voucher: Option<Voucher>,
    pub points: Option<PointsEntry>,
}

async fn find_voucher(stores: &Stores, owner: OwnerId, code: &str) -> WorkflowResult<Voucher> {
    let page = stores
        .vouchers
        .list(owner, &ListQuery::new().filter("code", code))
        .await?;
    page.items
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::invariant(format!("voucher {code} does not exist")).into())
}

#[tracing::instrument(skip(stores), fields(owner_id = %owner, appointment_id = %id), err)]
pub async fn complete_appointment(
    stores: &Stores,
    owner: OwnerId,
    id: RecordId,
    at: DateTime<Utc>,
) -> WorkflowResult<CheckoutReceipt> {
    let tx = stores.begin().await?;
    let s = tx.stores();
    let mut appt = s.appointments.require(owner, id).await?;

    let mut voucher = match appt.voucher_code.clone() {
        Some(code) => Some(find_voucher(s, owner, &code).await?),
        None => None,
    };
    let discount = match &voucher {
        Some(v) => v.discount_for(appt.subtotal, at)?,
        None => Money::ZERO,
    };
    appt.complete(discount, at)?;

    let transaction = if appt.total.is_zero() {
        None
    } else {
        Some(FinanceTransaction::create(
            owner,
            TransactionDraft {
                kind: TransactionKind::Income,
                category: SERVICES_CATEGORY.to_string(),
                amount: appt.total,
                occurred_on: at.date_naive(),
                description: Some(format!(
                    "{} ({})",
                    appt.lines.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(", "),
                    appt.id
                )),
                reference: Some(appt.id.to_string()),
            },
            at,
        )?)
    };

    let settings = s.settings_for(owner).await?;
    let mut customer: Option<Customer> = s.customers.get(owner, appt.customer_id).await?;
    let mut points = None;
    if let Some(c) = customer.as_mut() {
        c.record_visit(appt.total, at)?;
        let earned = points_for_spend(appt.total, settings.points_per_currency_unit);
        if earned > 0 {
            let entry = PointsEntry::post(
                owner,
                c.points_balance,
                PointsAdjustment {
                    customer_id: c.id,
                    delta: earned,
                    reason: "visit".to_string(),
                    reference: Some(appt.id.to_string()),
                },
                at,
            )?;
            c.points_balance = entry.balance_after;
            points = Some(entry);
        }
    } else {
        tracing::warn!(customer_id = %appt.customer_id, "customer missing at checkout; skipping visit stats");
    }

    let appointment = s.appointments.update(appt).await?;
    if let Some(v) = voucher.as_mut() {
        v.record_use(at);
        *v = s.vouchers.update(v.clone()).await?;
    }
    if let Some(c) = customer {
        s.customers.update(c).await?;
    }
    let transaction = match transaction {
        Some(t) => Some(s.finance.insert(t).await?),
        None => None,
    };
    let points = match points {
        Some(p) => Some(s.points.insert(p).await?),
        None => None,
    };
    tx.commit().await?;

    tracing::info!(total = %appointment.total, "appointment checked out");
    Ok(CheckoutReceipt {
        appointment,
        transaction,
        voucher,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use salonbook_appointments::{AppointmentDraft, AppointmentStatus};
    use salonbook_catalog::{ServiceDraft, ServiceItem};
    use salonbook_customers::CustomerDraft;
    use salonbook_loyalty::{VoucherDraft, VoucherKind};
    use salonbook_settings::SettingsUpdate;

    use crate::workflows::{WorkflowError, book_appointment};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    async fn seed(stores: &Stores, owner: OwnerId, voucher_code: Option<&str>) -> Appointment {
        let customer = Customer::create(owner, CustomerDraft { name: "Thu".into(), ..Default::default() }, at()).unwrap();
        stores.customers.insert(customer.clone()).await.unwrap();
        let service = ServiceItem::create(
            owner,
            ServiceDraft {
                name: "Cut".into(),
                category: None,
                description: None,
                duration_minutes: 45,
                price: Money::new(25_000).unwrap(),
                active: true,
            },
            at(),
        )
        .unwrap();
        stores.services.insert(service.clone()).await.unwrap();

        book_appointment(
            stores,
            owner,
            AppointmentDraft {
                customer_id: customer.id,
                staff_id: None,
                service_ids: vec![service.id],
                start_at: at(),
                end_at: None,
                voucher_code: voucher_code.map(str::to_string),
                notes: None,
            },
            at(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn checkout_records_income_visit_and_points() {
        let stores = Stores::in_memory();
        let owner = OwnerId::new();
        let mut settings = stores.settings_for(owner).await.unwrap();
        settings
            .apply_update(SettingsUpdate { points_per_currency_unit: Some(1000), ..Default::default() }, at())
            .unwrap();
        stores.save_settings(settings).await.unwrap();

        let appt = seed(&stores, owner, None).await;
        let receipt = complete_appointment(&stores, owner, appt.id, at() + Duration::hours(1)).await.unwrap();

        assert_eq!(receipt.appointment.status, AppointmentStatus::Completed);
        let tx = receipt.transaction.unwrap();
        assert_eq!(tx.amount.amount(), 25_000);
        assert_eq!(tx.category, "services");
        assert_eq!(tx.reference, Some(appt.id.to_string()));
        assert_eq!(receipt.points.unwrap().delta, 25);

        let customer = stores.customers.require(owner, appt.customer_id).await.unwrap();
        assert_eq!(customer.visit_count, 1);
        assert_eq!(customer.points_balance, 25);
        assert_eq!(customer.total_spent.amount(), 25_000);
    }

    #[tokio::test]
    async fn voucher_discount_and_usage() {
        let stores = Stores::in_memory();
        let owner = OwnerId::new();
        let voucher = Voucher::create(
            owner,
            VoucherDraft {
                code: "VIP20".into(),
                description: None,
                kind: VoucherKind::Percentage,
                value: 20,
                min_spend: Money::ZERO,
                valid_from: None,
                valid_until: None,
                max_uses: Some(1),
            },
            at(),
        )
        .unwrap();
        stores.vouchers.insert(voucher).await.unwrap();

        let appt = seed(&stores, owner, Some("vip20")).await;
        let receipt = complete_appointment(&stores, owner, appt.id, at()).await.unwrap();
        assert_eq!(receipt.appointment.discount.amount(), 5_000);
        assert_eq!(receipt.appointment.total.amount(), 20_000);
        assert_eq!(receipt.voucher.unwrap().used_count, 1);

        // Second use is over the cap and nothing is written.
        let second = seed(&stores, owner, Some("VIP20")).await;
        let err = complete_appointment(&stores, owner, second.id, at()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvariantViolation(_))));
        let still = stores.appointments.require(owner, second.id).await.unwrap();
        assert_eq!(still.status, AppointmentStatus::Booked);
    }

    #[tokio::test]
    async fn completing_twice_is_rejected() {
        let stores = Stores::in_memory();
        let owner = OwnerId::new();
        let appt = seed(&stores, owner, None).await;
        complete_appointment(&stores, owner, appt.id, at()).await.unwrap();
        let err = complete_appointment(&stores, owner, appt.id, at()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvariantViolation(_))));

        let finance = stores.finance.list(owner, &ListQuery::new()).await.unwrap();
        assert_eq!(finance.total, 1);
    }

    #[tokio::test]
    async fn concurrent_checkouts_complete_once() {
        let stores = Stores::in_memory();
        let owner = OwnerId::new();
        let appt = seed(&stores, owner, None).await;

        let (a, b) = tokio::join!(
            complete_appointment(&stores, owner, appt.id, at()),
            complete_appointment(&stores, owner, appt.id, at()),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);

        let finance = stores.finance.list(owner, &ListQuery::new()).await.unwrap();
        assert_eq!(finance.total, 1);
        let customer = stores.customers.require(owner, appt.customer_id).await.unwrap();
        assert_eq!(customer.visit_count, 1);
    }

    #[tokio::test]
    async fn other_owner_cannot_check_out() {
        let stores = Stores::in_memory();
        let owner = OwnerId::new();
        let appt = seed(&stores, owner, None).await;
        let err = complete_appointment(&stores, OwnerId::new(), appt.id, at()).await.unwrap_err();
        assert_eq!(err, WorkflowError::Repository(crate::repository::RepositoryError::NotFound));
    }
}
