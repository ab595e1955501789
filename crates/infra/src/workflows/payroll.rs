//! Payroll run: one record per staff member for a period, plus a finance
//! expense for each non-zero payout. A member is paid at most once for any
//! day, and the whole run is one unit of work.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use salonbook_appointments::Appointment;
use salonbook_core::{DomainError, Money, OwnerId, RecordId};
use salonbook_finance::{FinanceTransaction, TransactionDraft, TransactionKind};
use salonbook_staff::{PayrollInput, PayrollPeriod, PayrollRecord, StaffMember};

use super::WorkflowResult;
use crate::repository::{ListQuery, Repository, RepositoryError};
use crate::stores::Stores;

pub const TOUCHES: &[&str] = &["payroll", "finance_transactions"];

pub const PAYROLL_CATEGORY: &str = "payroll";

#[derive(Debug, Clone, Deserialize)]
pub struct PayrollRunRequest {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Only this member; all active staff when omitted.
    pub staff_id: Option<RecordId>,
    #[serde(default)]
    pub allowances: Money,
    #[serde(default)]
    pub deductions: Money,
}

fn period_bounds(period: PayrollPeriod) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let from = period.start.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
    let to = period.end.and_hms_opt(23, 59, 59).map(|d| d.and_utc());
    (from, to)
}

/// Sum of totals of `staff`'s appointments completed within `period`.
async fn commission_base(
    stores: &Stores,
    owner: OwnerId,
    staff: &StaffMember,
    period: PayrollPeriod,
) -> WorkflowResult<Money> {
    let completed: Vec<Appointment> = stores
        .appointments
        .list_all(
            owner,
            &ListQuery::new()
                .filter("staff_id", staff.id.to_string())
                .filter("status", "completed"),
        )
        .await?;
    let in_period = completed
        .iter()
        .filter(|a| a.completed_at.is_some_and(|t| period.contains(t.date_naive())))
        .map(|a| a.total);
    Ok(Money::sum(in_period)?)
}

#[tracing::instrument(skip(stores, request), fields(owner_id = %owner), err)]
pub async fn run_payroll(
    stores: &Stores,
    owner: OwnerId,
    request: PayrollRunRequest,
    at: DateTime<Utc>,
) -> WorkflowResult<Vec<PayrollRecord>> {
    let period = PayrollPeriod::new(request.period_start, request.period_end)?;
    let tx = stores.begin().await?;
    let stores = tx.stores();

    let members = match request.staff_id {
        Some(id) => vec![stores.staff.require(owner, id).await?],
        None => {
            stores
                .staff
                .list_all(owner, &ListQuery::new().filter("active", "true"))
                .await?
        }
    };
    if members.is_empty() {
        return Err(DomainError::validation("no active staff to pay").into());
    }

    let (from, to) = period_bounds(period);
    let mut computed = Vec::with_capacity(members.len());
    for member in &members {
        let paid = stores
            .payroll
            .list_all(owner, &ListQuery::new().filter("staff_id", member.id.to_string()))
            .await?;
        if let Some(prior) = paid.iter().find(|p| p.period().overlaps(&period)) {
            return Err(RepositoryError::Conflict(format!(
                "{} is already paid from {} to {}",
                member.name, prior.period_start, prior.period_end
            ))
            .into());
        }

        let attendance = stores
            .attendance
            .list_all(
                owner,
                &ListQuery::new()
                    .filter("staff_id", member.id.to_string())
                    .between(from, to),
            )
            .await?;
        let input = PayrollInput {
            commission_base: commission_base(stores, owner, member, period).await?,
            allowances: request.allowances,
            deductions: request.deductions,
        };
        computed.push(PayrollRecord::compute(member, period, &attendance, input, at)?);
    }

    let mut saved = Vec::with_capacity(computed.len());
    for record in computed {
        let record = stores.payroll.insert(record).await?;
        if !record.net_pay.is_zero() {
            let expense = FinanceTransaction::create(
                owner,
                TransactionDraft {
                    kind: TransactionKind::Expense,
                    category: PAYROLL_CATEGORY.to_string(),
                    amount: record.net_pay,
                    occurred_on: record.period_end,
                    description: Some(format!(
                        "Payroll {} {}..{}",
                        record.staff_name, record.period_start, record.period_end
                    )),
                    reference: Some(record.id.to_string()),
                },
                at,
            )?;
            stores.finance.insert(expense).await?;
        }
        saved.push(record);
    }

    tx.commit().await?;

    tracing::info!(records = saved.len(), "payroll run complete");
    Ok(saved)
}
