use chrono::{DateTime, Utc};

use salonbook_core::OwnerId;
use salonbook_loyalty::{PointsAdjustment, PointsEntry};

use super::WorkflowResult;
use crate::repository::Repository;
use crate::stores::Stores;

pub const TOUCHES: &[&str] = &["points", "customers"];

/// Post a manual points entry and update the customer's cached balance.
pub async fn adjust_points(
    stores: &Stores,
    owner: OwnerId,
    adjustment: PointsAdjustment,
    at: DateTime<Utc>,
) -> WorkflowResult<PointsEntry> {
    let tx = stores.begin().await?;
    let s = tx.stores();
    let mut customer = s.customers.require(owner, adjustment.customer_id).await?;
    let entry = PointsEntry::post(owner, customer.points_balance, adjustment, at)?;
    customer.points_balance = entry.balance_after;
    customer.updated_at = at;
    // The versioned customer write goes first: a concurrent adjustment fails here.
    s.customers.update(customer).await?;
    let entry = s.points.insert(entry).await?;
    tx.commit().await?;
    Ok(entry)
}
