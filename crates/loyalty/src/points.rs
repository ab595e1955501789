//! Points ledger.
//!
//! A customer's balance is the sum of their entries' deltas and may never
//! drop below zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salonbook_core::error::{optional_text, required_text};
use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub customer_id: RecordId,
    pub delta: i64,
    pub reason: String,
    /// Appointment id or other origin, when there is one.
    pub reference: Option<String>,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

/// Manual adjustment request.
#[derive(Debug, Clone, Deserialize)]
pub struct PointsAdjustment {
    pub customer_id: RecordId,
    pub delta: i64,
    pub reason: String,
    pub reference: Option<String>,
}

impl PointsEntry {
    /// Build the next ledger entry given the customer's current balance.
    pub fn post(
        owner_id: OwnerId,
        current_balance: i64,
        adjustment: PointsAdjustment,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if adjustment.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let balance_after = current_balance
            .checked_add(adjustment.delta)
            .ok_or_else(|| DomainError::invariant("points overflow"))?;
        if balance_after < 0 {
            return Err(DomainError::invariant(format!(
                "insufficient points: balance {current_balance}, requested {}",
                -adjustment.delta
            )));
        }
        Ok(Self {
            id: RecordId::new(),
            owner_id,
            version: 0,
            customer_id: adjustment.customer_id,
            delta: adjustment.delta,
            reason: required_text("reason", &adjustment.reason)?,
            reference: optional_text(adjustment.reference),
            balance_after,
            created_at: at,
        })
    }
}

pub fn balance<'a>(entries: impl IntoIterator<Item = &'a PointsEntry>) -> i64 {
    entries.into_iter().map(|e| e.delta).sum()
}

/// Points earned for `spend`: one point per full `unit` spent. A zero unit disables earning.
pub fn points_for_spend(spend: Money, unit: i64) -> i64 {
    if unit <= 0 {
        return 0;
    }
    spend.amount() / unit
}

impl Entity for PointsEntry {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for PointsEntry {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for PointsEntry {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
