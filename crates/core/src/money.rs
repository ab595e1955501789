//! Money amounts in the smallest currency unit.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Basis points in one whole (100%).
pub const BPS_SCALE: i64 = 10_000;

/// A non-negative amount in the smallest currency unit (e.g. cents).
///
/// Currency is a per-owner setting, so amounts carry no currency code.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn new(amount: i64) -> DomainResult<Self> {
        if amount < 0 {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        Ok(Self(amount))
    }

    pub fn amount(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Apply a basis-point rate (e.g. 1500 = 15%), rounding down.
    pub fn apply_bps(self, bps: u32) -> Money {
        let scaled = (self.0 as i128 * bps as i128) / BPS_SCALE as i128;
        Money(scaled.min(i64::MAX as i128) as i64)
    }

    /// Scale by `numerator / denominator`, rounding down. A zero denominator yields zero.
    pub fn prorate(self, numerator: u32, denominator: u32) -> Money {
        if denominator == 0 {
            return Money::ZERO;
        }
        let scaled = (self.0 as i128 * numerator as i128) / denominator as i128;
        Money(scaled.min(i64::MAX as i128) as i64)
    }

    pub fn sum<I: IntoIterator<Item = Money>>(items: I) -> DomainResult<Money> {
        items.into_iter().try_fold(Money::ZERO, Money::checked_add)
    }
}

impl TryFrom<i64> for Money {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
