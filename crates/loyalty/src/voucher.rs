use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salonbook_core::error::optional_text;
use salonbook_core::patch::nullable;
use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherKind {
    /// `value` is a whole percentage, 1..=100.
    Percentage,
    /// `value` is an amount in the smallest currency unit.
    Fixed,
}

/// A discount code. Codes are uppercase and unique per owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub code: String,
    pub description: Option<String>,
    pub kind: VoucherKind,
    pub value: i64,
    pub min_spend: Money,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<u32>,
    pub used_count: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoucherDraft {
    pub code: String,
    pub description: Option<String>,
    pub kind: VoucherKind,
    pub value: i64,
    #[serde(default)]
    pub min_spend: Money,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<u32>,
}

/// Partial update. `null` on a validity bound or `max_uses` removes the limit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoucherPatch {
    pub description: Option<String>,
    pub kind: Option<VoucherKind>,
    pub value: Option<i64>,
    pub min_spend: Option<Money>,
    #[serde(default, deserialize_with = "nullable")]
    pub valid_from: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub valid_until: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub max_uses: Option<Option<u32>>,
    pub active: Option<bool>,
}

/// Trim and uppercase a voucher code, rejecting blanks and inner whitespace.
pub fn normalize_code(code: &str) -> DomainResult<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(DomainError::validation("code cannot be empty"));
    }
    if code.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("code cannot contain spaces"));
    }
    Ok(code)
}

impl Voucher {
    pub fn create(owner_id: OwnerId, draft: VoucherDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let v = Self {
            id: RecordId::new(),
            owner_id,
            version: 0,
            code: normalize_code(&draft.code)?,
            description: optional_text(draft.description),
            kind: draft.kind,
            value: draft.value,
            min_spend: draft.min_spend,
            valid_from: draft.valid_from,
            valid_until: draft.valid_until,
            max_uses: draft.max_uses,
            used_count: 0,
            active: true,
            created_at: now,
            updated_at: now,
        };
        v.validate()?;
        Ok(v)
    }

    pub fn apply_patch(&mut self, patch: VoucherPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(d) = patch.description {
            next.description = optional_text(Some(d));
        }
        if let Some(k) = patch.kind {
            next.kind = k;
        }
        if let Some(v) = patch.value {
            next.value = v;
        }
        if let Some(m) = patch.min_spend {
            next.min_spend = m;
        }
        if let Some(t) = patch.valid_from {
            next.valid_from = t;
        }
        if let Some(t) = patch.valid_until {
            next.valid_until = t;
        }
        if let Some(m) = patch.max_uses {
            next.max_uses = m;
        }
        if let Some(a) = patch.active {
            next.active = a;
        }
        next.validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    fn validate(&self) -> DomainResult<()> {
        match self.kind {
            VoucherKind::Percentage if !(1..=100).contains(&self.value) => {
                return Err(DomainError::validation("percentage value must be between 1 and 100"));
            }
            VoucherKind::Fixed if self.value <= 0 => {
                return Err(DomainError::validation("fixed value must be positive"));
            }
            _ => {}
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if until <= from {
                return Err(DomainError::validation("valid_until must be after valid_from"));
            }
        }
        Ok(())
    }

    /// Discount this voucher grants on `amount` at time `at`.
    ///
    /// Fails with an invariant violation when the voucher cannot be redeemed.
    pub fn discount_for(&self, amount: Money, at: DateTime<Utc>) -> DomainResult<Money> {
        if !self.active {
            return Err(DomainError::invariant(format!("voucher {} is inactive", self.code)));
        }
        if self.valid_from.is_some_and(|from| at < from) {
            return Err(DomainError::invariant(format!("voucher {} is not valid yet", self.code)));
        }
        if self.valid_until.is_some_and(|until| at >= until) {
            return Err(DomainError::invariant(format!("voucher {} has expired", self.code)));
        }
        if self.max_uses.is_some_and(|max| self.used_count >= max) {
            return Err(DomainError::invariant(format!("voucher {} has no uses left", self.code)));
        }
        if amount < self.min_spend {
            return Err(DomainError::invariant(format!(
                "voucher {} requires a minimum spend of {}",
                self.code, self.min_spend
            )));
        }

        let discount = match self.kind {
            VoucherKind::Percentage => amount.prorate(self.value as u32, 100),
            VoucherKind::Fixed => Money::new(self.value)?.min(amount),
        };
        Ok(discount)
    }

    pub fn record_use(&mut self, at: DateTime<Utc>) {
        self.used_count = self.used_count.saturating_add(1);
        self.updated_at = at;
    }
}

impl Entity for Voucher {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Voucher {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for Voucher {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft(kind: VoucherKind, value: i64) -> VoucherDraft {
        VoucherDraft {
            code: " spring10 ".to_string(),
            description: None,
            kind,
            value,
            min_spend: Money::ZERO,
            valid_from: None,
            valid_until: None,
            max_uses: None,
        }
    }

    fn m(v: i64) -> Money {
        Money::new(v).unwrap()
    }

    #[test]
    fn code_is_normalized() {
        let v = Voucher::create(OwnerId::new(), draft(VoucherKind::Percentage, 10), Utc::now()).unwrap();
        assert_eq!(v.code, "SPRING10");
        assert!(normalize_code("two words").is_err());
    }

    #[test]
    fn percentage_and_fixed_discounts() {
        let now = Utc::now();
        let pct = Voucher::create(OwnerId::new(), draft(VoucherKind::Percentage, 15), now).unwrap();
        assert_eq!(pct.discount_for(m(1000), now).unwrap(), m(150));

        let fixed = Voucher::create(OwnerId::new(), draft(VoucherKind::Fixed, 500), now).unwrap();
        assert_eq!(fixed.discount_for(m(2000), now).unwrap(), m(500));
        assert_eq!(fixed.discount_for(m(300), now).unwrap(), m(300));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(Voucher::create(OwnerId::new(), draft(VoucherKind::Percentage, 0), Utc::now()).is_err());
        assert!(Voucher::create(OwnerId::new(), draft(VoucherKind::Percentage, 101), Utc::now()).is_err());
        assert!(Voucher::create(OwnerId::new(), draft(VoucherKind::Fixed, -5), Utc::now()).is_err());
    }

    #[test]
    fn redemption_rules() {
        let now = Utc::now();
        let mut d = draft(VoucherKind::Fixed, 100);
        d.valid_from = Some(now - Duration::days(1));
        d.valid_until = Some(now + Duration::days(1));
        d.max_uses = Some(1);
        d.min_spend = m(1000);
        let mut v = Voucher::create(OwnerId::new(), d, now).unwrap();

        assert!(v.discount_for(m(999), now).is_err());
        assert!(v.discount_for(m(1000), now - Duration::days(2)).is_err());
        assert!(v.discount_for(m(1000), now + Duration::days(1)).is_err());
        assert_eq!(v.discount_for(m(1000), now).unwrap(), m(100));

        v.record_use(now);
        assert!(matches!(v.discount_for(m(1000), now), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn inactive_voucher_cannot_be_used() {
        let now = Utc::now();
        let mut v = Voucher::create(OwnerId::new(), draft(VoucherKind::Fixed, 100), now).unwrap();
        v.apply_patch(VoucherPatch { active: Some(false), ..Default::default() }, now).unwrap();
        assert!(v.discount_for(m(1000), now).is_err());
    }

    #[test]
    fn patch_can_lift_expiry_and_use_cap() {
        let now = Utc::now();
        let mut d = draft(VoucherKind::Fixed, 100);
        d.valid_until = Some(now - Duration::days(1));
        d.max_uses = Some(1);
        let mut v = Voucher::create(OwnerId::new(), d, now - Duration::days(3)).unwrap();
        v.record_use(now);
        assert!(v.discount_for(m(1000), now).is_err());

        let patch: VoucherPatch = serde_json::from_str(r#"{"valid_until":null,"max_uses":null}"#).unwrap();
        v.apply_patch(patch, now).unwrap();
        assert_eq!((v.valid_until, v.max_uses), (None, None));
        assert_eq!(v.discount_for(m(1000), now).unwrap(), m(100));

        let keep: VoucherPatch = serde_json::from_str(r#"{"description":"summer"}"#).unwrap();
        v.apply_patch(keep, now).unwrap();
        assert_eq!(v.max_uses, None);
        assert_eq!(v.description.as_deref(), Some("summer"));
    }
}
