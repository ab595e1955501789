use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use salonbook_core::error::{optional_text, required_text};
use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

/// One money movement in or out of the business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinanceTransaction {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub kind: TransactionKind,
    /// Lowercased bucket, e.g. `services`, `payroll`, `rent`.
    pub category: String,
    pub amount: Money,
    pub occurred_on: NaiveDate,
    pub description: Option<String>,
    /// Id of the appointment or payroll record this was generated from.
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionDraft {
    pub kind: TransactionKind,
    pub category: String,
    pub amount: Money,
    pub occurred_on: NaiveDate,
    pub description: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPatch {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub amount: Option<Money>,
    pub occurred_on: Option<NaiveDate>,
    pub description: Option<String>,
}

impl FinanceTransaction {
    pub fn create(owner_id: OwnerId, draft: TransactionDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: RecordId::new(),
            owner_id,
            version: 0,
            kind: draft.kind,
            category: normalize_category(&draft.category)?,
            amount: positive(draft.amount)?,
            occurred_on: draft.occurred_on,
            description: optional_text(draft.description),
            reference: optional_text(draft.reference),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: TransactionPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let category = match patch.category {
            Some(c) => normalize_category(&c)?,
            None => self.category.clone(),
        };
        let amount = match patch.amount {
            Some(a) => positive(a)?,
            None => self.amount,
        };
        self.category = category;
        self.amount = amount;
        if let Some(k) = patch.kind {
            self.kind = k;
        }
        if let Some(d) = patch.occurred_on {
            self.occurred_on = d;
        }
        if let Some(d) = patch.description {
            self.description = optional_text(Some(d));
        }
        self.updated_at = now;
        Ok(())
    }
}

fn normalize_category(category: &str) -> DomainResult<String> {
    required_text("category", category).map(|c| c.to_lowercase())
}

fn positive(amount: Money) -> DomainResult<Money> {
    if amount.is_zero() {
        return Err(DomainError::validation("amount must be greater than zero"));
    }
    Ok(amount)
}

impl Entity for FinanceTransaction {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for FinanceTransaction {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for FinanceTransaction {
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

    fn draft(amount: i64) -> TransactionDraft {
        TransactionDraft {
            kind: TransactionKind::Expense,
            category: " Rent ".to_string(),
            amount: Money::new(amount).unwrap(),
            occurred_on: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            description: Some("January".to_string()),
            reference: None,
        }
    }

    #[test]
    fn create_normalizes_category() {
        let t = FinanceTransaction::create(OwnerId::new(), draft(100), Utc::now()).unwrap();
        assert_eq!(t.category, "rent");
    }

    #[test]
    fn zero_amount_rejected() {
        assert!(matches!(
            FinanceTransaction::create(OwnerId::new(), draft(0), Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn patch_is_validated_first() {
        let mut t = FinanceTransaction::create(OwnerId::new(), draft(100), Utc::now()).unwrap();
        let before = t.clone();
        let res = t.apply_patch(
            TransactionPatch { category: Some("utilities".into()), amount: Some(Money::ZERO), ..Default::default() },
            Utc::now(),
        );
        assert!(res.is_err());
        assert_eq!(t, before);
    }
}
