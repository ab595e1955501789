use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use salonbook_core::error::{optional_text, required_text};
use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Other,
}

/// A salon customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    /// Cached sum of the customer's points ledger.
    pub points_balance: i64,
    pub visit_count: u32,
    pub last_visit_at: Option<DateTime<Utc>>,
    pub total_spent: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDraft {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update. `None` keeps the current value; an empty string clears
/// optional text fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Customer {
    pub fn create(owner_id: OwnerId, draft: CustomerDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = required_text("name", &draft.name)?;
        let phone = validate_phone(optional_text(draft.phone))?;
        let email = validate_email(optional_text(draft.email))?;

        Ok(Self {
            id: RecordId::new(),
            owner_id,
            version: 0,
            name,
            phone,
            email,
            gender: draft.gender,
            birthday: draft.birthday,
            notes: optional_text(draft.notes),
            tags: normalize_tags(draft.tags),
            points_balance: 0,
            visit_count: 0,
            last_visit_at: None,
            total_spent: Money::ZERO,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch. Validation happens before any field changes.
    pub fn apply_patch(&mut self, patch: CustomerPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = match patch.name {
            Some(n) => required_text("name", &n)?,
            None => self.name.clone(),
        };
        let phone = match patch.phone {
            Some(p) => validate_phone(optional_text(Some(p)))?,
            None => self.phone.clone(),
        };
        let email = match patch.email {
            Some(e) => validate_email(optional_text(Some(e)))?,
            None => self.email.clone(),
        };

        self.name = name;
        self.phone = phone;
        self.email = email;
        if let Some(g) = patch.gender {
            self.gender = Some(g);
        }
        if let Some(b) = patch.birthday {
            self.birthday = Some(b);
        }
        if let Some(n) = patch.notes {
            self.notes = optional_text(Some(n));
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Record a completed visit worth `amount`.
    pub fn record_visit(&mut self, amount: Money, at: DateTime<Utc>) -> DomainResult<()> {
        self.total_spent = self.total_spent.checked_add(amount)?;
        self.visit_count = self.visit_count.saturating_add(1);
        self.last_visit_at = Some(match self.last_visit_at {
            Some(prev) if prev > at => prev,
            _ => at,
        });
        self.updated_at = at;
        Ok(())
    }
}

impl Entity for Customer {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Customer {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for Customer {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

fn validate_phone(phone: Option<String>) -> DomainResult<Option<String>> {
    match phone {
        Some(p) if !p.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')')) => {
            Err(DomainError::validation("phone may only contain digits, spaces, '+', '-' and parentheses"))
        }
        Some(p) if !p.chars().any(|c| c.is_ascii_digit()) => {
            Err(DomainError::validation("phone must contain digits"))
        }
        other => Ok(other),
    }
}

fn validate_email(email: Option<String>) -> DomainResult<Option<String>> {
    match email {
        Some(e) if !e.contains('@') => Err(DomainError::validation("email is not valid")),
        Some(e) => Ok(Some(e.to_lowercase())),
        None => Ok(None),
    }
}

/// Lowercase, trim, drop blanks and duplicates (first occurrence wins).
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for t in tags {
        let t = t.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
