use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salonbook_core::error::{optional_text, required_text};
use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

/// Upper bound on a single service's duration (one day).
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// A bookable service on the salon's menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub price: Money,
    /// Inactive services stay on old appointments but cannot be booked.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDraft {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub price: Money,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<u32>,
    pub price: Option<Money>,
    pub active: Option<bool>,
}

impl ServiceItem {
    pub fn create(owner_id: OwnerId, draft: ServiceDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: RecordId::new(),
            owner_id,
            version: 0,
            name: required_text("name", &draft.name)?,
            category: optional_text(draft.category),
            description: optional_text(draft.description),
            duration_minutes: validate_duration(draft.duration_minutes)?,
            price: draft.price,
            active: draft.active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: ServicePatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = match patch.name {
            Some(n) => required_text("name", &n)?,
            None => self.name.clone(),
        };
        let duration = match patch.duration_minutes {
            Some(d) => validate_duration(d)?,
            None => self.duration_minutes,
        };

        self.name = name;
        self.duration_minutes = duration;
        if let Some(c) = patch.category {
            self.category = optional_text(Some(c));
        }
        if let Some(d) = patch.description {
            self.description = optional_text(Some(d));
        }
        if let Some(p) = patch.price {
            self.price = p;
        }
        if let Some(a) = patch.active {
            self.active = a;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Guard used when a service is added to a booking.
    pub fn ensure_bookable(&self) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::invariant(format!(
                "service '{}' is inactive and cannot be booked",
                self.name
            )));
        }
        Ok(())
    }
}

impl Entity for ServiceItem {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for ServiceItem {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for ServiceItem {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

fn validate_duration(minutes: u32) -> DomainResult<u32> {
    if minutes == 0 || minutes > MAX_DURATION_MINUTES {
        return Err(DomainError::validation(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }
    Ok(minutes)
}
