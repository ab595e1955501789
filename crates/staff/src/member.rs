use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use salonbook_core::error::{optional_text, required_text};
use salonbook_core::money::BPS_SCALE;
use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

/// A stylist, therapist, receptionist...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub name: String,
    pub role_title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Monthly base salary.
    pub base_salary: Money,
    /// Commission on completed services, in basis points (1500 = 15%).
    pub commission_rate_bps: u32,
    pub active: bool,
    pub hired_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaffDraft {
    pub name: String,
    pub role_title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub base_salary: Money,
    /// Falls back to the business default when omitted.
    pub commission_rate_bps: Option<u32>,
    pub hired_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffPatch {
    pub name: Option<String>,
    pub role_title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub base_salary: Option<Money>,
    pub commission_rate_bps: Option<u32>,
    pub active: Option<bool>,
    pub hired_on: Option<NaiveDate>,
}

impl StaffMember {
    pub fn create(
        owner_id: OwnerId,
        draft: StaffDraft,
        default_commission_bps: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let rate = validate_rate(draft.commission_rate_bps.unwrap_or(default_commission_bps))?;
        Ok(Self {
            id: RecordId::new(),
            owner_id,
            version: 0,
            name: required_text("name", &draft.name)?,
            role_title: optional_text(draft.role_title),
            phone: optional_text(draft.phone),
            email: optional_text(draft.email).map(|e| e.to_lowercase()),
            base_salary: draft.base_salary,
            commission_rate_bps: rate,
            active: true,
            hired_on: draft.hired_on,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: StaffPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = match patch.name {
            Some(n) => required_text("name", &n)?,
            None => self.name.clone(),
        };
        let rate = match patch.commission_rate_bps {
            Some(r) => validate_rate(r)?,
            None => self.commission_rate_bps,
        };

        self.name = name;
        self.commission_rate_bps = rate;
        if let Some(v) = patch.role_title {
            self.role_title = optional_text(Some(v));
        }
        if let Some(v) = patch.phone {
            self.phone = optional_text(Some(v));
        }
        if let Some(v) = patch.email {
            self.email = optional_text(Some(v)).map(|e| e.to_lowercase());
        }
        if let Some(v) = patch.base_salary {
            self.base_salary = v;
        }
        if let Some(v) = patch.active {
            self.active = v;
        }
        if let Some(v) = patch.hired_on {
            self.hired_on = Some(v);
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for StaffMember {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for StaffMember {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for StaffMember {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

pub(crate) fn validate_rate(bps: u32) -> DomainResult<u32> {
    if bps as i64 > BPS_SCALE {
        return Err(DomainError::validation("commission_rate_bps must be between 0 and 10000"));
    }
    Ok(bps)
}
