use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use salonbook_core::error::{optional_text, required_text};
use salonbook_core::money::BPS_SCALE;
use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub weekday: Weekday,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

/// Singleton settings record. Its id is derived from the owner id, so each
/// owner has at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSettings {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub business_name: String,
    pub currency: String,
    pub timezone: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub opening_hours: Vec<OpeningHours>,
    /// Spend (in the smallest unit) that earns one loyalty point.
    pub points_per_currency_unit: i64,
    /// Redemption value of one point.
    pub point_value: Money,
    pub default_commission_bps: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full replacement body for `PUT /settings`; omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub business_name: Option<String>,
    pub currency: Option<String>,
    pub timezone: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub opening_hours: Option<Vec<OpeningHours>>,
    pub points_per_currency_unit: Option<i64>,
    pub point_value: Option<Money>,
    pub default_commission_bps: Option<u32>,
}

impl BusinessSettings {
    /// Settings returned for an owner who never saved any.
    pub fn defaults_for(owner_id: OwnerId) -> Self {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
        let seven = NaiveTime::from_hms_opt(19, 0, 0).unwrap_or(NaiveTime::MIN);
        let opening_hours = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ]
        .into_iter()
        .map(|weekday| OpeningHours { weekday, open: nine, close: seven })
        .collect();

        Self {
            id: RecordId::singleton_for(owner_id),
            owner_id,
            version: 0,
            business_name: "My Salon".to_string(),
            currency: "USD".to_string(),
            timezone: "UTC".to_string(),
            phone: None,
            address: None,
            opening_hours,
            points_per_currency_unit: 100,
            point_value: Money::ZERO,
            default_commission_bps: 0,
            updated_at: None,
        }
    }

    pub fn apply_update(&mut self, update: SettingsUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(n) = update.business_name {
            next.business_name = required_text("business_name", &n)?;
        }
        if let Some(c) = update.currency {
            next.currency = validate_currency(&c)?;
        }
        if let Some(tz) = update.timezone {
            next.timezone = required_text("timezone", &tz)?;
        }
        if let Some(p) = update.phone {
            next.phone = optional_text(Some(p));
        }
        if let Some(a) = update.address {
            next.address = optional_text(Some(a));
        }
        if let Some(hours) = update.opening_hours {
            next.opening_hours = validate_hours(hours)?;
        }
        if let Some(p) = update.points_per_currency_unit {
            if p < 0 {
                return Err(DomainError::validation("points_per_currency_unit cannot be negative"));
            }
            next.points_per_currency_unit = p;
        }
        if let Some(v) = update.point_value {
            next.point_value = v;
        }
        if let Some(bps) = update.default_commission_bps {
            if bps as i64 > BPS_SCALE {
                return Err(DomainError::validation("default_commission_bps must be between 0 and 10000"));
            }
            next.default_commission_bps = bps;
        }
        next.updated_at = Some(now);
        *self = next;
        Ok(())
    }

    pub fn is_open(&self, weekday: Weekday, time: NaiveTime) -> bool {
        self.opening_hours
            .iter()
            .any(|h| h.weekday == weekday && time >= h.open && time < h.close)
    }
}

fn validate_currency(code: &str) -> DomainResult<String> {
    let code = code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::validation("currency must be a 3-letter ISO code"));
    }
    Ok(code)
}

fn validate_hours(mut hours: Vec<OpeningHours>) -> DomainResult<Vec<OpeningHours>> {
    for h in &hours {
        if h.close <= h.open {
            return Err(DomainError::validation(format!("{}: close must be after open", h.weekday)));
        }
    }
    hours.sort_by_key(|h| (h.weekday.num_days_from_monday(), h.open));
    for pair in hours.windows(2) {
        if pair[0].weekday == pair[1].weekday && pair[1].open < pair[0].close {
            return Err(DomainError::validation(format!("{}: opening hours overlap", pair[0].weekday)));
        }
    }
    Ok(hours)
}

impl Entity for BusinessSettings {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for BusinessSettings {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for BusinessSettings {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
