use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salonbook_core::error::{optional_text, required_text};
use salonbook_core::{DomainError, DomainResult, Entity, Money, Owned, OwnerId, RecordId, Versioned};

/// A stocked product (shampoo, nail polish, retail items...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub cost_price: Money,
    pub sell_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockItemDraft {
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub cost_price: Money,
    #[serde(default)]
    pub sell_price: Money,
}

/// Quantity is deliberately absent: stock only moves through [`StockItem::adjust`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockItemPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub reorder_level: Option<i64>,
    pub cost_price: Option<Money>,
    pub sell_price: Option<Money>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Restock,
    Usage,
    Sale,
    Correction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
    pub kind: MovementKind,
    pub reason: Option<String>,
}

/// Audit row written for every quantity change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: RecordId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub version: u64,
    pub item_id: RecordId,
    pub delta: i64,
    pub kind: MovementKind,
    pub reason: Option<String>,
    pub quantity_after: i64,
    pub created_at: DateTime<Utc>,
}

impl StockItem {
    pub fn create(owner_id: OwnerId, draft: StockItemDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        if draft.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        Ok(Self {
            id: RecordId::new(),
            owner_id,
            version: 0,
            name: required_text("name", &draft.name)?,
            sku: optional_text(draft.sku).map(|s| s.to_uppercase()),
            category: optional_text(draft.category),
            unit: optional_text(draft.unit).unwrap_or_else(|| "pcs".to_string()),
            quantity: draft.quantity,
            reorder_level: validate_reorder_level(draft.reorder_level)?,
            cost_price: draft.cost_price,
            sell_price: draft.sell_price,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: StockItemPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = match patch.name {
            Some(n) => required_text("name", &n)?,
            None => self.name.clone(),
        };
        let reorder_level = match patch.reorder_level {
            Some(r) => validate_reorder_level(r)?,
            None => self.reorder_level,
        };

        self.name = name;
        self.reorder_level = reorder_level;
        if let Some(s) = patch.sku {
            self.sku = optional_text(Some(s)).map(|s| s.to_uppercase());
        }
        if let Some(c) = patch.category {
            self.category = optional_text(Some(c));
        }
        if let Some(u) = optional_text(patch.unit) {
            self.unit = u;
        }
        if let Some(p) = patch.cost_price {
            self.cost_price = p;
        }
        if let Some(p) = patch.sell_price {
            self.sell_price = p;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Change the quantity by `delta` and return the movement to persist.
    pub fn adjust(&mut self, adjustment: StockAdjustment, at: DateTime<Utc>) -> DomainResult<StockMovement> {
        if adjustment.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let new_quantity = self
            .quantity
            .checked_add(adjustment.delta)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
        if new_quantity < 0 {
            return Err(DomainError::invariant(format!(
                "insufficient stock: {} on hand, {} requested",
                self.quantity, -adjustment.delta
            )));
        }

        self.quantity = new_quantity;
        self.updated_at = at;
        Ok(StockMovement {
            id: RecordId::new(),
            owner_id: self.owner_id,
            version: 0,
            item_id: self.id,
            delta: adjustment.delta,
            kind: adjustment.kind,
            reason: optional_text(adjustment.reason),
            quantity_after: new_quantity,
            created_at: at,
        })
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Quantity valued at cost.
    pub fn stock_value(&self) -> Money {
        let v = (self.cost_price.amount() as i128 * self.quantity.max(0) as i128).min(i64::MAX as i128);
        Money::new(v as i64).unwrap_or(Money::ZERO)
    }
}

fn validate_reorder_level(level: i64) -> DomainResult<i64> {
    if level < 0 {
        return Err(DomainError::validation("reorder_level cannot be negative"));
    }
    Ok(level)
}

impl Entity for StockItem {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for StockItem {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for StockItem {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Entity for StockMovement {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for StockMovement {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Versioned for StockMovement {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
