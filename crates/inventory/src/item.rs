use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillpoint_core::{DomainError, DomainResult, ItemId};

/// Default reorder threshold applied when a new item omits one.
pub const DEFAULT_MIN_STOCK_LEVEL: i64 = 5;

/// One row of the inventory table.
///
/// Mutated by the checkout coordinator (decrement on sale, increment on
/// rollback) and by the CRUD editors. Invariant: `quantity_in_stock` must
/// never be driven below zero by a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub part_number: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub quantity_in_stock: i64,
    pub min_stock_level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// At or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity_in_stock <= self.min_stock_level
    }
}

/// Input for creating an inventory row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub part_number: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    #[serde(default)]
    pub quantity_in_stock: i64,
    #[serde(default = "default_min_stock_level")]
    pub min_stock_level: i64,
}

fn default_min_stock_level() -> i64 {
    DEFAULT_MIN_STOCK_LEVEL
}

impl NewItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.part_number.trim().is_empty() {
            return Err(DomainError::validation("part_number cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.cost_price < Decimal::ZERO {
            return Err(DomainError::validation("cost_price cannot be negative"));
        }
        if self.selling_price < Decimal::ZERO {
            return Err(DomainError::validation("selling_price cannot be negative"));
        }
        if self.quantity_in_stock < 0 {
            return Err(DomainError::validation(
                "quantity_in_stock cannot be negative",
            ));
        }
        if self.min_stock_level < 0 {
            return Err(DomainError::validation("min_stock_level cannot be negative"));
        }
        Ok(())
    }
}

/// Partial update for an inventory row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub part_number: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub quantity_in_stock: Option<i64>,
    pub min_stock_level: Option<i64>,
}

impl ItemPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(pn) = &self.part_number {
            if pn.trim().is_empty() {
                return Err(DomainError::validation("part_number cannot be empty"));
            }
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }
        if matches!(self.cost_price, Some(p) if p < Decimal::ZERO) {
            return Err(DomainError::validation("cost_price cannot be negative"));
        }
        if matches!(self.selling_price, Some(p) if p < Decimal::ZERO) {
            return Err(DomainError::validation("selling_price cannot be negative"));
        }
        if matches!(self.quantity_in_stock, Some(q) if q < 0) {
            return Err(DomainError::validation(
                "quantity_in_stock cannot be negative",
            ));
        }
        if matches!(self.min_stock_level, Some(m) if m < 0) {
            return Err(DomainError::validation("min_stock_level cannot be negative"));
        }
        Ok(())
    }

    /// Apply the patch to an existing row, bumping `updated_at`.
    pub fn apply_to(&self, item: &mut InventoryItem, now: DateTime<Utc>) {
        if let Some(pn) = &self.part_number {
            item.part_number = pn.clone();
        }
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(desc) = &self.description {
            item.description = Some(desc.clone());
        }
        if let Some(cat) = &self.category {
            item.category = Some(cat.clone());
        }
        if let Some(p) = self.cost_price {
            item.cost_price = p;
        }
        if let Some(p) = self.selling_price {
            item.selling_price = p;
        }
        if let Some(q) = self.quantity_in_stock {
            item.quantity_in_stock = q;
        }
        if let Some(m) = self.min_stock_level {
            item.min_stock_level = m;
        }
        item.updated_at = now;
    }
}
