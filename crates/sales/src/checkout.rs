use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillpoint_core::{CustomerId, DomainError, DomainResult, ItemId};

/// How the sale is paid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Online,
    Debt,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
            PaymentMethod::Debt => "debt",
        }
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "online" => Ok(PaymentMethod::Online),
            "debt" => Ok(PaymentMethod::Debt),
            other => Err(DomainError::validation(format!(
                "payment_method must be one of: cash, online, debt (got '{other}')"
            ))),
        }
    }
}

/// One line of the cart. Request-scoped; exists only for the duration of a
/// single checkout call.
///
/// `price` is the unit price as supplied by the caller and is trusted as-is;
/// it is *not* re-validated against the catalog's current selling price, so a
/// malicious client can tamper with it. Known trust gap, kept to preserve the
/// existing client contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: ItemId,
    pub quantity: i64,
    pub price: Decimal,
    /// Display name fallback; the snapshot prefers the inventory row's name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Default tax rate applied when the request omits one.
pub fn default_tax_rate() -> Decimal {
    // 0.08
    Decimal::new(8, 2)
}

/// A full checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
}

impl CheckoutRequest {
    /// Reject empty or malformed carts before any store call is made.
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation(
                "items array is required and cannot be empty",
            ));
        }
        for line in &self.items {
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "quantity for item {} must be positive",
                    line.id
                )));
            }
            if line.price < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "price for item {} cannot be negative",
                    line.id
                )));
            }
        }
        if self.tax_rate < Decimal::ZERO {
            return Err(DomainError::validation("tax_rate cannot be negative"));
        }
        Ok(())
    }

    /// Distinct item identifiers referenced by the cart, in first-seen order.
    pub fn distinct_item_ids(&self) -> Vec<ItemId> {
        let mut ids = Vec::with_capacity(self.items.len());
        for line in &self.items {
            if !ids.contains(&line.id) {
                ids.push(line.id);
            }
        }
        ids
    }
}
