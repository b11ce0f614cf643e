use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillpoint_core::{CustomerId, DomainError, DomainResult};

/// One row of the customers table.
///
/// `debt_balance` is non-negative in normal operation: the checkout path can
/// only increase it, and settlement floors it at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub debt_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a debt-settlement request does to the balance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementAction {
    /// Subtract from the balance, flooring at zero.
    Settle,
    /// Add to the balance.
    Add,
}

/// Compute the balance after a settlement request.
///
/// Settling more than is owed clears the debt rather than going negative.
pub fn apply_settlement(
    current: Decimal,
    action: SettlementAction,
    amount: Decimal,
) -> DomainResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::validation("amount must be positive"));
    }
    Ok(match action {
        SettlementAction::Settle => (current - amount).max(Decimal::ZERO),
        SettlementAction::Add => current + amount,
    })
}
