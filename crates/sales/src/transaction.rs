use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillpoint_core::{CustomerId, ItemId, StaffId, TransactionId};

use crate::checkout::PaymentMethod;

/// Lifecycle status of a sale transaction.
///
/// Created as `pending_debt` only when the sale is on debt *and* a customer
/// is attached; otherwise `completed`. Other parts of the system may update
/// the status out of band (e.g. when debt is later settled); this core never
/// mutates a transaction after creation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    PendingDebt,
}

impl TransactionStatus {
    /// Status rule for a new sale.
    pub fn derive(payment_method: PaymentMethod, customer_id: Option<CustomerId>) -> Self {
        match (payment_method, customer_id) {
            (PaymentMethod::Debt, Some(_)) => TransactionStatus::PendingDebt,
            _ => TransactionStatus::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::PendingDebt => "pending_debt",
        }
    }
}

impl core::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionStatus {
    type Err = tillpoint_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TransactionStatus::Completed),
            "pending_debt" => Ok(TransactionStatus::PendingDebt),
            other => Err(tillpoint_core::DomainError::validation(format!(
                "status must be 'completed' or 'pending_debt' (got '{other}')"
            ))),
        }
    }
}

/// Line-item snapshot embedded in the transaction row.
///
/// Captured at sale time; immutable and independent of later inventory or
/// customer changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub id: ItemId,
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
}

/// Input for the insert-returning transaction write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub customer_id: Option<CustomerId>,
    pub staff_id: StaffId,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub items: Vec<TransactionLine>,
}

/// A stored sale transaction, with the customer's display name joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub customer_id: Option<CustomerId>,
    pub customer_name: Option<String>,
    pub staff_id: StaffId,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub items: Vec<TransactionLine>,
    pub created_at: DateTime<Utc>,
}
