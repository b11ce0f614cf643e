//! Row-oriented data store boundary.
//!
//! The store exposes exactly what a hosted relational backend offers this
//! layer: per-row reads, per-row writes, conditional updates, and a pair of
//! custom atomic increment/decrement procedures. There is deliberately no
//! multi-row transaction operation here; the checkout coordinator composes
//! these calls into a compensating protocol instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tillpoint_core::{CustomerId, ItemId, TransactionId};
use tillpoint_inventory::{InventoryItem, ItemPatch, NewItem};
use tillpoint_parties::Customer;
use tillpoint_sales::{NewTransaction, PaymentMethod, TransactionRecord, TransactionStatus};

mod in_memory;
mod postgres;

pub use in_memory::{FaultPlan, InMemoryRetailStore};
pub use postgres::PostgresRetailStore;

/// Store operation error.
///
/// The split matters to the coordinator: stock/precondition failures mean
/// the write did not apply and the item can be reported as-is, while
/// infrastructure failures trigger the read-fresh + guarded-write fallback.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    /// The atomic decrement refused to drive stock negative.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// A guarded write's precondition did not hold at write time.
    #[error("write precondition not met: {0}")]
    PreconditionFailed(String),

    /// The atomic procedure is missing or cannot be invoked.
    #[error("atomic procedure unavailable: {0}")]
    ProcedureUnavailable(String),

    /// The store itself failed (network, pool, query error).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Infrastructural failures are eligible for the fallback path;
    /// stock-insufficiency and precondition failures are not.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            StoreError::ProcedureUnavailable(_) | StoreError::Unavailable(_)
        )
    }
}

/// The inventory columns the checkout path reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItemRow {
    pub id: ItemId,
    pub name: String,
    pub selling_price: Decimal,
    pub quantity_in_stock: i64,
}

/// Filters for the inventory registry listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Case-insensitive substring match on name or part number.
    pub search: Option<String>,
    pub category: Option<String>,
    /// Only rows at or below their reorder threshold.
    pub low_stock: bool,
}

/// Filters for the transaction history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    pub customer_id: Option<CustomerId>,
    pub status: Option<TransactionStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: i64,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            customer_id: None,
            status: None,
            payment_method: None,
            start_date: None,
            end_date: None,
            limit: 100,
        }
    }
}

/// Row-oriented retail data store.
///
/// Every mutation is either a store-side atomic operation or an explicitly
/// guarded conditional write; implementations must never blindly overwrite a
/// previously-read value except in [`RetailStore::force_stock`], which exists
/// solely as the rollback path's last resort.
#[async_trait]
pub trait RetailStore: Send + Sync {
    // ── inventory registry ──────────────────────────────────────────────

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<InventoryItem>, StoreError>;

    async fn get_item(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError>;

    async fn insert_item(&self, item: NewItem) -> Result<InventoryItem, StoreError>;

    async fn update_item(&self, id: ItemId, patch: ItemPatch)
    -> Result<InventoryItem, StoreError>;

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError>;

    // ── checkout reads ──────────────────────────────────────────────────

    /// Filter-by-identifier-set read of the columns the POS needs.
    /// Missing identifiers are simply absent from the result.
    async fn fetch_items_for_sale(&self, ids: &[ItemId]) -> Result<Vec<SaleItemRow>, StoreError>;

    /// Fresh single-row stock read (fallback path re-validation).
    async fn fetch_stock(&self, id: ItemId) -> Result<i64, StoreError>;

    // ── atomic stock procedures ─────────────────────────────────────────

    /// Atomic conditional decrement. Must fail (not clamp) if the resulting
    /// stock would go negative.
    async fn decrement_inventory(&self, id: ItemId, by: i64) -> Result<(), StoreError>;

    /// Atomic increment; used for rollback compensation.
    async fn increment_inventory(&self, id: ItemId, by: i64) -> Result<(), StoreError>;

    // ── guarded fallback writes ─────────────────────────────────────────

    /// Decrement expressed as an update-with-precondition: applies only if
    /// `quantity_in_stock >= by` still holds at write time.
    async fn decrement_stock_guarded(&self, id: ItemId, by: i64) -> Result<(), StoreError>;

    /// Blind corrective overwrite with an originally-read "before" value.
    /// Rollback fallback only.
    async fn force_stock(&self, id: ItemId, quantity: i64) -> Result<(), StoreError>;

    // ── customers ───────────────────────────────────────────────────────

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    /// Atomic debt increment procedure.
    async fn increment_customer_debt(
        &self,
        id: CustomerId,
        amount: Decimal,
    ) -> Result<(), StoreError>;

    /// Direct balance write (settlement endpoint and debt fallback path).
    async fn set_customer_debt(
        &self,
        id: CustomerId,
        balance: Decimal,
    ) -> Result<Customer, StoreError>;

    // ── transactions ────────────────────────────────────────────────────

    /// Insert-returning, with the customer's display name joined in.
    async fn insert_transaction(
        &self,
        tx: NewTransaction,
    ) -> Result<TransactionRecord, StoreError>;

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<TransactionRecord>, StoreError>;
}
