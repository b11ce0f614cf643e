use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use tillpoint_core::{CustomerId, DomainError, ItemId, StaffId};
use tillpoint_sales::{
    CheckoutRequest, CheckoutTotals, NewTransaction, PaymentMethod, TransactionLine,
    TransactionRecord, TransactionStatus,
};

use crate::store::{RetailStore, SaleItemRow, StoreError};

/// A per-line failure from the decrement phase, reported to the caller with
/// the rest of the lines' outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct LineFailure {
    pub item_id: ItemId,
    pub error: String,
}

/// Successful checkout result: the stored transaction plus the totals
/// breakdown it was priced with.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub transaction: TransactionRecord,
    pub totals: CheckoutTotals,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// Cart references items the registry has no rows for.
    #[error("unknown items in cart")]
    UnknownItems(Vec<ItemId>),

    /// One or more lines could not be covered by available stock. Nothing
    /// was committed; applied decrements were rolled back.
    #[error("insufficient stock")]
    InsufficientStock(Vec<LineFailure>),

    /// One or more decrements failed for reasons other than stock (store
    /// faults the fallback could not absorb). Nothing was committed.
    #[error("inventory adjustment failed")]
    Adjustment(Vec<LineFailure>),

    /// All decrements applied but the transaction insert failed. Stock was
    /// rolled back and no sale exists.
    #[error("transaction could not be recorded")]
    Commit { source: StoreError },

    /// The sale committed but the customer's debt balance was not updated.
    /// The transaction stands; the error names it so the discrepancy can be
    /// resolved against the customer ledger.
    #[error("sale {} recorded but debt update failed for customer {customer_id}", .transaction.id)]
    DebtUpdate {
        transaction: Box<TransactionRecord>,
        customer_id: CustomerId,
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A decrement that has been applied and may need compensating.
struct AppliedDecrement {
    item_id: ItemId,
    quantity: i64,
    /// Stock as read before the decrement phase; last-resort rollback value.
    stock_before: i64,
}

/// Orchestrates a checkout over the row store.
///
/// One instance is shared across requests; it holds no per-checkout state.
pub struct CheckoutCoordinator {
    store: Arc<dyn RetailStore>,
}

impl CheckoutCoordinator {
    pub fn new(store: Arc<dyn RetailStore>) -> Self {
        Self { store }
    }

    /// Runs the full checkout protocol. Not idempotent: retrying a failed
    /// call re-attempts the decrements from scratch.
    ///
    /// Dropping the future mid-protocol (caller timeout, disconnect) can
    /// strand applied decrements; there is no coordinator-side recovery for
    /// an abandoned run.
    pub async fn execute(
        &self,
        staff_id: StaffId,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        request.validate()?;

        let ids = request.distinct_item_ids();
        let rows = self.store.fetch_items_for_sale(&ids).await?;
        let rows: HashMap<ItemId, SaleItemRow> =
            rows.into_iter().map(|row| (row.id, row)).collect();

        let missing: Vec<ItemId> = ids.iter().copied().filter(|id| !rows.contains_key(id)).collect();
        if !missing.is_empty() {
            return Err(CheckoutError::UnknownItems(missing));
        }

        // Advisory pass: reject obvious shortfalls before any write. The
        // atomic decrement re-checks, so a stale read here only costs an
        // earlier, cheaper failure.
        let shortfalls: Vec<LineFailure> = request
            .items
            .iter()
            .filter(|line| rows[&line.id].quantity_in_stock < line.quantity)
            .map(|line| LineFailure {
                item_id: line.id,
                error: format!(
                    "insufficient stock: available {}, requested {}",
                    rows[&line.id].quantity_in_stock, line.quantity
                ),
            })
            .collect();
        if !shortfalls.is_empty() {
            return Err(CheckoutError::InsufficientStock(shortfalls));
        }

        // Decrement phase. Every line is attempted so the caller gets the
        // full set of failures, not just the first.
        let mut applied: Vec<AppliedDecrement> = Vec::with_capacity(request.items.len());
        let mut failures: Vec<LineFailure> = Vec::new();
        let mut stock_failure_only = true;

        for line in &request.items {
            match self.decrement_line(line.id, line.quantity).await {
                Ok(()) => applied.push(AppliedDecrement {
                    item_id: line.id,
                    quantity: line.quantity,
                    stock_before: rows[&line.id].quantity_in_stock,
                }),
                Err(err) => {
                    if !matches!(
                        err,
                        StoreError::InsufficientStock { .. } | StoreError::PreconditionFailed(_)
                    ) {
                        stock_failure_only = false;
                    }
                    failures.push(LineFailure {
                        item_id: line.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            warn!(
                failed = failures.len(),
                applied = applied.len(),
                "checkout decrement phase failed, rolling back"
            );
            self.rollback_decrements(&applied).await;
            return Err(if stock_failure_only {
                CheckoutError::InsufficientStock(failures)
            } else {
                CheckoutError::Adjustment(failures)
            });
        }

        let totals = CheckoutTotals::compute(&request.items, request.tax_rate);
        let status = TransactionStatus::derive(request.payment_method, request.customer_id);
        let snapshot: Vec<TransactionLine> = request
            .items
            .iter()
            .map(|line| TransactionLine {
                id: line.id,
                name: rows
                    .get(&line.id)
                    .map(|row| row.name.clone())
                    .or_else(|| line.name.clone())
                    .unwrap_or_else(|| line.id.to_string()),
                quantity: line.quantity,
                price: line.price,
            })
            .collect();

        let transaction = match self
            .store
            .insert_transaction(NewTransaction {
                customer_id: request.customer_id,
                staff_id,
                total_amount: totals.total,
                payment_method: request.payment_method,
                status,
                items: snapshot,
            })
            .await
        {
            Ok(record) => record,
            Err(source) => {
                warn!(error = %source, "transaction insert failed, rolling back stock");
                self.rollback_decrements(&applied).await;
                return Err(CheckoutError::Commit { source });
            }
        };

        if request.payment_method == PaymentMethod::Debt {
            if let Some(customer_id) = request.customer_id {
                if let Err(source) = self.apply_debt(customer_id, totals.total).await {
                    warn!(
                        transaction_id = %transaction.id,
                        %customer_id,
                        error = %source,
                        "sale committed but debt balance was not updated"
                    );
                    return Err(CheckoutError::DebtUpdate {
                        transaction: Box::new(transaction),
                        customer_id,
                        source,
                    });
                }
            }
        }

        info!(
            transaction_id = %transaction.id,
            total = %totals.total,
            status = %transaction.status,
            "checkout committed"
        );
        Ok(CheckoutReceipt { transaction, totals })
    }

    /// Atomic decrement with the guarded-update fallback.
    ///
    /// The fallback runs only on infrastructure failure: the fresh read plus
    /// conditional write reproduces the procedure's check-and-decrement, at
    /// the cost of one extra round trip. Stock failures are final.
    async fn decrement_line(&self, item_id: ItemId, quantity: i64) -> Result<(), StoreError> {
        let err = match self.store.decrement_inventory(item_id, quantity).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        if !err.is_infrastructure() {
            return Err(err);
        }
        warn!(%item_id, error = %err, "atomic decrement unavailable, using guarded update");

        let fresh = self.store.fetch_stock(item_id).await?;
        if fresh < quantity {
            return Err(StoreError::InsufficientStock {
                available: fresh,
                requested: quantity,
            });
        }
        self.store.decrement_stock_guarded(item_id, quantity).await
    }

    /// Best-effort compensation of applied decrements. Failures are logged,
    /// not propagated; the caller's error already describes the checkout
    /// outcome.
    async fn rollback_decrements(&self, applied: &[AppliedDecrement]) {
        for dec in applied {
            let err = match self
                .store
                .increment_inventory(dec.item_id, dec.quantity)
                .await
            {
                Ok(()) => continue,
                Err(err) => err,
            };
            if err.is_infrastructure() {
                // Corrective overwrite with the originally-read quantity.
                // Loses concurrent adjustments made in the window, accepted
                // as the last resort over leaving stock decremented.
                if let Err(err) = self.store.force_stock(dec.item_id, dec.stock_before).await {
                    warn!(item_id = %dec.item_id, error = %err, "stock rollback failed");
                }
            } else {
                warn!(item_id = %dec.item_id, error = %err, "stock rollback failed");
            }
        }
    }

    /// Atomic debt increment with a read-then-write fallback.
    async fn apply_debt(&self, customer_id: CustomerId, amount: Decimal) -> Result<(), StoreError> {
        let err = match self.store.increment_customer_debt(customer_id, amount).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        if !err.is_infrastructure() {
            return Err(err);
        }
        warn!(%customer_id, error = %err, "atomic debt increment unavailable, using read-then-write");

        let customer = self
            .store
            .get_customer(customer_id)
            .await?
            .ok_or(StoreError::NotFound)?;
        self.store
            .set_customer_debt(customer_id, customer.debt_balance + amount)
            .await?;
        Ok(())
    }
}
