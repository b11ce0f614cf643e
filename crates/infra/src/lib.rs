//! `tillpoint-infra` — the row-store boundary and the checkout transaction
//! coordinator.
//!
//! The data store is reached only through per-row read/write/conditional
//! operations plus two custom atomic increment/decrement procedures; no
//! multi-statement transaction primitive is exposed to this layer. The
//! coordinator in [`checkout`] builds an all-or-nothing checkout on top of
//! that surface with a manual prepare/commit/compensate protocol.

pub mod checkout;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use checkout::{CheckoutCoordinator, CheckoutError, CheckoutReceipt, LineFailure};
pub use store::{
    InMemoryRetailStore, ItemFilter, PostgresRetailStore, RetailStore, SaleItemRow, StoreError,
    TransactionFilter,
};
