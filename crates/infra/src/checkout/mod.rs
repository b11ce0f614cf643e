//! Checkout transaction coordinator.
//!
//! The store offers no multi-row transactions, so a checkout is composed as
//! a manual compensating protocol:
//!
//! 1. validate the cart and read the referenced inventory rows,
//! 2. apply an atomic conditional decrement per line (with a guarded-update
//!    fallback when the atomic procedure itself is unavailable),
//! 3. insert the sale transaction,
//! 4. for debt sales, increment the customer's debt balance.
//!
//! Any failure before step 3 completes rolls the applied decrements back and
//! no transaction row is created. A failure in step 4 is deliberately not
//! rolled back: the sale and the stock adjustment stand, and the error names
//! the committed transaction so the ledger can be corrected manually.

mod coordinator;

pub use coordinator::{CheckoutCoordinator, CheckoutError, CheckoutReceipt, LineFailure};
