//! `tillpoint-sales` — POS checkout request model, totals, and the sale
//! transaction record.

pub mod checkout;
pub mod totals;
pub mod transaction;

pub use checkout::{CartLine, CheckoutRequest, PaymentMethod, default_tax_rate};
pub use totals::CheckoutTotals;
pub use transaction::{NewTransaction, TransactionLine, TransactionRecord, TransactionStatus};
