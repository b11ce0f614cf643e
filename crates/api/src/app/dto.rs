//! Request DTOs and query-string models.
//!
//! Response bodies mostly serialize domain types directly; the envelopes the
//! handlers build are `{ "data": ..., "message": ... }` for writes and
//! `{ "items": [...] }` for listings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use tillpoint_core::CustomerId;
use tillpoint_parties::SettlementAction;

#[derive(Debug, Deserialize, Default)]
pub struct ListItemsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

#[derive(Debug, Deserialize)]
pub struct DebtSettlementRequest {
    pub amount: Decimal,
    pub action: SettlementAction,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListTransactionsQuery {
    pub customer_id: Option<CustomerId>,
    /// "completed" or "pending_debt".
    pub status: Option<String>,
    /// "cash", "online" or "debt".
    pub payment_method: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}
