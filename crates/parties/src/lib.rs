//! `tillpoint-parties` — customer registry and debt ledger arithmetic.

pub mod customer;

pub use customer::{Customer, SettlementAction, apply_settlement};
