use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use tillpoint_core::{CustomerId, ItemId, TransactionId};
use tillpoint_inventory::{InventoryItem, ItemPatch, NewItem};
use tillpoint_parties::Customer;
use tillpoint_sales::{NewTransaction, TransactionRecord};

use super::{ItemFilter, RetailStore, SaleItemRow, StoreError, TransactionFilter};

/// Switches that make a specific store operation fail on demand.
///
/// Tests flip these to force the coordinator down its fallback, rollback and
/// post-commit failure paths; all default to off.
#[derive(Debug, Default)]
pub struct FaultPlan {
    /// `decrement_inventory` reports the procedure as missing.
    pub fail_decrement_procedure: AtomicBool,
    /// `increment_inventory` reports the procedure as missing.
    pub fail_increment_procedure: AtomicBool,
    /// `decrement_stock_guarded` fails as an outage.
    pub fail_guarded_decrement: AtomicBool,
    /// `insert_transaction` fails as an outage.
    pub fail_transaction_insert: AtomicBool,
    /// `increment_customer_debt` reports the procedure as missing.
    pub fail_debt_procedure: AtomicBool,
    /// `set_customer_debt` fails as an outage.
    pub fail_debt_write: AtomicBool,
    /// Both decrement paths fail as an outage for this item only.
    pub poison_item: Mutex<Option<ItemId>>,
}

impl FaultPlan {
    fn tripped(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }

    fn poisons(&self, id: ItemId) -> bool {
        self.poison_item
            .lock()
            .map(|slot| *slot == Some(id))
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct State {
    items: HashMap<ItemId, InventoryItem>,
    customers: HashMap<CustomerId, Customer>,
    transactions: Vec<TransactionRecord>,
}

/// In-memory retail store.
///
/// Intended for tests/dev. Every operation takes the single lock once, so
/// each call is atomic with respect to concurrent callers, mirroring the
/// per-row atomicity the hosted backend provides.
#[derive(Debug, Default)]
pub struct InMemoryRetailStore {
    state: RwLock<State>,
    faults: FaultPlan,
}

impl InMemoryRetailStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    pub fn seed_item(&self, item: InventoryItem) {
        let mut state = self.state.write().expect("store lock poisoned");
        state.items.insert(item.id, item);
    }

    pub fn seed_customer(&self, customer: Customer) {
        let mut state = self.state.write().expect("store lock poisoned");
        state.customers.insert(customer.id, customer);
    }

    /// Count of stored transactions; used by tests to assert "no sale was
    /// recorded".
    pub fn transaction_count(&self) -> usize {
        self.state
            .read()
            .expect("store lock poisoned")
            .transactions
            .len()
    }
}

fn matches_search(item: &InventoryItem, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    item.name.to_lowercase().contains(&needle)
        || item.part_number.to_lowercase().contains(&needle)
}

#[async_trait]
impl RetailStore for InMemoryRetailStore {
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<InventoryItem>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let mut items: Vec<InventoryItem> = state
            .items
            .values()
            .filter(|item| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|s| matches_search(item, s))
            })
            .filter(|item| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|c| item.category.as_deref() == Some(c))
            })
            .filter(|item| !filter.low_stock || item.is_low_stock())
            .cloned()
            .collect();

        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(state.items.get(&id).cloned())
    }

    async fn insert_item(&self, item: NewItem) -> Result<InventoryItem, StoreError> {
        let now = Utc::now();
        let row = InventoryItem {
            id: ItemId::new(),
            part_number: item.part_number,
            name: item.name,
            description: item.description,
            category: item.category,
            cost_price: item.cost_price,
            selling_price: item.selling_price,
            quantity_in_stock: item.quantity_in_stock,
            min_stock_level: item.min_stock_level,
            created_at: now,
            updated_at: now,
        };

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        state.items.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_item(
        &self,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<InventoryItem, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let item = state.items.get_mut(&id).ok_or(StoreError::NotFound)?;
        patch.apply_to(item, Utc::now());
        Ok(item.clone())
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        state.items.remove(&id).ok_or(StoreError::NotFound)?;
        Ok(())
    }

    async fn fetch_items_for_sale(&self, ids: &[ItemId]) -> Result<Vec<SaleItemRow>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(ids
            .iter()
            .filter_map(|id| state.items.get(id))
            .map(|item| SaleItemRow {
                id: item.id,
                name: item.name.clone(),
                selling_price: item.selling_price,
                quantity_in_stock: item.quantity_in_stock,
            })
            .collect())
    }

    async fn fetch_stock(&self, id: ItemId) -> Result<i64, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        state
            .items
            .get(&id)
            .map(|item| item.quantity_in_stock)
            .ok_or(StoreError::NotFound)
    }

    async fn decrement_inventory(&self, id: ItemId, by: i64) -> Result<(), StoreError> {
        if self.faults.poisons(id) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        if FaultPlan::tripped(&self.faults.fail_decrement_procedure) {
            return Err(StoreError::ProcedureUnavailable(
                "decrement_inventory procedure not installed".to_string(),
            ));
        }

        // Check-and-decrement under one write guard: indivisible with respect
        // to other callers, like the store-side procedure it stands in for.
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let item = state.items.get_mut(&id).ok_or(StoreError::NotFound)?;
        if item.quantity_in_stock < by {
            return Err(StoreError::InsufficientStock {
                available: item.quantity_in_stock,
                requested: by,
            });
        }
        item.quantity_in_stock -= by;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn increment_inventory(&self, id: ItemId, by: i64) -> Result<(), StoreError> {
        if FaultPlan::tripped(&self.faults.fail_increment_procedure) {
            return Err(StoreError::ProcedureUnavailable(
                "increment_inventory procedure not installed".to_string(),
            ));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let item = state.items.get_mut(&id).ok_or(StoreError::NotFound)?;
        item.quantity_in_stock += by;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn decrement_stock_guarded(&self, id: ItemId, by: i64) -> Result<(), StoreError> {
        if self.faults.poisons(id) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        if FaultPlan::tripped(&self.faults.fail_guarded_decrement) {
            return Err(StoreError::Unavailable(
                "guarded update rejected by store".to_string(),
            ));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let item = state.items.get_mut(&id).ok_or(StoreError::NotFound)?;
        if item.quantity_in_stock < by {
            return Err(StoreError::PreconditionFailed(format!(
                "quantity_in_stock >= {by} no longer holds"
            )));
        }
        item.quantity_in_stock -= by;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn force_stock(&self, id: ItemId, quantity: i64) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let item = state.items.get_mut(&id).ok_or(StoreError::NotFound)?;
        item.quantity_in_stock = quantity;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(state.customers.get(&id).cloned())
    }

    async fn increment_customer_debt(
        &self,
        id: CustomerId,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        if FaultPlan::tripped(&self.faults.fail_debt_procedure) {
            return Err(StoreError::ProcedureUnavailable(
                "increment_customer_debt procedure not installed".to_string(),
            ));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let customer = state.customers.get_mut(&id).ok_or(StoreError::NotFound)?;
        customer.debt_balance += amount;
        customer.updated_at = Utc::now();
        Ok(())
    }

    async fn set_customer_debt(
        &self,
        id: CustomerId,
        balance: Decimal,
    ) -> Result<Customer, StoreError> {
        if FaultPlan::tripped(&self.faults.fail_debt_write) {
            return Err(StoreError::Unavailable(
                "customers update rejected by store".to_string(),
            ));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let customer = state.customers.get_mut(&id).ok_or(StoreError::NotFound)?;
        customer.debt_balance = balance;
        customer.updated_at = Utc::now();
        Ok(customer.clone())
    }

    async fn insert_transaction(
        &self,
        tx: NewTransaction,
    ) -> Result<TransactionRecord, StoreError> {
        if FaultPlan::tripped(&self.faults.fail_transaction_insert) {
            return Err(StoreError::Unavailable(
                "transactions insert rejected by store".to_string(),
            ));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let customer_name = tx
            .customer_id
            .and_then(|id| state.customers.get(&id))
            .map(|c| c.name.clone());

        let record = TransactionRecord {
            id: TransactionId::new(),
            customer_id: tx.customer_id,
            customer_name,
            staff_id: tx.staff_id,
            total_amount: tx.total_amount,
            payment_method: tx.payment_method,
            status: tx.status,
            items: tx.items,
            created_at: Utc::now(),
        };
        state.transactions.push(record.clone());
        Ok(record)
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let mut records: Vec<TransactionRecord> = state
            .transactions
            .iter()
            .filter(|t| filter.customer_id.is_none_or(|id| t.customer_id == Some(id)))
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| filter.payment_method.is_none_or(|m| t.payment_method == m))
            .filter(|t| filter.start_date.is_none_or(|d| t.created_at >= d))
            .filter(|t| filter.end_date.is_none_or(|d| t.created_at <= d))
            .cloned()
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(filter.limit.max(0) as usize);
        Ok(records)
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(state.transactions.iter().find(|t| t.id == id).cloned())
    }
}
