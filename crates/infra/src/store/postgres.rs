//! Postgres-backed retail store.
//!
//! The atomic stock and debt adjustments go through stored procedures
//! (`decrement_inventory`, `increment_inventory`, `increment_customer_debt`,
//! see `crates/infra/migrations/`); the guarded fallback writes are plain
//! updates whose `WHERE` clause carries the precondition, checked via
//! rows-affected. No multi-statement transaction is ever opened here.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use tillpoint_core::{CustomerId, ItemId, StaffId, TransactionId};
use tillpoint_inventory::{InventoryItem, ItemPatch, NewItem};
use tillpoint_parties::Customer;
use tillpoint_sales::{
    NewTransaction, PaymentMethod, TransactionRecord, TransactionStatus,
};

use super::{ItemFilter, RetailStore, SaleItemRow, StoreError, TransactionFilter};

pub struct PostgresRetailStore {
    pool: PgPool,
}

impl PostgresRetailStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// SQLSTATE of the error, if the driver surfaced one.
fn db_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.to_string()),
        _ => None,
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => match db_code(&other).as_deref() {
            // undefined_function: the procedure is not installed.
            Some("42883") => StoreError::ProcedureUnavailable(other.to_string()),
            _ => StoreError::Unavailable(other.to_string()),
        },
    }
}

fn decode_err(err: impl core::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("row decode failed: {err}"))
}

fn item_from_row(row: &PgRow) -> Result<InventoryItem, StoreError> {
    Ok(InventoryItem {
        id: ItemId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode_err)?),
        part_number: row.try_get("part_number").map_err(decode_err)?,
        name: row.try_get("name").map_err(decode_err)?,
        description: row.try_get("description").map_err(decode_err)?,
        category: row.try_get("category").map_err(decode_err)?,
        cost_price: row.try_get("cost_price").map_err(decode_err)?,
        selling_price: row.try_get("selling_price").map_err(decode_err)?,
        quantity_in_stock: row.try_get("quantity_in_stock").map_err(decode_err)?,
        min_stock_level: row.try_get("min_stock_level").map_err(decode_err)?,
        created_at: row.try_get("created_at").map_err(decode_err)?,
        updated_at: row.try_get("updated_at").map_err(decode_err)?,
    })
}

fn customer_from_row(row: &PgRow) -> Result<Customer, StoreError> {
    Ok(Customer {
        id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        phone: row.try_get("phone").map_err(decode_err)?,
        address: row.try_get("address").map_err(decode_err)?,
        debt_balance: row.try_get("debt_balance").map_err(decode_err)?,
        created_at: row.try_get("created_at").map_err(decode_err)?,
        updated_at: row.try_get("updated_at").map_err(decode_err)?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<TransactionRecord, StoreError> {
    let payment_method: String = row.try_get("payment_method").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let items: serde_json::Value = row.try_get("items").map_err(decode_err)?;

    Ok(TransactionRecord {
        id: TransactionId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode_err)?),
        customer_id: row
            .try_get::<Option<Uuid>, _>("customer_id")
            .map_err(decode_err)?
            .map(CustomerId::from_uuid),
        customer_name: row.try_get("customer_name").map_err(decode_err)?,
        staff_id: StaffId::from_uuid(row.try_get::<Uuid, _>("staff_id").map_err(decode_err)?),
        total_amount: row.try_get("total_amount").map_err(decode_err)?,
        payment_method: payment_method.parse::<PaymentMethod>().map_err(decode_err)?,
        status: status.parse::<TransactionStatus>().map_err(decode_err)?,
        items: serde_json::from_value(items).map_err(decode_err)?,
        created_at: row.try_get("created_at").map_err(decode_err)?,
    })
}

#[async_trait]
impl RetailStore for PostgresRetailStore {
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<InventoryItem>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, part_number, name, description, category, cost_price, \
             selling_price, quantity_in_stock, min_stock_level, created_at, updated_at \
             FROM inventory WHERE TRUE",
        );
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR part_number ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if filter.low_stock {
            qb.push(" AND quantity_in_stock <= min_stock_level");
        }
        qb.push(" ORDER BY name ASC");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter().map(item_from_row).collect()
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query(
            "SELECT id, part_number, name, description, category, cost_price, \
             selling_price, quantity_in_stock, min_stock_level, created_at, updated_at \
             FROM inventory WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn insert_item(&self, item: NewItem) -> Result<InventoryItem, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO inventory (
                id, part_number, name, description, category,
                cost_price, selling_price, quantity_in_stock, min_stock_level
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, part_number, name, description, category, cost_price,
                      selling_price, quantity_in_stock, min_stock_level,
                      created_at, updated_at
            "#,
        )
        .bind(ItemId::new().as_uuid())
        .bind(&item.part_number)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(item.cost_price)
        .bind(item.selling_price)
        .bind(item.quantity_in_stock)
        .bind(item.min_stock_level)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        item_from_row(&row)
    }

    async fn update_item(
        &self,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<InventoryItem, StoreError> {
        // Single per-row statement; untouched fields keep their stored value.
        let row = sqlx::query(
            r#"
            UPDATE inventory SET
                part_number = COALESCE($2, part_number),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                cost_price = COALESCE($6, cost_price),
                selling_price = COALESCE($7, selling_price),
                quantity_in_stock = COALESCE($8, quantity_in_stock),
                min_stock_level = COALESCE($9, min_stock_level),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, part_number, name, description, category, cost_price,
                      selling_price, quantity_in_stock, min_stock_level,
                      created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(&patch.part_number)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(&patch.category)
        .bind(patch.cost_price)
        .bind(patch.selling_price)
        .bind(patch.quantity_in_stock)
        .bind(patch.min_stock_level)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => item_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM inventory WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn fetch_items_for_sale(&self, ids: &[ItemId]) -> Result<Vec<SaleItemRow>, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT id, name, selling_price, quantity_in_stock \
             FROM inventory WHERE id = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.iter()
            .map(|row| {
                Ok(SaleItemRow {
                    id: ItemId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode_err)?),
                    name: row.try_get("name").map_err(decode_err)?,
                    selling_price: row.try_get("selling_price").map_err(decode_err)?,
                    quantity_in_stock: row.try_get("quantity_in_stock").map_err(decode_err)?,
                })
            })
            .collect()
    }

    async fn fetch_stock(&self, id: ItemId) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT quantity_in_stock FROM inventory WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        match row {
            Some(row) => row.try_get("quantity_in_stock").map_err(decode_err),
            None => Err(StoreError::NotFound),
        }
    }

    async fn decrement_inventory(&self, id: ItemId, by: i64) -> Result<(), StoreError> {
        let result = sqlx::query("SELECT decrement_inventory($1, $2)")
            .bind(id.as_uuid())
            .bind(by)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match db_code(&e).as_deref() {
                // raise_exception from the procedure's stock guard.
                Some("P0001") => {
                    let available = self.fetch_stock(id).await.unwrap_or(0);
                    Err(StoreError::InsufficientStock {
                        available,
                        requested: by,
                    })
                }
                // no_data_found: the procedure saw no such row.
                Some("P0002") => Err(StoreError::NotFound),
                _ => Err(map_sqlx(e)),
            },
        }
    }

    async fn increment_inventory(&self, id: ItemId, by: i64) -> Result<(), StoreError> {
        let result = sqlx::query("SELECT increment_inventory($1, $2)")
            .bind(id.as_uuid())
            .bind(by)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match db_code(&e).as_deref() {
                Some("P0002") => Err(StoreError::NotFound),
                _ => Err(map_sqlx(e)),
            },
        }
    }

    async fn decrement_stock_guarded(&self, id: ItemId, by: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE inventory \
             SET quantity_in_stock = quantity_in_stock - $2, updated_at = NOW() \
             WHERE id = $1 AND quantity_in_stock >= $2",
        )
        .bind(id.as_uuid())
        .bind(by)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PreconditionFailed(format!(
                "quantity_in_stock >= {by} no longer holds"
            )));
        }
        Ok(())
    }

    async fn force_stock(&self, id: ItemId, quantity: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE inventory SET quantity_in_stock = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, phone, address, debt_balance, created_at, updated_at \
             FROM customers WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn increment_customer_debt(
        &self,
        id: CustomerId,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("SELECT increment_customer_debt($1, $2)")
            .bind(id.as_uuid())
            .bind(amount)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match db_code(&e).as_deref() {
                Some("P0002") => Err(StoreError::NotFound),
                _ => Err(map_sqlx(e)),
            },
        }
    }

    async fn set_customer_debt(
        &self,
        id: CustomerId,
        balance: Decimal,
    ) -> Result<Customer, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE customers SET debt_balance = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, phone, address, debt_balance, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(balance)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => customer_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn insert_transaction(
        &self,
        tx: NewTransaction,
    ) -> Result<TransactionRecord, StoreError> {
        let id = TransactionId::new();
        let items = serde_json::to_value(&tx.items).map_err(decode_err)?;

        let row = sqlx::query(
            r#"
            INSERT INTO transactions (
                id, customer_id, staff_id, total_amount, payment_method, status, items
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, customer_id, staff_id, total_amount, payment_method,
                      status, items, created_at,
                      (SELECT name FROM customers c WHERE c.id = $2) AS customer_name
            "#,
        )
        .bind(id.as_uuid())
        .bind(tx.customer_id.map(|c| *c.as_uuid()))
        .bind(tx.staff_id.as_uuid())
        .bind(tx.total_amount)
        .bind(tx.payment_method.as_str())
        .bind(tx.status.as_str())
        .bind(items)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        transaction_from_row(&row)
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT t.id, t.customer_id, t.staff_id, t.total_amount, t.payment_method, \
             t.status, t.items, t.created_at, c.name AS customer_name \
             FROM transactions t \
             LEFT JOIN customers c ON c.id = t.customer_id \
             WHERE TRUE",
        );
        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND t.customer_id = ").push_bind(*customer_id.as_uuid());
        }
        if let Some(status) = filter.status {
            qb.push(" AND t.status = ").push_bind(status.as_str());
        }
        if let Some(method) = filter.payment_method {
            qb.push(" AND t.payment_method = ").push_bind(method.as_str());
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND t.created_at >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND t.created_at <= ").push_bind(end);
        }
        qb.push(" ORDER BY t.created_at DESC LIMIT ").push_bind(filter.limit);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT t.id, t.customer_id, t.staff_id, t.total_amount, t.payment_method, \
             t.status, t.items, t.created_at, c.name AS customer_name \
             FROM transactions t \
             LEFT JOIN customers c ON c.id = t.customer_id \
             WHERE t.id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.as_ref().map(transaction_from_row).transpose()
    }
}
