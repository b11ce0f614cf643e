//! Coordinator tests against the in-memory store, covering the commit path,
//! every rollback path, and the fault-injected fallbacks.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tillpoint_core::{CustomerId, ItemId, StaffId};
use tillpoint_inventory::InventoryItem;
use tillpoint_parties::Customer;
use tillpoint_sales::{CartLine, CheckoutRequest, PaymentMethod, TransactionStatus};

use crate::checkout::{CheckoutCoordinator, CheckoutError};
use crate::store::{InMemoryRetailStore, RetailStore};

fn item(name: &str, stock: i64, price: Decimal) -> InventoryItem {
    let now = Utc::now();
    InventoryItem {
        id: ItemId::new(),
        part_number: format!("PN-{name}"),
        name: name.to_string(),
        description: None,
        category: None,
        cost_price: price / dec!(2),
        selling_price: price,
        quantity_in_stock: stock,
        min_stock_level: 1,
        created_at: now,
        updated_at: now,
    }
}

fn customer(debt: Decimal) -> Customer {
    let now = Utc::now();
    Customer {
        id: CustomerId::new(),
        name: "Dana".to_string(),
        phone: None,
        address: None,
        debt_balance: debt,
        created_at: now,
        updated_at: now,
    }
}

fn line(id: ItemId, quantity: i64, price: Decimal) -> CartLine {
    CartLine {
        id,
        quantity,
        price,
        name: None,
    }
}

fn request(items: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        customer_id: None,
        items,
        payment_method: PaymentMethod::Cash,
        tax_rate: dec!(0.08),
    }
}

fn setup() -> (Arc<InMemoryRetailStore>, CheckoutCoordinator) {
    let store = Arc::new(InMemoryRetailStore::new());
    let coordinator = CheckoutCoordinator::new(store.clone());
    (store, coordinator)
}

#[tokio::test]
async fn successful_checkout_decrements_stock_and_prices_the_sale() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 5, dec!(100));
    let b = item("Belt", 2, dec!(50));
    let (a_id, b_id) = (a.id, b.id);
    store.seed_item(a);
    store.seed_item(b);

    let receipt = coordinator
        .execute(
            StaffId::new(),
            request(vec![line(a_id, 2, dec!(100)), line(b_id, 1, dec!(50))]),
        )
        .await
        .unwrap();

    assert_eq!(receipt.totals.subtotal, dec!(250));
    assert_eq!(receipt.totals.tax, dec!(20));
    assert_eq!(receipt.totals.total, dec!(270));
    assert_eq!(receipt.transaction.total_amount, dec!(270));
    assert_eq!(receipt.transaction.status, TransactionStatus::Completed);
    assert_eq!(receipt.transaction.items.len(), 2);
    assert_eq!(receipt.transaction.items[0].name, "Alternator");

    assert_eq!(store.fetch_stock(a_id).await.unwrap(), 3);
    assert_eq!(store.fetch_stock(b_id).await.unwrap(), 1);
    assert_eq!(store.transaction_count(), 1);
}

#[tokio::test]
async fn shortfall_leaves_everything_untouched() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 5, dec!(100));
    let b = item("Belt", 1, dec!(50));
    let (a_id, b_id) = (a.id, b.id);
    store.seed_item(a);
    store.seed_item(b);

    let err = coordinator
        .execute(
            StaffId::new(),
            request(vec![line(a_id, 2, dec!(100)), line(b_id, 3, dec!(50))]),
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientStock(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].item_id, b_id);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(store.fetch_stock(a_id).await.unwrap(), 5);
    assert_eq!(store.fetch_stock(b_id).await.unwrap(), 1);
    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test]
async fn unknown_items_fail_before_any_write() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 5, dec!(100));
    let a_id = a.id;
    store.seed_item(a);
    let ghost = ItemId::new();

    let err = coordinator
        .execute(
            StaffId::new(),
            request(vec![line(a_id, 1, dec!(100)), line(ghost, 1, dec!(5))]),
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::UnknownItems(ids) => assert_eq!(ids, vec![ghost]),
        other => panic!("expected UnknownItems, got {other:?}"),
    }
    assert_eq!(store.fetch_stock(a_id).await.unwrap(), 5);
    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test]
async fn concurrent_checkouts_for_the_last_unit_admit_exactly_one() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 1, dec!(100));
    let a_id = a.id;
    store.seed_item(a);
    let coordinator = Arc::new(coordinator);

    let first = coordinator.execute(StaffId::new(), request(vec![line(a_id, 1, dec!(100))]));
    let second = coordinator.execute(StaffId::new(), request(vec![line(a_id, 1, dec!(100))]));
    let (first, second) = tokio::join!(first, second);

    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(store.fetch_stock(a_id).await.unwrap(), 0);
    assert_eq!(store.transaction_count(), 1);
}

#[tokio::test]
async fn commit_failure_rolls_stock_back_and_records_nothing() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 5, dec!(100));
    let a_id = a.id;
    store.seed_item(a);
    store
        .faults()
        .fail_transaction_insert
        .store(true, Ordering::SeqCst);

    let err = coordinator
        .execute(StaffId::new(), request(vec![line(a_id, 2, dec!(100))]))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Commit { .. }));
    assert_eq!(store.fetch_stock(a_id).await.unwrap(), 5);
    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test]
async fn debt_sale_increments_the_balance_and_is_pending() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 5, dec!(100));
    let a_id = a.id;
    store.seed_item(a);
    let cust = customer(dec!(500));
    let cust_id = cust.id;
    store.seed_customer(cust);

    let mut req = request(vec![line(a_id, 1, dec!(100)), line(a_id, 1, dec!(11.11))]);
    req.customer_id = Some(cust_id);
    req.payment_method = PaymentMethod::Debt;

    let receipt = coordinator.execute(StaffId::new(), req).await.unwrap();

    // 111.11 subtotal, 8.89 tax, 120.00 total.
    assert_eq!(receipt.totals.total, dec!(120.00));
    assert_eq!(receipt.transaction.status, TransactionStatus::PendingDebt);
    assert_eq!(receipt.transaction.customer_name.as_deref(), Some("Dana"));

    let balance = store.get_customer(cust_id).await.unwrap().unwrap().debt_balance;
    assert_eq!(balance, dec!(620.00));
}

#[tokio::test]
async fn cash_sale_never_touches_the_debt_balance() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 5, dec!(100));
    let a_id = a.id;
    store.seed_item(a);
    let cust = customer(dec!(500));
    let cust_id = cust.id;
    store.seed_customer(cust);

    let mut req = request(vec![line(a_id, 1, dec!(100))]);
    req.customer_id = Some(cust_id);

    let receipt = coordinator.execute(StaffId::new(), req).await.unwrap();
    assert_eq!(receipt.transaction.status, TransactionStatus::Completed);

    let balance = store.get_customer(cust_id).await.unwrap().unwrap().debt_balance;
    assert_eq!(balance, dec!(500));
}

#[tokio::test]
async fn decrement_falls_back_to_guarded_update_when_procedure_is_missing() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 5, dec!(100));
    let a_id = a.id;
    store.seed_item(a);
    store
        .faults()
        .fail_decrement_procedure
        .store(true, Ordering::SeqCst);

    let receipt = coordinator
        .execute(StaffId::new(), request(vec![line(a_id, 2, dec!(100))]))
        .await
        .unwrap();

    assert_eq!(receipt.totals.total, dec!(216));
    assert_eq!(store.fetch_stock(a_id).await.unwrap(), 3);
}

#[tokio::test]
async fn fallback_still_refuses_a_shortfall() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 1, dec!(100));
    let a_id = a.id;
    store.seed_item(a);
    store
        .faults()
        .fail_decrement_procedure
        .store(true, Ordering::SeqCst);

    let err = coordinator
        .execute(StaffId::new(), request(vec![line(a_id, 2, dec!(100))]))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InsufficientStock(_)));
    assert_eq!(store.fetch_stock(a_id).await.unwrap(), 1);
    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test]
async fn both_fallbacks_down_rolls_back_and_reports_adjustment_failure() {
    let (store, _) = setup();
    let a = item("Alternator", 5, dec!(100));
    let b = item("Belt", 2, dec!(50));
    let (a_id, b_id) = (a.id, b.id);
    store.seed_item(a);
    store.seed_item(b);

    // The first line succeeds, then both decrement paths go down for the
    // second; the first line's decrement must be compensated.
    *store.faults().poison_item.lock().unwrap() = Some(b_id);
    let coordinator = CheckoutCoordinator::new(store.clone());

    let err = coordinator
        .execute(
            StaffId::new(),
            request(vec![line(a_id, 2, dec!(100)), line(b_id, 1, dec!(50))]),
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::Adjustment(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].item_id, b_id);
        }
        other => panic!("expected Adjustment, got {other:?}"),
    }
    assert_eq!(store.fetch_stock(a_id).await.unwrap(), 5);
    assert_eq!(store.fetch_stock(b_id).await.unwrap(), 2);
    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test]
async fn debt_increment_falls_back_to_read_then_write() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 5, dec!(100));
    let a_id = a.id;
    store.seed_item(a);
    let cust = customer(dec!(500));
    let cust_id = cust.id;
    store.seed_customer(cust);
    store
        .faults()
        .fail_debt_procedure
        .store(true, Ordering::SeqCst);

    let mut req = request(vec![line(a_id, 1, dec!(100))]);
    req.customer_id = Some(cust_id);
    req.payment_method = PaymentMethod::Debt;

    coordinator.execute(StaffId::new(), req).await.unwrap();

    let balance = store.get_customer(cust_id).await.unwrap().unwrap().debt_balance;
    assert_eq!(balance, dec!(608)); // 500 + 108
}

#[tokio::test]
async fn debt_failure_after_commit_keeps_the_sale_and_names_it() {
    let (store, coordinator) = setup();
    let a = item("Alternator", 5, dec!(100));
    let a_id = a.id;
    store.seed_item(a);
    let cust = customer(dec!(500));
    let cust_id = cust.id;
    store.seed_customer(cust);
    store
        .faults()
        .fail_debt_procedure
        .store(true, Ordering::SeqCst);
    store.faults().fail_debt_write.store(true, Ordering::SeqCst);

    let mut req = request(vec![line(a_id, 1, dec!(100))]);
    req.customer_id = Some(cust_id);
    req.payment_method = PaymentMethod::Debt;

    let err = coordinator.execute(StaffId::new(), req).await.unwrap_err();

    match err {
        CheckoutError::DebtUpdate {
            transaction,
            customer_id,
            ..
        } => {
            assert_eq!(customer_id, cust_id);
            // The committed sale is preserved and retrievable.
            let stored = store.get_transaction(transaction.id).await.unwrap();
            assert!(stored.is_some());
        }
        other => panic!("expected DebtUpdate, got {other:?}"),
    }
    // The sale stands: stock stays decremented, the balance stays stale.
    assert_eq!(store.fetch_stock(a_id).await.unwrap(), 4);
    let balance = store.get_customer(cust_id).await.unwrap().unwrap().debt_balance;
    assert_eq!(balance, dec!(500));
    assert_eq!(store.transaction_count(), 1);
}
