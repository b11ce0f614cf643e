use axum::{Router, routing::get};

pub mod customers;
pub mod inventory;
pub mod pos;
pub mod system;
pub mod transactions;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/pos", pos::router())
        .nest("/inventory", inventory::router())
        .nest("/customers", customers::router())
        .nest("/transactions", transactions::router())
        // `nest` registers only the bare prefix for the nested "/" routes;
        // the collection roots are also reachable with a trailing slash.
        .route(
            "/inventory/",
            get(inventory::list_items).post(inventory::create_item),
        )
        .route("/transactions/", get(transactions::list_transactions))
}
