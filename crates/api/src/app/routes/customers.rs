use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use tillpoint_core::CustomerId;
use tillpoint_parties::apply_settlement;

use crate::app::AppServices;
use crate::app::dto::DebtSettlementRequest;
use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/:id", get(get_customer))
        .route("/:id/debt", post(settle_debt))
}

fn parse_customer_id(id: &str) -> Result<CustomerId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid customer id")
    })
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_customer_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.get_customer(id).await {
        Ok(Some(customer)) => (StatusCode::OK, Json(customer)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "customer not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Manual debt adjustment: settle (floors at zero) or add.
///
/// This is a read-then-write, not an atomic increment. Concurrent checkouts
/// for the same customer can race it; accepted for a staff-driven endpoint.
pub async fn settle_debt(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<DebtSettlementRequest>,
) -> axum::response::Response {
    let id = match parse_customer_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let customer = match services.store.get_customer(id).await {
        Ok(Some(c)) => c,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "customer not found");
        }
        Err(e) => return errors::store_error_to_response(e),
    };

    let previous_balance = customer.debt_balance;
    let new_balance = match apply_settlement(previous_balance, body.action, body.amount) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.set_customer_debt(id, new_balance).await {
        Ok(updated) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "data": updated,
                "message": "Debt balance updated successfully",
                "previous_balance": previous_balance,
                "new_balance": new_balance,
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
