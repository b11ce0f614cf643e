use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use tillpoint_core::TransactionId;
use tillpoint_infra::TransactionFilter;
use tillpoint_sales::{PaymentMethod, TransactionStatus};

use crate::app::AppServices;
use crate::app::dto::ListTransactionsQuery;
use crate::app::errors;

const MAX_PAGE_SIZE: i64 = 500;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_transactions))
        .route("/:id", get(get_transaction))
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListTransactionsQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref().map(str::parse::<TransactionStatus>) {
        Some(Err(e)) => return errors::domain_error_to_response(e),
        Some(Ok(v)) => Some(v),
        None => None,
    };
    let payment_method = match query
        .payment_method
        .as_deref()
        .map(str::parse::<PaymentMethod>)
    {
        Some(Err(e)) => return errors::domain_error_to_response(e),
        Some(Ok(v)) => Some(v),
        None => None,
    };

    let filter = TransactionFilter {
        customer_id: query.customer_id,
        status,
        payment_method,
        start_date: query.start_date,
        end_date: query.end_date,
        limit: query
            .limit
            .unwrap_or(TransactionFilter::default().limit)
            .clamp(1, MAX_PAGE_SIZE),
    };

    match services.store.list_transactions(&filter).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransactionId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                "invalid transaction id",
            );
        }
    };
    match services.store.get_transaction(id).await {
        Ok(Some(tx)) => (StatusCode::OK, Json(tx)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "transaction not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
