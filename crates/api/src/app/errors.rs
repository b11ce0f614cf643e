use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tillpoint_core::DomainError;
use tillpoint_infra::{CheckoutError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Like [`json_error`] but with a `details` payload (per-line failures and
/// similar structured context).
pub fn json_error_with_details(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: serde_json::Value,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "details": details,
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::InsufficientStock { .. } | StoreError::PreconditionFailed(_) => {
            json_error(StatusCode::CONFLICT, "conflict", err.to_string())
        }
        StoreError::ProcedureUnavailable(_) | StoreError::Unavailable(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
    }
}

pub fn checkout_error_to_response(err: CheckoutError) -> axum::response::Response {
    match err {
        CheckoutError::Validation(e) => domain_error_to_response(e),
        CheckoutError::UnknownItems(ids) => json_error_with_details(
            StatusCode::BAD_REQUEST,
            "unknown_items",
            "cart references items that do not exist",
            json!(ids.iter().map(|id| id.to_string()).collect::<Vec<_>>()),
        ),
        CheckoutError::InsufficientStock(failures) => json_error_with_details(
            StatusCode::BAD_REQUEST,
            "insufficient_stock",
            "one or more items cannot be covered by available stock",
            serde_json::to_value(failures).unwrap_or_default(),
        ),
        CheckoutError::Adjustment(failures) => json_error_with_details(
            StatusCode::INTERNAL_SERVER_ERROR,
            "inventory_adjustment_failed",
            "inventory could not be updated; the sale was not recorded",
            serde_json::to_value(failures).unwrap_or_default(),
        ),
        CheckoutError::Commit { source } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "transaction_failed",
            format!("sale could not be recorded: {source}"),
        ),
        CheckoutError::DebtUpdate { transaction, .. } => json_error_with_details(
            StatusCode::INTERNAL_SERVER_ERROR,
            "debt_update_failed",
            "sale was recorded but the customer's debt balance was not updated",
            json!({ "transaction_id": transaction.id.to_string() }),
        ),
        CheckoutError::Store(e) => store_error_to_response(e),
    }
}
