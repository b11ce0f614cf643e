use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use tillpoint_sales::CheckoutRequest;

use crate::app::AppServices;
use crate::app::errors;

pub fn router() -> Router {
    Router::new().route("/checkout", post(checkout))
}

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(staff): Extension<crate::context::StaffContext>,
    Json(body): Json<CheckoutRequest>,
) -> axum::response::Response {
    match services.coordinator.execute(staff.staff_id(), body).await {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "data": receipt.transaction,
                "message": "Checkout completed successfully",
                "totals": receipt.totals,
            })),
        )
            .into_response(),
        Err(e) => errors::checkout_error_to_response(e),
    }
}
