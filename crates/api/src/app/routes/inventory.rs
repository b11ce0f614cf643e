use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use tillpoint_core::ItemId;
use tillpoint_infra::ItemFilter;
use tillpoint_inventory::{ItemPatch, NewItem};

use crate::app::AppServices;
use crate::app::dto::ListItemsQuery;
use crate::app::errors;
use crate::context::StaffContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
}

/// Mutation routes are restricted to admin/owner roles.
fn require_admin(staff: &StaffContext) -> Result<(), axum::response::Response> {
    if staff.role().is_admin() {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "admin role required",
        ))
    }
}

fn parse_item_id(id: &str) -> Result<ItemId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id")
    })
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListItemsQuery>,
) -> axum::response::Response {
    let filter = ItemFilter {
        search: query.search,
        category: query.category,
        low_stock: query.low_stock,
    };
    match services.store.list_items(&filter).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.get_item(id).await {
        Ok(Some(item)) => (StatusCode::OK, Json(item)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(staff): Extension<StaffContext>,
    Json(body): Json<NewItem>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&staff) {
        return resp;
    }
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }
    match services.store.insert_item(body).await {
        Ok(item) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "data": item,
                "message": "Inventory item created successfully",
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<String>,
    Json(body): Json<ItemPatch>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&staff) {
        return resp;
    }
    let id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }
    match services.store.update_item(id, body).await {
        Ok(item) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "data": item,
                "message": "Inventory item updated successfully",
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&staff) {
        return resp;
    }
    let id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.delete_item(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Inventory item deleted successfully" })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
