use axum::{Json, http::StatusCode, response::IntoResponse};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    axum::extract::Extension(staff): axum::extract::Extension<crate::context::StaffContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "staff_id": staff.staff_id().to_string(),
        "role": staff.role().as_str(),
    }))
}
