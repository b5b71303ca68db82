use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

pub async fn page_not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        json!({"error": "Unknown endpoint"}).to_string(),
    )
}
