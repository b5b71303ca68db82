use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

pub fn router() -> Router {
    Router::new().route("/health", get(get_health_check))
}

/// Liveness probe for the hosting platform
async fn get_health_check() -> Result<StatusCode, StatusCode> {
    Ok(StatusCode::OK)
}
