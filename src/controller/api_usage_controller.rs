use std::sync::Arc;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use reqwest::StatusCode;
use serde_json::json;
use tracing::warn;
use crate::controller::AppState;
use crate::repositories::postgres_repo::PostgresConnectionRepo;

pub fn router(app_state: AppState) -> Router {
    let postgres_repo = Arc::new(PostgresConnectionRepo::new(
        app_state.postgres_connection
    ));

    Router::new()
        .route("/", get(retrieve_usage_summary))
        .route_layer(Extension(postgres_repo))
}

pub async fn retrieve_usage_summary(
    Extension(postgres_repo): Extension<Arc<PostgresConnectionRepo>>,
) -> impl IntoResponse {
    let summary_res = postgres_repo.usage_summary().await;

    return match summary_res {
        Ok(summary) => {
            (
                StatusCode::OK,
                json!(&summary).to_string()
            ).into_response()
        }
        Err(e) => {
            warn!("Something went wrong retrieving the usage summary due to: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to retrieve usage summary"}).to_string(),
            ).into_response()
        }
    };
}
