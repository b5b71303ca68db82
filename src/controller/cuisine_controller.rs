use std::sync::Arc;
use axum::extract::Query;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use crate::controller::AppState;
use crate::helpers::openrouter::OpenRouterClient;
use crate::repositories::postgres_repo::PostgresConnectionRepo;
use crate::services::cuisine_catalog::CuisineCatalogService;

pub fn router(app_state: AppState) -> Router {
    let postgres_repo = Arc::new(PostgresConnectionRepo::new(
        app_state.postgres_connection
    ));
    let cuisine_service = Arc::new(CuisineCatalogService::new(
        postgres_repo,
        OpenRouterClient::new(
            app_state.http_client.clone(),
            app_state.config.openrouter_api_key.clone(),
        ),
        app_state.http_client,
        app_state.config.unsplash_key,
    ));

    Router::new()
        .route("/", get(lookup_cuisine))
        .route_layer(Extension(cuisine_service))
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CuisineParams {
    pub cuisine: Option<String>,
    pub lang: Option<String>,
    #[serde(rename = "langCode")]
    pub lang_code: Option<String>,
}

pub async fn lookup_cuisine(
    Extension(cuisine_service): Extension<Arc<CuisineCatalogService>>,
    Query(query): Query<CuisineParams>,
) -> impl IntoResponse {
    let cuisine = match query.cuisine {
        Some(cuisine) if !cuisine.is_empty() => cuisine,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                json!({"error": "cuisine parameter is required"}).to_string(),
            ).into_response();
        }
    };
    let language = query.lang.unwrap_or_else(|| "English".to_string());
    let language_code = query.lang_code.unwrap_or_else(|| "en".to_string());

    let lookup_res = cuisine_service
        .lookup_cuisine(&cuisine, &language, &language_code)
        .await;

    return match lookup_res {
        Ok(outcome) => {
            if outcome.limit_reached {
                (
                    StatusCode::OK,
                    json!({
                        "error": "Daily exploration limit reached. Showing cached popular restaurants.",
                        "dishes": [],
                        "limitReached": true
                    }).to_string(),
                ).into_response()
            } else {
                (
                    StatusCode::OK,
                    json!({
                        "dishes": outcome.dishes,
                        "fromCache": outcome.from_cache
                    }).to_string(),
                ).into_response()
            }
        }
        Err(e) => {
            warn!("Something went wrong building the cuisine catalog for: {}, due to: {}", cuisine, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to fetch cuisine data", "dishes": []}).to_string(),
            ).into_response()
        }
    };
}
