use std::sync::Arc;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Extension, Json, Router};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use crate::controller::AppState;
use crate::helpers::openrouter::OpenRouterClient;
use crate::models::restaurant::RestaurantSource;
use crate::repositories::postgres_repo::PostgresConnectionRepo;
use crate::services::dish_extraction::{DishExtractionService, ExtractionInput};

pub fn router(app_state: AppState) -> Router {
    let postgres_repo = Arc::new(PostgresConnectionRepo::new(
        app_state.postgres_connection
    ));
    let extraction_service = Arc::new(DishExtractionService::new(
        postgres_repo,
        OpenRouterClient::new(
            app_state.http_client,
            app_state.config.openrouter_api_key,
        ),
    ));

    Router::new()
        .route("/", post(extract_dishes))
        .route_layer(Extension(extraction_service))
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExtractDishesRequest {
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub reviews: Vec<String>,
    #[serde(default)]
    pub source: Option<RestaurantSource>,
}

pub async fn extract_dishes(
    Extension(extraction_service): Extension<Arc<DishExtractionService>>,
    Json(body): Json<ExtractDishesRequest>,
) -> impl IntoResponse {
    if body.reviews.is_empty() {
        return (
            StatusCode::OK,
            json!({"error": "No reviews to analyze", "topDishes": []}).to_string(),
        ).into_response();
    }

    let input = ExtractionInput {
        place_id: body.place_id,
        name: body.name,
        address: body.address,
        lat: body.lat,
        lng: body.lng,
        image_url: body.image_url,
        reviews: body.reviews,
    };

    let extraction_res = extraction_service.extract_top_dishes(&input).await;

    return match extraction_res {
        Ok(outcome) => {
            if outcome.limit_reached {
                (
                    StatusCode::OK,
                    json!({
                        "error": "Daily exploration limit reached. Showing cached popular restaurants.",
                        "topDishes": [],
                        "limitReached": true
                    }).to_string(),
                ).into_response()
            } else {
                let source = body
                    .source
                    .map(|source| json!(source))
                    .unwrap_or_else(|| json!("unknown"));
                (
                    StatusCode::OK,
                    json!({
                        "topDishes": outcome.top_dishes,
                        "fromCache": outcome.from_cache,
                        "source": source
                    }).to_string(),
                ).into_response()
            }
        }
        Err(e) => {
            warn!("Something went wrong extracting dishes for: {}, due to: {}", input.place_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to extract dishes from reviews", "topDishes": []}).to_string(),
            ).into_response()
        }
    };
}
