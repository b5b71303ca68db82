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
use crate::providers::{RestaurantQuery, TieredRestaurantSearch};
use crate::repositories::postgres_repo::PostgresConnectionRepo;

pub fn router(app_state: AppState) -> Router {
    let postgres_repo = Arc::new(PostgresConnectionRepo::new(
        app_state.postgres_connection
    ));
    let tiered_search = Arc::new(TieredRestaurantSearch::with_default_tiers(
        postgres_repo.clone(),
        app_state.http_client,
        app_state.config.yelp_api_key,
        app_state.config.google_places_key,
        app_state.config.geoapify_key,
    ));

    Router::new()
        .route("/", get(search_restaurant))
        .route_layer(Extension(postgres_repo))
        .route_layer(Extension(tiered_search))
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SearchRestaurantParams {
    pub q: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

pub async fn search_restaurant(
    Extension(postgres_repo): Extension<Arc<PostgresConnectionRepo>>,
    Extension(tiered_search): Extension<Arc<TieredRestaurantSearch>>,
    Query(query): Query<SearchRestaurantParams>,
) -> impl IntoResponse {
    let search_text = query.q.unwrap_or_default();
    if search_text.is_empty() && query.lat.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            json!({"error": "Provide a search query or location"}).to_string(),
        ).into_response();
    }

    // Name-similarity probe against the cache before any quota is spent.
    match postgres_repo.search_cached_restaurants(&search_text).await {
        Ok(cached) => {
            if let Some(hit) = cached.into_iter().find(|entry| entry.is_fresh()) {
                return (
                    StatusCode::OK,
                    json!({"restaurant": hit, "fromCache": true}).to_string(),
                ).into_response();
            }
        }
        Err(e) => {
            warn!("Cache probe failed for query: {}, due to: {}", search_text, e);
        }
    }

    let parsed_query = RestaurantQuery::parse(&search_text, query.lat, query.lng);
    let search_res = tiered_search.search(&parsed_query).await;

    return match search_res {
        Ok(Some(restaurant)) => {
            let needs_extraction = !restaurant.reviews.is_empty();
            (
                StatusCode::OK,
                json!({
                    "restaurant": restaurant,
                    "fromCache": false,
                    "needsExtraction": needs_extraction
                }).to_string(),
            ).into_response()
        }
        Ok(None) => {
            (
                StatusCode::OK,
                json!({
                    "error": "No restaurant found. Try a different search term.",
                    "restaurant": null
                }).to_string(),
            ).into_response()
        }
        Err(e) => {
            warn!("Something went wrong searching for the restaurant due to: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Failed to search for the restaurant, please try again",
                    "restaurant": null
                }).to_string(),
            ).into_response()
        }
    };
}
