use std::net::SocketAddr;
use anyhow::Context;
use axum::http::HeaderValue;
use axum::Router;
use bb8_postgres::bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use bb8_postgres::tokio_postgres::NoTls;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;
use crate::config::Config;
use crate::helpers::handler_404::page_not_found_handler;

pub mod api_usage_controller;
pub mod cuisine_controller;
pub mod dish_extraction_controller;
pub mod health_check;
pub mod restaurant_search_controller;

#[derive(Clone)]
pub struct AppState {
    pub postgres_connection: Pool<PostgresConnectionManager<NoTls>>,
    pub http_client: reqwest::Client,
    pub config: Config,
}

pub async fn serve(
    postgres_connection: Pool<PostgresConnectionManager<NoTls>>,
    config: &Config,
) -> anyhow::Result<()> {
    let origins: Vec<HeaderValue> = config
        .origin_urls
        .split(',')
        .map(|s| s.parse().unwrap())
        .collect::<Vec<HeaderValue>>();

    let app_state = AppState {
        postgres_connection,
        http_client: reqwest::Client::new(),
        config: config.clone(),
    };

    let application = router_endpoints(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::OPTIONS
                        ])
                        .allow_origin(origins)
                        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                )
        )
        .fallback(page_not_found_handler);

    let port = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("API server listening on port: {}", port);
    axum::Server::bind(&port)
        .serve(application.into_make_service())
        .await
        .context("Error spinning up the API server")
}

pub fn router_endpoints(app_state: AppState) -> Router {
    Router::new()
        .nest("/cuisine", cuisine_controller::router(app_state.clone()))
        .nest("/search-restaurant", restaurant_search_controller::router(app_state.clone()))
        .nest("/extract-dishes", dish_extraction_controller::router(app_state.clone()))
        .nest("/api-usage", api_usage_controller::router(app_state))
        .merge(health_check::router())
}
