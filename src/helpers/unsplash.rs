use serde::Deserialize;
use tracing::warn;

const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";

#[derive(Deserialize, Debug)]
struct UnsplashSearchResponse {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Deserialize, Debug)]
struct UnsplashPhoto {
    urls: UnsplashUrls,
}

#[derive(Deserialize, Debug)]
struct UnsplashUrls {
    #[serde(default)]
    regular: String,
}

/// Best-effort image URL for a dish query. Every failure mode (missing key,
/// network error, non-success status, no results) degrades to an empty
/// string so the enclosing operation never aborts over an image.
pub async fn search_unsplash(http_client: &reqwest::Client, api_key: &str, query: &str) -> String {
    if api_key.is_empty() {
        return String::new();
    }

    let response = http_client
        .get(UNSPLASH_SEARCH_URL)
        .query(&[
            ("query", format!("{} food dish", query).as_str()),
            ("per_page", "1"),
            ("orientation", "squarish"),
        ])
        .header("Authorization", format!("Client-ID {}", api_key))
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            warn!("Unsplash request failed for query: {}, due to: {}", query, e);
            return String::new();
        }
    };

    if !response.status().is_success() {
        warn!(
            "Unsplash returned status: {} for query: {}",
            response.status(),
            query
        );
        return String::new();
    }

    match response.json::<UnsplashSearchResponse>().await {
        Ok(data) => data
            .results
            .into_iter()
            .next()
            .map(|photo| photo.urls.regular)
            .unwrap_or_default(),
        Err(e) => {
            warn!("Failed to decode Unsplash response due to: {}", e);
            String::new()
        }
    }
}
