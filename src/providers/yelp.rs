use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::models::restaurant::{CandidateRestaurant, RestaurantSource};
use crate::models::usage::ApiProvider;
use crate::providers::{RestaurantProvider, RestaurantQuery};

const YELP_SEARCH_URL: &str = "https://api.yelp.com/v3/businesses/search";
const YELP_REVIEWS_URL: &str = "https://api.yelp.com/v3/businesses";

#[derive(Deserialize, Debug)]
struct YelpSearchResponse {
    #[serde(default)]
    businesses: Vec<YelpBusiness>,
}

#[derive(Deserialize, Debug)]
struct YelpBusiness {
    id: String,
    name: String,
    #[serde(default)]
    image_url: String,
    location: Option<YelpLocation>,
    coordinates: Option<YelpCoordinates>,
}

#[derive(Deserialize, Debug)]
struct YelpLocation {
    #[serde(default)]
    display_address: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct YelpCoordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct YelpReviewsResponse {
    #[serde(default)]
    reviews: Vec<YelpReview>,
}

#[derive(Deserialize, Debug)]
struct YelpReview {
    text: String,
}

pub struct YelpProvider {
    http_client: reqwest::Client,
    api_key: String,
}

impl YelpProvider {
    pub fn new(http_client: reqwest::Client, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
        }
    }

    async fn search_business(
        &self,
        name: &str,
        location: &str,
    ) -> anyhow::Result<Option<CandidateRestaurant>> {
        let response = self
            .http_client
            .get(YELP_SEARCH_URL)
            .query(&[
                ("term", name),
                ("location", location),
                ("limit", "1"),
                ("categories", "restaurants"),
            ])
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Yelp search returned status: {}", response.status());
            return Ok(None);
        }

        let data: YelpSearchResponse = response.json().await?;
        let business = match data.businesses.into_iter().next() {
            Some(business) => business,
            None => return Ok(None),
        };

        let reviews = self.fetch_reviews(&business.id).await;
        let address = business
            .location
            .map(|location| location.display_address.join(", "))
            .unwrap_or_default();
        let lat = business
            .coordinates
            .as_ref()
            .and_then(|coordinates| coordinates.latitude)
            .unwrap_or(0.0);
        let lng = business
            .coordinates
            .as_ref()
            .and_then(|coordinates| coordinates.longitude)
            .unwrap_or(0.0);

        Ok(Some(CandidateRestaurant {
            place_id: format!("yelp_{}", business.id),
            name: business.name,
            address,
            lat,
            lng,
            image_url: business.image_url,
            reviews,
            source: RestaurantSource::Yelp,
        }))
    }

    // A failed review fetch degrades to an empty list; the business itself
    // is still returned and the tier condition decides what to do with it.
    async fn fetch_reviews(&self, business_id: &str) -> Vec<String> {
        let url = format!("{}/{}/reviews", YELP_REVIEWS_URL, business_id);
        let response = self
            .http_client
            .get(&url)
            .query(&[("limit", "20"), ("sort_by", "relevance")])
            .bearer_auth(&self.api_key)
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Yelp reviews returned status: {} for business: {}", response.status(), business_id);
                return Vec::new();
            }
            Err(e) => {
                warn!("Yelp reviews request failed for business: {}, due to: {}", business_id, e);
                return Vec::new();
            }
        };

        match response.json::<YelpReviewsResponse>().await {
            Ok(data) => data.reviews.into_iter().map(|review| review.text).collect(),
            Err(e) => {
                warn!("Failed to decode Yelp reviews due to: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl RestaurantProvider for YelpProvider {
    fn quota(&self) -> Option<ApiProvider> {
        Some(ApiProvider::Yelp)
    }

    fn requires_reviews(&self) -> bool {
        true
    }

    async fn search(&self, query: &RestaurantQuery) -> Option<CandidateRestaurant> {
        if self.api_key.is_empty() {
            return None;
        }

        match self.search_business(&query.name, &query.location).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Yelp search failed for: {}, due to: {}", query.name, e);
                None
            }
        }
    }
}
