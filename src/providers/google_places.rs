use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::models::restaurant::{CandidateRestaurant, RestaurantSource};
use crate::models::usage::ApiProvider;
use crate::providers::{RestaurantProvider, RestaurantQuery};

const FIND_PLACE_URL: &str = "https://maps.googleapis.com/maps/api/place/findplacefromtext/json";
const PLACE_DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";
const PLACE_PHOTO_URL: &str = "https://maps.googleapis.com/maps/api/place/photo";

#[derive(Deserialize, Debug)]
struct FindPlaceResponse {
    #[serde(default)]
    candidates: Vec<PlaceCandidate>,
}

#[derive(Deserialize, Debug)]
struct PlaceCandidate {
    place_id: String,
    name: String,
    #[serde(default)]
    formatted_address: String,
    geometry: Option<PlaceGeometry>,
    #[serde(default)]
    photos: Vec<PlacePhoto>,
}

#[derive(Deserialize, Debug)]
struct PlaceGeometry {
    location: Option<PlaceLatLng>,
}

#[derive(Deserialize, Debug)]
struct PlaceLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize, Debug)]
struct PlacePhoto {
    photo_reference: String,
}

#[derive(Deserialize, Debug)]
struct PlaceDetailsResponse {
    result: Option<PlaceDetailsResult>,
}

#[derive(Deserialize, Debug)]
struct PlaceDetailsResult {
    #[serde(default)]
    reviews: Vec<PlaceReview>,
}

#[derive(Deserialize, Debug)]
struct PlaceReview {
    text: String,
}

pub struct GooglePlacesProvider {
    http_client: reqwest::Client,
    api_key: String,
}

impl GooglePlacesProvider {
    pub fn new(http_client: reqwest::Client, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
        }
    }

    async fn find_place(
        &self,
        name: &str,
        location: &str,
    ) -> anyhow::Result<Option<CandidateRestaurant>> {
        let input = format!("{} {}", name, location);
        let response = self
            .http_client
            .get(FIND_PLACE_URL)
            .query(&[
                ("input", input.as_str()),
                ("inputtype", "textquery"),
                ("fields", "place_id,name,formatted_address,geometry,photos,rating"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Google find-place returned status: {}", response.status());
            return Ok(None);
        }

        let data: FindPlaceResponse = response.json().await?;
        let place = match data.candidates.into_iter().next() {
            Some(place) => place,
            None => return Ok(None),
        };

        let reviews = self.fetch_reviews(&place.place_id).await;
        let image_url = place
            .photos
            .first()
            .map(|photo| {
                format!(
                    "{}?maxwidth=400&photo_reference={}&key={}",
                    PLACE_PHOTO_URL, photo.photo_reference, self.api_key
                )
            })
            .unwrap_or_default();
        let (lat, lng) = place
            .geometry
            .and_then(|geometry| geometry.location)
            .map(|location| (location.lat, location.lng))
            .unwrap_or((0.0, 0.0));

        Ok(Some(CandidateRestaurant {
            place_id: format!("google_{}", place.place_id),
            name: place.name,
            address: place.formatted_address,
            lat,
            lng,
            image_url,
            reviews,
            source: RestaurantSource::Google,
        }))
    }

    async fn fetch_reviews(&self, place_id: &str) -> Vec<String> {
        let response = self
            .http_client
            .get(PLACE_DETAILS_URL)
            .query(&[
                ("place_id", place_id),
                ("fields", "reviews"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Google details returned status: {} for place: {}", response.status(), place_id);
                return Vec::new();
            }
            Err(e) => {
                warn!("Google details request failed for place: {}, due to: {}", place_id, e);
                return Vec::new();
            }
        };

        match response.json::<PlaceDetailsResponse>().await {
            Ok(data) => data
                .result
                .map(|result| result.reviews.into_iter().map(|review| review.text).collect())
                .unwrap_or_default(),
            Err(e) => {
                warn!("Failed to decode Google details due to: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl RestaurantProvider for GooglePlacesProvider {
    fn quota(&self) -> Option<ApiProvider> {
        Some(ApiProvider::Google)
    }

    fn requires_reviews(&self) -> bool {
        true
    }

    async fn search(&self, query: &RestaurantQuery) -> Option<CandidateRestaurant> {
        if self.api_key.is_empty() {
            return None;
        }

        match self.find_place(&query.name, &query.location).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Google Places search failed for: {}, due to: {}", query.name, e);
                None
            }
        }
    }
}
