use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::models::restaurant::{CandidateRestaurant, RestaurantSource};
use crate::models::usage::ApiProvider;
use crate::providers::{RestaurantProvider, RestaurantQuery};

const PLACES_URL: &str = "https://api.geoapify.com/v2/places";
const GEOCODE_URL: &str = "https://api.geoapify.com/v1/geocode/search";

// 5km around the caller's position when coordinates are known.
const NEARBY_RADIUS_METERS: u32 = 5000;

#[derive(Deserialize, Debug)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize, Debug)]
struct Feature {
    properties: FeatureProperties,
}

#[derive(Deserialize, Debug)]
struct FeatureProperties {
    #[serde(default)]
    place_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    formatted: String,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}

/// Last tier: geocoding only, no reviews ever, so downstream extraction is
/// skipped by construction.
pub struct GeoapifyProvider {
    http_client: reqwest::Client,
    api_key: String,
}

impl GeoapifyProvider {
    pub fn new(http_client: reqwest::Client, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
        }
    }

    async fn geocode(&self, query: &RestaurantQuery) -> anyhow::Result<Option<CandidateRestaurant>> {
        let request = match (query.lat, query.lng) {
            (Some(lat), Some(lng)) => self.http_client.get(PLACES_URL).query(&[
                ("categories", "catering.restaurant"),
                (
                    "filter",
                    format!("circle:{},{},{}", lng, lat, NEARBY_RADIUS_METERS).as_str(),
                ),
                ("limit", "5"),
                ("apiKey", self.api_key.as_str()),
            ]),
            _ => self.http_client.get(GEOCODE_URL).query(&[
                ("text", query.raw.as_str()),
                ("type", "amenity"),
                ("filter", "countrycode:auto"),
                ("limit", "5"),
                ("apiKey", self.api_key.as_str()),
            ]),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            warn!("Geoapify returned status: {}", response.status());
            return Ok(None);
        }

        let data: FeatureCollection = response.json().await?;
        let feature = match data.features.into_iter().next() {
            Some(feature) => feature,
            None => return Ok(None),
        };

        let properties = feature.properties;
        let place_id = if properties.place_id.is_empty() {
            format!("geo_{}", OffsetDateTime::now_utc().unix_timestamp())
        } else {
            properties.place_id
        };
        let name = if properties.name.is_empty() {
            query.raw.clone()
        } else {
            properties.name
        };

        Ok(Some(CandidateRestaurant {
            place_id,
            name,
            address: properties.formatted,
            lat: properties.lat,
            lng: properties.lon,
            image_url: String::new(),
            reviews: Vec::new(),
            source: RestaurantSource::Geoapify,
        }))
    }
}

#[async_trait]
impl RestaurantProvider for GeoapifyProvider {
    fn quota(&self) -> Option<ApiProvider> {
        None
    }

    fn requires_reviews(&self) -> bool {
        false
    }

    async fn search(&self, query: &RestaurantQuery) -> Option<CandidateRestaurant> {
        if self.api_key.is_empty() {
            return None;
        }

        match self.geocode(query).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Geoapify search failed for: {}, due to: {}", query.raw, e);
                None
            }
        }
    }
}
