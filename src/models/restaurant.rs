use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

pub const CACHE_FRESHNESS_DAYS: i64 = 30;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RestaurantSource {
    Yelp,
    Google,
    Geoapify,
}

/// Normalized search result, constructed fresh per lookup by whichever
/// provider tier answered first.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRestaurant {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub image_url: String,
    pub reviews: Vec<String>,
    pub source: RestaurantSource,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Mixed,
    Negative,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct TopDish {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default)]
    pub mentions: u32,
    pub sentiment: Sentiment,
}

fn default_price() -> String {
    "N/A".to_string()
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CachedRestaurant {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub top_dishes: Vec<TopDish>,
    pub reviews: Vec<String>,
    pub image_url: String,
    pub last_updated: OffsetDateTime,
}

impl CachedRestaurant {
    /// An entry older than the freshness window still exists in the table
    /// but must be treated as a miss.
    pub fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
        now - self.last_updated < Duration::days(CACHE_FRESHNESS_DAYS)
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached_entry(last_updated: OffsetDateTime) -> CachedRestaurant {
        CachedRestaurant {
            place_id: "yelp_abc".to_string(),
            name: "Sushi Dai".to_string(),
            address: "Tokyo".to_string(),
            lat: 35.66,
            lng: 139.77,
            top_dishes: Vec::new(),
            reviews: Vec::new(),
            image_url: String::new(),
            last_updated,
        }
    }

    #[test]
    fn test_entry_within_window_is_fresh() {
        let now = OffsetDateTime::now_utc();
        let entry = cached_entry(now - Duration::days(29));
        assert!(entry.is_fresh_at(now));
    }

    #[test]
    fn test_entry_past_window_is_stale() {
        let now = OffsetDateTime::now_utc();
        let entry = cached_entry(now - Duration::days(31));
        assert!(!entry.is_fresh_at(now));
    }

    #[test]
    fn test_top_dish_defaults() {
        let dish: TopDish =
            serde_json::from_str(r#"{"name": "Tonkotsu Ramen", "sentiment": "positive"}"#)
                .unwrap();
        assert_eq!(dish.price, "N/A");
        assert_eq!(dish.mentions, 0);
        assert_eq!(dish.description, "");
        assert_eq!(dish.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_unknown_sentiment_is_rejected() {
        let res = serde_json::from_str::<TopDish>(
            r#"{"name": "Gyoza", "sentiment": "lukewarm"}"#,
        );
        assert!(res.is_err());
    }
}
