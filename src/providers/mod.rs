use std::sync::Arc;

use async_trait::async_trait;

use crate::models::restaurant::CandidateRestaurant;
use crate::models::usage::ApiProvider;
use crate::repositories::postgres_repo::PostgresConnectionRepo;

pub mod geoapify;
pub mod google_places;
pub mod yelp;

pub use geoapify::GeoapifyProvider;
pub use google_places::GooglePlacesProvider;
pub use yelp::YelpProvider;

/// Per-day quota questions the orchestrator asks before spending a call on
/// a metered provider.
#[async_trait]
pub trait UsageGate: Send + Sync {
    async fn can_call(&self, provider: ApiProvider) -> anyhow::Result<bool>;
    async fn record_call(&self, provider: ApiProvider) -> anyhow::Result<()>;
}

#[async_trait]
impl UsageGate for PostgresConnectionRepo {
    async fn can_call(&self, provider: ApiProvider) -> anyhow::Result<bool> {
        PostgresConnectionRepo::can_call(self, provider).await
    }

    async fn record_call(&self, provider: ApiProvider) -> anyhow::Result<()> {
        PostgresConnectionRepo::record_call(self, provider).await
    }
}

#[derive(Clone, Debug)]
pub struct RestaurantQuery {
    pub raw: String,
    pub name: String,
    pub location: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl RestaurantQuery {
    /// The first whitespace-delimited token is read as the location and the
    /// remainder as the restaurant name; a single-token query serves as
    /// both. Misparses multi-word locations ("New York Katz's"), kept
    /// because changing it changes search results.
    pub fn parse(raw: &str, lat: Option<f64>, lng: Option<f64>) -> Self {
        let parts: Vec<&str> = raw.split(' ').collect();
        let (location, name) = if parts.len() > 1 {
            (parts[0].to_string(), parts[1..].join(" "))
        } else {
            (raw.to_string(), raw.to_string())
        };

        Self {
            raw: raw.to_string(),
            name,
            location,
            lat,
            lng,
        }
    }
}

/// One ranked tier of the fallback chain: a provider-specific search
/// normalized to the common candidate shape, plus the two facts the
/// orchestrator needs to run it (which quota it burns, whether its result
/// is only usable with reviews attached).
#[async_trait]
pub trait RestaurantProvider: Send + Sync {
    fn quota(&self) -> Option<ApiProvider>;
    fn requires_reviews(&self) -> bool;
    async fn search(&self, query: &RestaurantQuery) -> Option<CandidateRestaurant>;
}

pub struct TieredRestaurantSearch {
    usage_gate: Arc<dyn UsageGate>,
    tiers: Vec<Box<dyn RestaurantProvider>>,
}

impl TieredRestaurantSearch {
    pub fn new(usage_gate: Arc<dyn UsageGate>, tiers: Vec<Box<dyn RestaurantProvider>>) -> Self {
        Self { usage_gate, tiers }
    }

    /// Fixed production ordering: reviews-rich and quota-cheap first, maps
    /// second, bare geocoding last.
    pub fn with_default_tiers(
        postgres_repo: Arc<PostgresConnectionRepo>,
        http_client: reqwest::Client,
        yelp_api_key: String,
        google_places_key: String,
        geoapify_key: String,
    ) -> Self {
        Self::new(
            postgres_repo,
            vec![
                Box::new(YelpProvider::new(http_client.clone(), yelp_api_key)),
                Box::new(GooglePlacesProvider::new(
                    http_client.clone(),
                    google_places_key,
                )),
                Box::new(GeoapifyProvider::new(http_client, geoapify_key)),
            ],
        )
    }

    /// Walks the tiers in order. A metered tier over quota is skipped
    /// without consuming anything; otherwise its call is recorded before
    /// the search. The first candidate satisfying the tier's review
    /// requirement short-circuits the chain.
    pub async fn search(
        &self,
        query: &RestaurantQuery,
    ) -> anyhow::Result<Option<CandidateRestaurant>> {
        for tier in &self.tiers {
            if let Some(provider) = tier.quota() {
                if !self.usage_gate.can_call(provider).await? {
                    continue;
                }
                self.usage_gate.record_call(provider).await?;
            }

            let candidate = match tier.search(query).await {
                Some(candidate) => candidate,
                None => continue,
            };
            if tier.requires_reviews() && candidate.reviews.is_empty() {
                continue;
            }
            return Ok(Some(candidate));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::restaurant::RestaurantSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubGate {
        yelp_allowed: bool,
        google_allowed: bool,
        recorded: Mutex<Vec<ApiProvider>>,
    }

    impl StubGate {
        fn allowing(yelp_allowed: bool, google_allowed: bool) -> Self {
            Self {
                yelp_allowed,
                google_allowed,
                recorded: Mutex::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<ApiProvider> {
            self.recorded.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UsageGate for StubGate {
        async fn can_call(&self, provider: ApiProvider) -> anyhow::Result<bool> {
            Ok(match provider {
                ApiProvider::Yelp => self.yelp_allowed,
                ApiProvider::Google => self.google_allowed,
                ApiProvider::Llm => true,
            })
        }

        async fn record_call(&self, provider: ApiProvider) -> anyhow::Result<()> {
            self.recorded.lock().unwrap().push(provider);
            Ok(())
        }
    }

    struct StubProvider {
        quota: Option<ApiProvider>,
        requires_reviews: bool,
        result: Option<CandidateRestaurant>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RestaurantProvider for StubProvider {
        fn quota(&self) -> Option<ApiProvider> {
            self.quota
        }

        fn requires_reviews(&self) -> bool {
            self.requires_reviews
        }

        async fn search(&self, _query: &RestaurantQuery) -> Option<CandidateRestaurant> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn candidate(source: RestaurantSource, reviews: Vec<&str>) -> CandidateRestaurant {
        CandidateRestaurant {
            place_id: "stub_1".to_string(),
            name: "Sushi Dai".to_string(),
            address: "Tokyo".to_string(),
            lat: 35.66,
            lng: 139.77,
            image_url: String::new(),
            reviews: reviews.into_iter().map(String::from).collect(),
            source,
        }
    }

    struct TierHandles {
        yelp_calls: Arc<AtomicUsize>,
        google_calls: Arc<AtomicUsize>,
        geo_calls: Arc<AtomicUsize>,
    }

    fn build_tiers(
        yelp_result: Option<CandidateRestaurant>,
        google_result: Option<CandidateRestaurant>,
        geo_result: Option<CandidateRestaurant>,
    ) -> (Vec<Box<dyn RestaurantProvider>>, TierHandles) {
        let handles = TierHandles {
            yelp_calls: Arc::new(AtomicUsize::new(0)),
            google_calls: Arc::new(AtomicUsize::new(0)),
            geo_calls: Arc::new(AtomicUsize::new(0)),
        };
        let tiers: Vec<Box<dyn RestaurantProvider>> = vec![
            Box::new(StubProvider {
                quota: Some(ApiProvider::Yelp),
                requires_reviews: true,
                result: yelp_result,
                calls: handles.yelp_calls.clone(),
            }),
            Box::new(StubProvider {
                quota: Some(ApiProvider::Google),
                requires_reviews: true,
                result: google_result,
                calls: handles.google_calls.clone(),
            }),
            Box::new(StubProvider {
                quota: None,
                requires_reviews: false,
                result: geo_result,
                calls: handles.geo_calls.clone(),
            }),
        ];
        (tiers, handles)
    }

    #[tokio::test]
    async fn test_first_tier_with_reviews_short_circuits() {
        let gate = Arc::new(StubGate::allowing(true, true));
        let (tiers, handles) = build_tiers(
            Some(candidate(RestaurantSource::Yelp, vec!["great tonkatsu"])),
            Some(candidate(RestaurantSource::Google, vec!["fine"])),
            Some(candidate(RestaurantSource::Geoapify, vec![])),
        );
        let search = TieredRestaurantSearch::new(gate.clone(), tiers);

        let result = search
            .search(&RestaurantQuery::parse("Tokyo Sushi Dai", None, None))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.source, RestaurantSource::Yelp);
        assert_eq!(handles.google_calls.load(Ordering::SeqCst), 0);
        assert_eq!(handles.geo_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gate.recorded(), vec![ApiProvider::Yelp]);
    }

    #[tokio::test]
    async fn test_reviewless_first_tier_falls_through_in_order() {
        let gate = Arc::new(StubGate::allowing(true, true));
        let (tiers, handles) = build_tiers(
            Some(candidate(RestaurantSource::Yelp, vec![])),
            Some(candidate(RestaurantSource::Google, vec!["order the duck"])),
            Some(candidate(RestaurantSource::Geoapify, vec![])),
        );
        let search = TieredRestaurantSearch::new(gate.clone(), tiers);

        let result = search
            .search(&RestaurantQuery::parse("Tokyo Sushi Dai", None, None))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.source, RestaurantSource::Google);
        assert_eq!(handles.yelp_calls.load(Ordering::SeqCst), 1);
        assert_eq!(handles.google_calls.load(Ordering::SeqCst), 1);
        assert_eq!(handles.geo_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gate.recorded(), vec![ApiProvider::Yelp, ApiProvider::Google]);
    }

    #[tokio::test]
    async fn test_over_quota_tier_is_skipped_without_spend() {
        let gate = Arc::new(StubGate::allowing(false, true));
        let (tiers, handles) = build_tiers(
            Some(candidate(RestaurantSource::Yelp, vec!["would match"])),
            Some(candidate(RestaurantSource::Google, vec!["order the duck"])),
            Some(candidate(RestaurantSource::Geoapify, vec![])),
        );
        let search = TieredRestaurantSearch::new(gate.clone(), tiers);

        let result = search
            .search(&RestaurantQuery::parse("Tokyo Sushi Dai", None, None))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.source, RestaurantSource::Google);
        assert_eq!(handles.yelp_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gate.recorded(), vec![ApiProvider::Google]);
    }

    #[tokio::test]
    async fn test_geocoding_fallback_accepts_empty_reviews() {
        let gate = Arc::new(StubGate::allowing(true, true));
        let (tiers, handles) = build_tiers(
            None,
            None,
            Some(candidate(RestaurantSource::Geoapify, vec![])),
        );
        let search = TieredRestaurantSearch::new(gate.clone(), tiers);

        let result = search
            .search(&RestaurantQuery::parse("Tokyo Sushi Dai", None, None))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.source, RestaurantSource::Geoapify);
        assert!(result.reviews.is_empty());
        assert_eq!(handles.geo_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.recorded(), vec![ApiProvider::Yelp, ApiProvider::Google]);
    }

    #[tokio::test]
    async fn test_all_tiers_dry_yields_none() {
        let gate = Arc::new(StubGate::allowing(true, true));
        let (tiers, _handles) = build_tiers(None, None, None);
        let search = TieredRestaurantSearch::new(gate, tiers);

        let result = search
            .search(&RestaurantQuery::parse("Nowhere", None, None))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_query_parse_splits_first_token_as_location() {
        let query = RestaurantQuery::parse("Tokyo Sushi Dai", None, None);
        assert_eq!(query.location, "Tokyo");
        assert_eq!(query.name, "Sushi Dai");
        assert_eq!(query.raw, "Tokyo Sushi Dai");
    }

    #[test]
    fn test_query_parse_single_token_serves_as_both() {
        let query = RestaurantQuery::parse("Sushi", Some(35.66), Some(139.77));
        assert_eq!(query.location, "Sushi");
        assert_eq!(query.name, "Sushi");
        assert_eq!(query.lat, Some(35.66));
    }
}
