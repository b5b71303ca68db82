use std::sync::Arc;

use anyhow::Context;
use time::OffsetDateTime;

use crate::helpers::openrouter::{extract_json, OpenRouterClient};
use crate::models::restaurant::{CachedRestaurant, TopDish};
use crate::models::usage::ApiProvider;
use crate::repositories::postgres_repo::PostgresConnectionRepo;

/// Reviews beyond this are silently dropped before prompting.
pub const MAX_REVIEWS: usize = 20;

const SYSTEM_PROMPT: &str = r#"You are a restaurant review analyst. Given a set of customer reviews for a restaurant, extract the top 5-10 most recommended dishes. Return a JSON array where each element has:
{
  "name": "dish name",
  "description": "brief description based on reviews",
  "price": "price if mentioned, otherwise 'N/A'",
  "mentions": number of times mentioned or implied,
  "sentiment": "positive/mixed/negative"
}
Sort by number of mentions descending. Return ONLY a valid JSON array, no extra text."#;

#[derive(Clone, Debug)]
pub struct ExtractionInput {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub image_url: String,
    pub reviews: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ExtractionOutcome {
    pub top_dishes: Vec<TopDish>,
    pub from_cache: bool,
    pub limit_reached: bool,
}

pub struct DishExtractionService {
    postgres_repo: Arc<PostgresConnectionRepo>,
    openrouter: OpenRouterClient,
}

impl DishExtractionService {
    pub fn new(postgres_repo: Arc<PostgresConnectionRepo>, openrouter: OpenRouterClient) -> Self {
        Self {
            postgres_repo,
            openrouter,
        }
    }

    /// Cache first, then quota gate, then one LLM call. A failed call or
    /// unparseable output fails the whole extraction; nothing is cached in
    /// that case.
    pub async fn extract_top_dishes(
        &self,
        input: &ExtractionInput,
    ) -> anyhow::Result<ExtractionOutcome> {
        if !input.place_id.is_empty() {
            let cached = self
                .postgres_repo
                .retrieve_cached_restaurant(&input.place_id)
                .await?;
            if let Some(entry) = cached {
                if entry.is_fresh() && !entry.top_dishes.is_empty() {
                    return Ok(ExtractionOutcome {
                        top_dishes: entry.top_dishes,
                        from_cache: true,
                        limit_reached: false,
                    });
                }
            }
        }

        if !self.postgres_repo.can_call(ApiProvider::Llm).await? {
            return Ok(ExtractionOutcome {
                top_dishes: Vec::new(),
                from_cache: false,
                limit_reached: true,
            });
        }
        self.postgres_repo.record_call(ApiProvider::Llm).await?;

        let reviews: Vec<String> = input.reviews.iter().take(MAX_REVIEWS).cloned().collect();
        let reviews_text = reviews
            .iter()
            .enumerate()
            .map(|(i, review)| format!("Review {}: {}", i + 1, review))
            .collect::<Vec<String>>()
            .join("\n\n");

        let address_part = if input.address.is_empty() {
            String::new()
        } else {
            format!(" ({})", input.address)
        };
        let user_prompt = format!(
            "Restaurant: {}{}\n\nCustomer Reviews:\n{}\n\nExtract the top recommended dishes as JSON.",
            input.name, address_part, reviews_text
        );

        let raw = self
            .openrouter
            .chat_completion(SYSTEM_PROMPT, &user_prompt)
            .await?;
        let top_dishes = parse_top_dishes(&raw)?;

        if !input.place_id.is_empty() {
            let entry = CachedRestaurant {
                place_id: input.place_id.clone(),
                name: input.name.clone(),
                address: input.address.clone(),
                lat: input.lat,
                lng: input.lng,
                top_dishes: top_dishes.clone(),
                reviews,
                image_url: input.image_url.clone(),
                last_updated: OffsetDateTime::now_utc(),
            };
            self.postgres_repo.upsert_restaurant_cache(&entry).await?;
        }

        Ok(ExtractionOutcome {
            top_dishes,
            from_cache: false,
            limit_reached: false,
        })
    }
}

/// The prompt asks for mentions-descending, but the ordering is enforced
/// here rather than trusted from the model.
pub fn parse_top_dishes(raw: &str) -> anyhow::Result<Vec<TopDish>> {
    let cleaned = extract_json(raw);
    let mut dishes: Vec<TopDish> =
        serde_json::from_str(&cleaned).context("model output was not a valid dish array")?;
    dishes.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    Ok(dishes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sorts_by_mentions_descending() {
        let raw = r#"[
            {"name": "Gyoza", "mentions": 2, "sentiment": "mixed"},
            {"name": "Tonkotsu Ramen", "mentions": 9, "sentiment": "positive"},
            {"name": "Karaage", "mentions": 5, "sentiment": "positive"}
        ]"#;
        let dishes = parse_top_dishes(raw).unwrap();
        let names: Vec<&str> = dishes.iter().map(|dish| dish.name.as_str()).collect();
        assert_eq!(names, vec!["Tonkotsu Ramen", "Karaage", "Gyoza"]);
    }

    #[test]
    fn test_parse_accepts_fenced_output() {
        let raw = "```json\n[{\"name\": \"Pho\", \"mentions\": 3, \"sentiment\": \"positive\"}]\n```";
        let dishes = parse_top_dishes(raw).unwrap();
        assert_eq!(dishes.len(), 1);
        assert_eq!(dishes[0].name, "Pho");
    }

    #[test]
    fn test_parse_rejects_prose() {
        let raw = "The most popular dishes seem to be the ramen and the gyoza.";
        assert!(parse_top_dishes(raw).is_err());
    }
}
