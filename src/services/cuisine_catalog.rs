use std::sync::Arc;

use anyhow::Context;

use crate::helpers::openrouter::{extract_json, OpenRouterClient};
use crate::helpers::unsplash::search_unsplash;
use crate::models::dish::{GenericDish, ParsedDish};
use crate::models::usage::ApiProvider;
use crate::repositories::postgres_repo::PostgresConnectionRepo;

const SYSTEM_PROMPT: &str = r#"You are a world-class food expert. When given a cuisine type and a target language, return a JSON array of 10-15 signature dishes for that cuisine. Each dish object MUST have these exact fields:
{
  "dishName": "name in the original language of the cuisine",
  "origLang": "name in the cuisine's original language",
  "engLang": "English name/translation",
  "prefLang": "name translated into the requested target language",
  "ingredients": "main ingredients, comma-separated",
  "taste": "taste profile description (1 sentence)",
  "eatMethod": "how to eat it (1 sentence)",
  "sauces": "typical sauces/dips/condiments",
  "avgPrice": "estimated typical price range in USD"
}
Return ONLY a valid JSON array, no extra text."#;

#[derive(Clone, Debug)]
pub struct CuisineOutcome {
    pub dishes: Vec<GenericDish>,
    pub from_cache: bool,
    pub limit_reached: bool,
}

pub struct CuisineCatalogService {
    postgres_repo: Arc<PostgresConnectionRepo>,
    openrouter: OpenRouterClient,
    http_client: reqwest::Client,
    unsplash_key: String,
}

impl CuisineCatalogService {
    pub fn new(
        postgres_repo: Arc<PostgresConnectionRepo>,
        openrouter: OpenRouterClient,
        http_client: reqwest::Client,
        unsplash_key: String,
    ) -> Self {
        Self {
            postgres_repo,
            openrouter,
            http_client,
            unsplash_key,
        }
    }

    /// Any stored rows for (cuisine, language_code) are a hit and cost
    /// nothing. A miss spends one LLM call and persists every parsed dish,
    /// each enriched with a best-effort image, one at a time.
    pub async fn lookup_cuisine(
        &self,
        cuisine: &str,
        language: &str,
        language_code: &str,
    ) -> anyhow::Result<CuisineOutcome> {
        let cuisine_key = cuisine.to_string();
        let language_code_key = language_code.to_string();

        let cached = self
            .postgres_repo
            .retrieve_generic_dishes(&cuisine_key, &language_code_key)
            .await?;
        if !cached.is_empty() {
            return Ok(CuisineOutcome {
                dishes: cached,
                from_cache: true,
                limit_reached: false,
            });
        }

        if !self.postgres_repo.can_call(ApiProvider::Llm).await? {
            return Ok(CuisineOutcome {
                dishes: Vec::new(),
                from_cache: false,
                limit_reached: true,
            });
        }
        self.postgres_repo.record_call(ApiProvider::Llm).await?;

        let user_prompt = format!(
            "Cuisine: {}. Target language: {}. Return the JSON array of signature dishes.",
            cuisine, language
        );
        let raw = self
            .openrouter
            .chat_completion(SYSTEM_PROMPT, &user_prompt)
            .await?;
        let parsed = parse_generic_dishes(&raw)?;

        let mut saved = Vec::new();
        for dish in parsed {
            let image_url = search_unsplash(
                &self.http_client,
                &self.unsplash_key,
                &format!("{} {}", cuisine, dish.eng_lang),
            )
            .await;

            let dish_name = dish.identity_name().to_string();
            let row = GenericDish {
                cuisine: cuisine_key.clone(),
                dish_name,
                pref_lang_code: language_code_key.clone(),
                orig_lang: dish.orig_lang,
                eng_lang: dish.eng_lang,
                pref_lang: dish.pref_lang,
                ingredients: dish.ingredients,
                taste: dish.taste,
                eat_method: dish.eat_method,
                sauces: dish.sauces,
                avg_price: dish.avg_price,
                image_url,
            };
            self.postgres_repo.upsert_generic_dish(&row).await?;
            saved.push(row);
        }

        Ok(CuisineOutcome {
            dishes: saved,
            from_cache: false,
            limit_reached: false,
        })
    }
}

pub fn parse_generic_dishes(raw: &str) -> anyhow::Result<Vec<ParsedDish>> {
    let cleaned = extract_json(raw);
    let dishes: Vec<ParsedDish> =
        serde_json::from_str(&cleaned).context("model output was not a valid dish array")?;
    Ok(dishes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_dish_array() {
        let raw = r#"<think>Thai cuisine, let me list the classics.</think>
```json
[
  {"dishName": "ผัดไทย", "origLang": "Pad Thai", "engLang": "Pad Thai", "prefLang": "Pad Thai", "ingredients": "rice noodles, shrimp, tamarind", "taste": "Sweet, sour and nutty.", "eatMethod": "Squeeze lime over and mix before eating.", "sauces": "fish sauce, crushed peanuts", "avgPrice": "$10-15"},
  {"engLang": "Green Curry", "ingredients": "coconut milk, green chili", "taste": "Creamy and spicy.", "eatMethod": "Spoon over jasmine rice.", "sauces": "none", "avgPrice": "$12-18"}
]
```"#;
        let dishes = parse_generic_dishes(raw).unwrap();
        assert_eq!(dishes.len(), 2);
        assert_eq!(dishes[0].identity_name(), "ผัดไทย");
        assert_eq!(dishes[1].identity_name(), "Green Curry");
    }

    #[test]
    fn test_parse_rejects_non_array_output() {
        assert!(parse_generic_dishes("I would recommend starting with Pad Thai.").is_err());
    }
}
