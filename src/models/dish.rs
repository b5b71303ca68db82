use serde::{Deserialize, Serialize};

/// One catalog row, keyed by (cuisine, dish_name, pref_lang_code).
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenericDish {
    pub cuisine: String,
    pub dish_name: String,
    pub orig_lang: String,
    pub eng_lang: String,
    pub pref_lang: String,
    pub pref_lang_code: String,
    pub ingredients: String,
    pub taste: String,
    pub eat_method: String,
    pub sauces: String,
    pub avg_price: String,
    pub image_url: String,
}

/// Dish object as the model returns it. Every field the model may omit
/// defaults to empty so one sloppy dish does not fail the whole batch.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDish {
    #[serde(default)]
    pub dish_name: String,
    #[serde(default)]
    pub orig_lang: String,
    #[serde(default)]
    pub eng_lang: String,
    #[serde(default)]
    pub pref_lang: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub taste: String,
    #[serde(default)]
    pub eat_method: String,
    #[serde(default)]
    pub sauces: String,
    #[serde(default)]
    pub avg_price: String,
}

impl ParsedDish {
    /// Identity key component. Falls back to the English name when the
    /// model omits the native one, so upserts cannot collide on "".
    pub fn identity_name(&self) -> &str {
        if self.dish_name.is_empty() {
            &self.eng_lang
        } else {
            &self.dish_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_dish_camel_case_fields() {
        let dish: ParsedDish = serde_json::from_str(
            r#"{
                "dishName": "寿司",
                "origLang": "Sushi (すし)",
                "engLang": "Sushi",
                "prefLang": "Sushi",
                "ingredients": "vinegared rice, raw fish",
                "taste": "Clean and briny.",
                "eatMethod": "Eaten in one bite, fish side down.",
                "sauces": "soy sauce, wasabi",
                "avgPrice": "$15-60"
            }"#,
        )
        .unwrap();
        assert_eq!(dish.dish_name, "寿司");
        assert_eq!(dish.eat_method, "Eaten in one bite, fish side down.");
        assert_eq!(dish.identity_name(), "寿司");
    }

    #[test]
    fn test_identity_falls_back_to_english_name() {
        let dish: ParsedDish =
            serde_json::from_str(r#"{"engLang": "Pad Thai", "taste": "Sweet and sour."}"#)
                .unwrap();
        assert_eq!(dish.identity_name(), "Pad Thai");
    }
}
