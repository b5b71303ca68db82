use anyhow::{anyhow, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MODEL: &str = "qwen/qwen3-235b-a22b-2507";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 4000;
const APP_TITLE: &str = "MenuDecoder";

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenRouterClient {
    http_client: reqwest::Client,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(http_client: reqwest::Client, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
        }
    }

    /// Single chat-completion round trip. A non-success status is a hard
    /// error carrying the response body; there is no retry.
    pub async fn chat_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            bail!("OPENROUTER_API_KEY is not configured");
        }

        let request = ChatCompletionRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .http_client
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .header("X-Title", APP_TITLE)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenRouter error {}: {}", status, body));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// The model is instructed to answer with a bare JSON array but may wrap it
/// in thinking annotations or a markdown fence. Strips both; the caller
/// still owns the actual parse.
pub fn extract_json(raw: &str) -> String {
    let think_block = Regex::new(r"(?s)<think>.*?</think>").unwrap();
    let cleaned = think_block.replace_all(raw, "");
    let cleaned = cleaned.trim();

    let fence = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap();
    if let Some(captures) = fence.captures(cleaned) {
        return captures[1].trim().to_string();
    }

    cleaned.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"[{"name": "Khao Soi", "mentions": 4}]"#;

    #[test]
    fn test_extract_json_raw() {
        assert_eq!(extract_json(PAYLOAD), PAYLOAD);
        assert_eq!(extract_json(&format!("  {}\n", PAYLOAD)), PAYLOAD);
    }

    #[test]
    fn test_extract_json_fenced() {
        let fenced = format!("```json\n{}\n```", PAYLOAD);
        assert_eq!(extract_json(&fenced), PAYLOAD);

        let bare_fence = format!("```\n{}\n```", PAYLOAD);
        assert_eq!(extract_json(&bare_fence), PAYLOAD);
    }

    #[test]
    fn test_extract_json_thinking_then_fenced() {
        let wrapped = format!(
            "<think>The user wants dishes.\nLet me check the reviews.</think>\nHere you go:\n```json\n{}\n```",
            PAYLOAD
        );
        assert_eq!(extract_json(&wrapped), PAYLOAD);
    }

    #[test]
    fn test_extract_json_equivalent_content_parses_identically() {
        let raw: serde_json::Value = serde_json::from_str(&extract_json(PAYLOAD)).unwrap();
        let fenced: serde_json::Value =
            serde_json::from_str(&extract_json(&format!("```json\n{}\n```", PAYLOAD))).unwrap();
        let thought: serde_json::Value = serde_json::from_str(&extract_json(&format!(
            "<think>hmm</think>```json\n{}\n```",
            PAYLOAD
        )))
        .unwrap();
        assert_eq!(raw, fenced);
        assert_eq!(raw, thought);
    }
}
