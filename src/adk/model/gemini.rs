// SPDX-License-Identifier: MIT

//! Gemini Model - Google's Gemini API implementation

use super::{api_key, check_response, Content, GenerationConfig, Model, Part};
use crate::adk::error::{ModelError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini model implementation
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiModel {
    /// Create a new GeminiModel
    ///
    /// Requires `GOOGLE_API_KEY` environment variable to be set.
    pub fn new(model_name: String) -> Result<Self> {
        let api_key = api_key("GOOGLE_API_KEY")?;
        let base_url =
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::with_endpoint(api_key, model_name, base_url))
    }

    pub fn with_endpoint(api_key: String, model_name: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Gemini has no system role in `contents`; it goes in `systemInstruction`
    fn request_body(history: &[Content], config: Option<&GenerationConfig>) -> Value {
        let system: Vec<Value> = history
            .iter()
            .filter(|c| c.role == "system")
            .flat_map(|c| c.parts.iter().filter_map(part_to_gemini_json))
            .collect();

        let contents: Vec<Value> = history
            .iter()
            .filter(|c| c.role != "system")
            .map(|c| {
                let role = if c.role == "user" { "user" } else { "model" };
                let parts: Vec<Value> = c.parts.iter().filter_map(part_to_gemini_json).collect();
                json!({ "role": role, "parts": parts })
            })
            .collect();

        let mut body = json!({ "contents": contents });
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": system });
        }

        if let Some(cfg) = config {
            let mut generation = json!({});
            if let Some(temp) = cfg.temperature {
                generation["temperature"] = json!(temp);
            }
            if let Some(max) = cfg.max_output_tokens {
                generation["maxOutputTokens"] = json!(max);
            }
            if let Some(top_p) = cfg.top_p {
                generation["topP"] = json!(top_p);
            }
            if let Some(top_k) = cfg.top_k {
                generation["topK"] = json!(top_k);
            }
            body["generationConfig"] = generation;
        }

        body
    }

    fn parse_response(resp_json: &Value) -> Result<Content> {
        let candidate = resp_json["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No candidates in response".to_string()))?;

        if let Some(finish_reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
            log::debug!("Gemini finish reason: {}", finish_reason);
            if finish_reason == "SAFETY" {
                return Err(ModelError::InvalidResponse(
                    "Gemini blocked response due to safety filters.".to_string(),
                )
                .into());
            }
        }

        let parts_json = candidate["content"]["parts"].as_array().ok_or_else(|| {
            ModelError::InvalidResponse(format!("No content in Gemini candidate: {}", candidate))
        })?;

        Ok(Content {
            role: "model".to_string(),
            parts: parts_json.iter().flat_map(parse_gemini_part).collect(),
        })
    }
}

#[async_trait]
impl Model for GeminiModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model_name
        );
        let body = Self::request_body(history, config);

        log::debug!("Gemini request for model {}", self.model_name);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        let resp_json: Value = check_response("Gemini", resp).await?.json().await?;
        Self::parse_response(&resp_json)
    }
}

/// Serialize a Part to Gemini API JSON format
/// Returns None for parts that shouldn't be sent (e.g., Thinking)
pub fn part_to_gemini_json(part: &Part) -> Option<Value> {
    match part {
        Part::Text(t) => Some(json!({ "text": t })),
        Part::Thinking(_) => None,
    }
}

/// Parse a Gemini API JSON part into Parts
pub fn parse_gemini_part(p: &Value) -> Vec<Part> {
    let mut parts = Vec::new();

    // Thinking models flag reasoning with `thought: true` on a text part
    let is_thought = p.get("thought").and_then(Value::as_bool).unwrap_or(false);
    if let Some(text) = p["text"].as_str() {
        if is_thought {
            parts.push(Part::Thinking(text.to_string()));
        } else {
            parts.push(Part::Text(text.to_string()));
        }
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_serialize_thinking_part_returns_none() {
        let part = Part::Thinking("Internal reasoning".to_string());
        assert!(part_to_gemini_json(&part).is_none());
    }

    #[test]
    fn test_parse_thought_part() {
        let parts = parse_gemini_part(&json!({ "text": "Let me think...", "thought": true }));
        assert_eq!(parts.len(), 1);
        assert!(matches!(&parts[0], Part::Thinking(t) if t == "Let me think..."));
    }

    #[test]
    fn test_request_body_moves_system_to_instruction() {
        let history = vec![
            Content::text("system", "You are kind"),
            Content::text("user", "Hi"),
        ];
        let body = GeminiModel::request_body(&history, None);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are kind");
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_safety_block_is_error() {
        let response = json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        });
        assert!(GeminiModel::parse_response(&response).is_err());
    }

    #[tokio::test]
    async fn test_generate_content_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Hello" }] },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let model = GeminiModel::with_endpoint("g-key".into(), "gemini-test".into(), server.uri());
        let reply = model
            .generate_content(&[Content::text("user", "Hi")], None)
            .await
            .unwrap();
        assert_eq!(reply.joined_text(), "Hello");
    }
}
