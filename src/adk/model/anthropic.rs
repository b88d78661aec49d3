//! Anthropic Model - Claude Messages API

use super::{api_key, check_response, Content, GenerationConfig, Model, Part};
use crate::adk::error::{ModelError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude model
pub struct AnthropicModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl AnthropicModel {
    /// Requires `ANTHROPIC_API_KEY`; `ANTHROPIC_BASE_URL` overrides the endpoint.
    pub fn new(model_name: String) -> Result<Self> {
        let api_key = api_key("ANTHROPIC_API_KEY")?;
        let base_url =
            env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

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

    /// System turns are sent as the top-level `system` field
    fn system_prompt(history: &[Content]) -> Option<String> {
        let system: Vec<String> = history
            .iter()
            .filter(|c| c.role == "system")
            .map(Content::joined_text)
            .filter(|t| !t.is_empty())
            .collect();

        if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        }
    }

    fn to_message(content: &Content) -> Option<Value> {
        let role = match content.role.as_str() {
            "system" => return None,
            "model" | "assistant" => "assistant",
            _ => "user",
        };

        let blocks: Vec<Value> = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(json!({ "type": "text", "text": text })),
                // Unsigned thinking blocks are rejected on replay
                Part::Thinking(_) => None,
            })
            .collect();

        if blocks.is_empty() {
            return None;
        }

        Some(json!({ "role": role, "content": blocks }))
    }

    fn request_body(&self, history: &[Content], config: Option<&GenerationConfig>) -> Value {
        let messages: Vec<Value> = history.iter().filter_map(Self::to_message).collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages,
            "max_tokens": config.and_then(|c| c.max_output_tokens).unwrap_or(4096)
        });

        if let Some(system) = Self::system_prompt(history) {
            body["system"] = json!(system);
        }

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
            if let Some(top_k) = cfg.top_k {
                body["top_k"] = json!(top_k);
            }
        }

        body
    }

    fn parse_response(response: &Value) -> Result<Content> {
        let blocks = response["content"].as_array().ok_or_else(|| {
            ModelError::InvalidResponse("No content in Anthropic response".to_string())
        })?;

        let parts = blocks
            .iter()
            .filter_map(|block| match block["type"].as_str() {
                Some("text") => block["text"].as_str().map(|t| Part::Text(t.to_string())),
                Some("thinking") => block["thinking"]
                    .as_str()
                    .map(|t| Part::Thinking(t.to_string())),
                _ => None,
            })
            .collect();

        if let Some(stop_reason) = response["stop_reason"].as_str() {
            log::debug!("Anthropic stop reason: {}", stop_reason);
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for AnthropicModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content> {
        let url = format!("{}/messages", self.base_url);
        let body = self.request_body(history, config);

        log::debug!("Anthropic request to {} with {} messages", url, history.len());

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let resp_json: Value = check_response("Anthropic", resp).await?.json().await?;
        Self::parse_response(&resp_json)
    }
}
