// SPDX-License-Identifier: MIT

//! OpenAI Model - Chat Completions API

use super::{api_key, check_response, Content, GenerationConfig, Model, Part};
use crate::adk::error::{ModelError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;

/// OpenAI ChatGPT model
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for compatible endpoints.
    pub fn new(model_name: String) -> Result<Self> {
        let api_key = api_key("OPENAI_API_KEY")?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

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

    fn to_message(content: &Content) -> Value {
        let role = match content.role.as_str() {
            "system" => "system",
            "model" | "assistant" => "assistant",
            _ => "user",
        };

        // Chat Completions has no thinking block; earlier reasoning is dropped
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(t) => Some(t.as_str()),
                Part::Thinking(_) => None,
            })
            .collect();

        json!({ "role": role, "content": text })
    }

    fn parse_response(response: &Value) -> Result<Content> {
        let message = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .map(|choice| &choice["message"])
            .ok_or_else(|| {
                ModelError::InvalidResponse("No choices in OpenAI response".to_string())
            })?;

        let mut parts = Vec::new();
        if let Some(reasoning) = message["reasoning_content"].as_str() {
            if !reasoning.is_empty() {
                parts.push(Part::Thinking(reasoning.to_string()));
            }
        }
        if let Some(text) = message["content"].as_str() {
            parts.push(Part::Text(text.to_string()));
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content> {
        let url = format!("{}/chat/completions", self.base_url);

        let messages: Vec<Value> = history.iter().map(Self::to_message).collect();
        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        log::debug!("OpenAI request to {} with {} messages", url, messages.len());

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let resp_json: Value = check_response("OpenAI", resp).await?.json().await?;
        Self::parse_response(&resp_json)
    }
}
