// SPDX-License-Identifier: MIT

//! Model module - defines the LLM completion trait and implementations
//!
//! This module provides the core Model trait and shared types.
//! Model implementations are in their own submodules:
//! - [anthropic] - Anthropic's Claude API
//! - [gemini] - Google's Gemini API
//! - [openai] - OpenAI's ChatGPT API

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::adk::error::{ModelError, RagflowError, Result};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::sync::Arc;

/// Model used when neither the CLI nor the environment names one
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenation of all text parts, thinking excluded
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                Part::Thinking(_) => None,
            })
            .collect()
    }
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Thinking/reasoning content from thinking models
    Thinking(String),
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content>;
}

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
    Gemini,
}

impl Provider {
    /// Infer the provider from a model name
    pub fn infer(model_name: &str) -> Self {
        if model_name.starts_with("gpt") || model_name.starts_with("o1") {
            Provider::OpenAI
        } else if model_name.starts_with("gemini") {
            Provider::Gemini
        } else {
            Provider::Anthropic
        }
    }
}

impl FromStr for Provider {
    type Err = ModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAI),
            "gemini" | "google" => Ok(Provider::Gemini),
            other => Err(ModelError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Build a model by name, honouring `MODEL_PROVIDER` when set
pub fn from_name(model_name: &str) -> Result<Arc<dyn Model>> {
    let provider = match env::var("MODEL_PROVIDER") {
        Ok(name) if !name.is_empty() => name.parse()?,
        _ => Provider::infer(model_name),
    };

    log::info!("Using provider: {:?} with model: {}", provider, model_name);

    let model: Arc<dyn Model> = match provider {
        Provider::Anthropic => Arc::new(anthropic::AnthropicModel::new(model_name.to_string())?),
        Provider::OpenAI => Arc::new(openai::OpenAIModel::new(model_name.to_string())?),
        Provider::Gemini => Arc::new(gemini::GeminiModel::new(model_name.to_string())?),
    };
    Ok(model)
}

/// Read a required API key from the environment
pub(crate) fn api_key(var: &str) -> Result<String> {
    env::var(var)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ModelError::ApiKeyMissing(var.to_string()).into())
}

/// Turn a non-success response into an error, passing successful ones through
pub(crate) async fn check_response(provider: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(ModelError::RateLimited { retry_after_secs }.into());
    }

    let text = resp.text().await?;
    Err(RagflowError::api(provider, format!("{}: {}", status, text)))
}
