// SPDX-License-Identifier: MIT

//! LLM Agent - sends one prompt to a model under fixed system instructions

use super::Agent;
use crate::adk::error::Result;
use crate::adk::model::{Content, GenerationConfig, Model};
use async_trait::async_trait;
use std::sync::Arc;

/// System instructions for the general-purpose assistant
pub const ASSISTANT_INSTRUCTION: &str = "You are a kind and knowledgeable AI assistant. \
Answer the user's questions clearly and politely.";

pub struct LLMAgent {
    pub name: String,
    pub description: String,
    pub instruction: String,
    pub model: Arc<dyn Model>,
    pub config: Option<GenerationConfig>,
}

impl LLMAgent {
    pub fn new(
        name: String,
        description: String,
        instruction: String,
        model: Arc<dyn Model>,
    ) -> Self {
        Self {
            name,
            description,
            instruction,
            model,
            config: None,
        }
    }

    /// The `assistant` agent shared by the pipeline steps
    pub fn assistant(model: Arc<dyn Model>) -> Self {
        Self::new(
            "assistant".to_string(),
            "General-purpose question answering assistant".to_string(),
            ASSISTANT_INSTRUCTION.to_string(),
            model,
        )
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[async_trait]
impl Agent for LLMAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: String) -> Result<String> {
        let history = vec![
            Content::text("system", self.instruction.clone()),
            Content::text("user", input),
        ];

        let response = self
            .model
            .generate_content(&history, self.config.as_ref())
            .await?;
        let text = response.joined_text();

        if text.is_empty() {
            log::warn!("Agent {} received an empty response", self.name);
        } else {
            log::info!(
                "Agent {} returning text response (length: {})",
                self.name,
                text.len()
            );
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::RagflowError;
    use crate::adk::model::Part;
    use std::sync::Mutex;

    /// Records the history it was given and replies with fixed parts
    struct RecordingModel {
        reply: Vec<Part>,
        seen: Mutex<Vec<Content>>,
    }

    #[async_trait]
    impl Model for RecordingModel {
        async fn generate_content(
            &self,
            history: &[Content],
            _config: Option<&GenerationConfig>,
        ) -> Result<Content> {
            *self.seen.lock().unwrap() = history.to_vec();
            Ok(Content {
                role: "model".to_string(),
                parts: self.reply.clone(),
            })
        }
    }

    struct FailingModel;

    #[async_trait]
    impl Model for FailingModel {
        async fn generate_content(
            &self,
            _history: &[Content],
            _config: Option<&GenerationConfig>,
        ) -> Result<Content> {
            Err(RagflowError::api("Anthropic", "model unavailable"))
        }
    }

    #[tokio::test]
    async fn test_assistant_sends_instructions_then_prompt() {
        let model = Arc::new(RecordingModel {
            reply: vec![Part::Text("Answer".to_string())],
            seen: Mutex::new(Vec::new()),
        });
        let agent = LLMAgent::assistant(model.clone());

        let text = agent.run("What is RAG?".to_string()).await.unwrap();
        assert_eq!(text, "Answer");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, "system");
        assert_eq!(seen[0].joined_text(), ASSISTANT_INSTRUCTION);
        assert_eq!(seen[1].joined_text(), "What is RAG?");
    }

    #[tokio::test]
    async fn test_empty_reply_is_not_an_error() {
        let model = Arc::new(RecordingModel {
            reply: vec![Part::Thinking("...".to_string())],
            seen: Mutex::new(Vec::new()),
        });
        let agent = LLMAgent::assistant(model);

        assert_eq!(agent.run("hi".to_string()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let agent = LLMAgent::assistant(Arc::new(FailingModel));
        let err = agent.run("hi".to_string()).await.unwrap_err();
        assert!(err.to_string().contains("model unavailable"));
    }
}
