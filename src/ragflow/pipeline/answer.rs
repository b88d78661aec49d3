// SPDX-License-Identifier: MIT

use super::prompt::AnswerPrompt;
use super::HandsonOutput;
use crate::adk::agent::Agent;
use crate::ragflow::workflow::{RunContext, StepError, TypedStep};
use async_trait::async_trait;
use std::sync::Arc;

/// `assistant-response`: the assistant's reply, or an apology carrying the error
pub struct AssistantResponseStep {
    agent: Arc<dyn Agent>,
}

impl AssistantResponseStep {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl TypedStep for AssistantResponseStep {
    type Input = AnswerPrompt;
    type Output = HandsonOutput;

    fn id(&self) -> &str {
        "assistant-response"
    }

    fn description(&self) -> &str {
        "Asks the assistant to answer from the prepared prompt"
    }

    async fn run(&self, input: AnswerPrompt, _ctx: &RunContext) -> Result<HandsonOutput, StepError> {
        let text = match self.agent.run(input.prompt).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("Assistant failed to answer: {}", e);
                format!("An error occurred: {}", e)
            }
        };

        Ok(HandsonOutput { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::{RagflowError, Result};
    use serde_json::json;

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, input: String) -> Result<String> {
            Ok(format!("answer to: {}", input))
        }
    }

    struct BrokenAgent;

    #[async_trait]
    impl Agent for BrokenAgent {
        fn name(&self) -> &str {
            "broken"
        }

        async fn run(&self, _input: String) -> Result<String> {
            Err(RagflowError::other("connection reset"))
        }
    }

    fn prompt() -> AnswerPrompt {
        AnswerPrompt {
            prompt: "Summarise".to_string(),
            original_query: "AI".to_string(),
            page_title: "AI Guide".to_string(),
            page_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_reply_is_returned_verbatim() {
        let ctx = RunContext::new("handson-workflow", json!({ "query": "AI" }));
        let output = AssistantResponseStep::new(Arc::new(EchoAgent))
            .run(prompt(), &ctx)
            .await
            .unwrap();
        assert_eq!(output.text, "answer to: Summarise");
    }

    #[tokio::test]
    async fn test_agent_error_becomes_text() {
        let ctx = RunContext::new("handson-workflow", json!({ "query": "AI" }));
        let output = AssistantResponseStep::new(Arc::new(BrokenAgent))
            .run(prompt(), &ctx)
            .await
            .unwrap();
        assert_eq!(output.text, "An error occurred: connection reset");
    }
}
