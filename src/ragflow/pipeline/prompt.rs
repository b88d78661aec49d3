// SPDX-License-Identifier: MIT

use super::HandsonInput;
use crate::ragflow::tools::PageFetch;
use crate::ragflow::workflow::{RunContext, StepError, TypedStep};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_PROMPT: &str = "The page content could not be retrieved.";

const UNKNOWN_TITLE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerPrompt {
    pub prompt: String,
    pub original_query: String,
    pub page_title: String,
    pub page_url: String,
}

pub fn answer_prompt(query: &str, title: &str, content: &str) -> String {
    format!(
        "Answer the user's question based on the content of the following Confluence page.
User question: {query}

Page title: {title}
Page content: {content}

Keep the answer concise and easy to understand, using bullet points where helpful."
    )
}

/// `prepare-prompt`: combines the fetched page with the original question
pub struct PreparePromptStep;

#[async_trait]
impl TypedStep for PreparePromptStep {
    type Input = PageFetch;
    type Output = AnswerPrompt;

    fn id(&self) -> &str {
        "prepare-prompt"
    }

    fn description(&self) -> &str {
        "Builds the answer prompt from the page and the original question"
    }

    async fn run(&self, input: PageFetch, ctx: &RunContext) -> Result<AnswerPrompt, StepError> {
        let HandsonInput { query } = ctx.init_data()?;
        let PageFetch { page, error } = input;

        let content = match (error, page.content) {
            (None, Some(content)) => content,
            (error, _) => {
                log::warn!(
                    "No page content for '{}' ({}), using placeholder prompt",
                    query,
                    error.as_deref().unwrap_or("empty body")
                );
                let page_title = if page.title.is_empty() {
                    UNKNOWN_TITLE.to_string()
                } else {
                    page.title
                };
                return Ok(AnswerPrompt {
                    prompt: PLACEHOLDER_PROMPT.to_string(),
                    original_query: query,
                    page_title,
                    page_url: page.url,
                });
            }
        };

        Ok(AnswerPrompt {
            prompt: answer_prompt(&query, &page.title, &content),
            original_query: query,
            page_title: page.title,
            page_url: page.url,
        })
    }
}
