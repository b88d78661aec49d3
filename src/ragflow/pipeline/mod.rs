// SPDX-License-Identifier: MIT

//! The Confluence question-answering pipeline
//!
//! ```text
//! generate-cql-query -> confluence-search-pages -> select-first-page
//!   -> confluence-get-page -> prepare-prompt -> assistant-response
//! ```

mod answer;
mod prompt;
mod query;
mod select;

pub use answer::AssistantResponseStep;
pub use prompt::{answer_prompt, AnswerPrompt, PreparePromptStep, PLACEHOLDER_PROMPT};
pub use query::{cql_prompt, fallback_cql, CqlQuery, GenerateCqlStep};
pub use select::{PageRequest, SelectFirstPageStep, PAGE_EXPAND};

use crate::adk::agent::{Agent, LLMAgent};
use crate::adk::error::{Result, WorkflowError};
use crate::adk::model;
use crate::ragflow::tools::{ConfluenceClient, DocumentRepository, GetPageTool, SearchPagesTool};
use crate::ragflow::workflow::Workflow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const WORKFLOW_ID: &str = "handson-workflow";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HandsonInput {
    /// Question in natural language
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HandsonOutput {
    /// The assistant's answer
    pub text: String,
}

/// Compose the six-step pipeline around the given collaborators
pub fn build_handson_workflow(
    agent: Arc<dyn Agent>,
    repository: Arc<dyn DocumentRepository>,
) -> std::result::Result<Workflow, WorkflowError> {
    Workflow::builder(WORKFLOW_ID)
        .description("Answers a question from the best-matching Confluence page")
        .input_type::<HandsonInput>()
        .output_type::<HandsonOutput>()
        .then_typed(GenerateCqlStep::new(agent.clone()))
        .then_tool(Arc::new(SearchPagesTool::new(repository.clone())))
        .then_typed(SelectFirstPageStep)
        .then_tool(Arc::new(GetPageTool::new(repository)))
        .then_typed(PreparePromptStep)
        .then_typed(AssistantResponseStep::new(agent))
        .commit()
}

/// Build the pipeline with the named model and Confluence settings from the environment
pub fn build_from_env(model_name: &str) -> Result<Workflow> {
    let model = model::from_name(model_name)?;
    let agent: Arc<dyn Agent> = Arc::new(LLMAgent::assistant(model));
    let repository: Arc<dyn DocumentRepository> = Arc::new(ConfluenceClient::from_env()?);

    Ok(build_handson_workflow(agent, repository)?)
}
