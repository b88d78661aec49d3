// SPDX-License-Identifier: MIT

use super::HandsonInput;
use crate::adk::agent::Agent;
use crate::ragflow::workflow::{RunContext, StepError, TypedStep};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CqlQuery {
    /// CQL search query
    pub cql: String,
}

/// Translation instructions sent to the assistant
pub fn cql_prompt(query: &str) -> String {
    format!(
        r#"Convert the following natural-language search request into Confluence CQL (Confluence Query Language).
Basic CQL syntax:
- text ~ "term": full-text search
- title ~ "title": title search
- space = "SPACEKEY": search within one space
- type = page: pages only
- created >= "2024-01-01": date filter

Search request: {query}

Important:
- For a simple word search, use the form text ~ "word"
- Join multiple terms with AND
- Japanese search terms can be used as they are
- Reply with the CQL query only

CQL query:"#
    )
}

/// Full-text clause over the raw request, used when translation fails.
/// The request text is embedded unchanged.
pub fn fallback_cql(query: &str) -> String {
    format!("text ~ \"{}\"", query)
}

/// `generate-cql-query`: natural language to CQL via the assistant
pub struct GenerateCqlStep {
    agent: Arc<dyn Agent>,
}

impl GenerateCqlStep {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl TypedStep for GenerateCqlStep {
    type Input = HandsonInput;
    type Output = CqlQuery;

    fn id(&self) -> &str {
        "generate-cql-query"
    }

    fn description(&self) -> &str {
        "Translates the question into a Confluence CQL query"
    }

    async fn run(&self, input: HandsonInput, _ctx: &RunContext) -> Result<CqlQuery, StepError> {
        let cql = match self.agent.run(cql_prompt(&input.query)).await {
            Ok(reply) => reply.trim().to_string(),
            Err(e) => {
                let cql = fallback_cql(&input.query);
                log::warn!("CQL generation failed ({}), falling back to {}", e, cql);
                cql
            }
        };

        log::info!("Generated CQL: {}", cql);
        Ok(CqlQuery { cql })
    }
}
