// SPDX-License-Identifier: MIT

use crate::ragflow::tools::SearchResults;
use crate::ragflow::workflow::{RunContext, StepError, TypedStep};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Body expansion requested for the selected page
pub const PAGE_EXPAND: &str = "body.storage";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageRequest {
    /// ID of the page to fetch
    pub page_id: String,
    pub expand: String,
}

/// `select-first-page`: the top hit, or a fatal stop when there is none
pub struct SelectFirstPageStep;

#[async_trait]
impl TypedStep for SelectFirstPageStep {
    type Input = SearchResults;
    type Output = PageRequest;

    fn id(&self) -> &str {
        "select-first-page"
    }

    fn description(&self) -> &str {
        "Picks the first search hit"
    }

    async fn run(&self, input: SearchResults, _ctx: &RunContext) -> Result<PageRequest, StepError> {
        if let Some(error) = input.error {
            return Err(StepError::failed(format!("Search error: {}", error)));
        }

        let first = input
            .pages
            .into_iter()
            .next()
            .ok_or_else(|| StepError::failed("No search results were found."))?;

        log::info!("Selected page {} ({})", first.id, first.title);
        Ok(PageRequest {
            page_id: first.id,
            expand: PAGE_EXPAND.to_string(),
        })
    }
}
