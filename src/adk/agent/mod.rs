// SPDX-License-Identifier: MIT

//! Agent module - text-in, text-out assistants backed by a model
//!
//! - `LLMAgent` - a model plus fixed system instructions

mod llm;

pub use llm::{LLMAgent, ASSISTANT_INSTRUCTION};

use crate::adk::error::Result;
use async_trait::async_trait;

/// Core agent trait
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent name
    fn name(&self) -> &str;

    /// Answer a single prompt
    async fn run(&self, input: String) -> Result<String>;
}
