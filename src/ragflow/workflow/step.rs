// SPDX-License-Identifier: MIT

//! Steps - the units a workflow chains together
//!
//! - `Step` works on JSON values and declares its contracts directly
//! - `TypedStep` works on Rust records; `Typed` derives its contracts
//! - `ToolStep` runs an `adk::tool::Tool` as a step

use crate::adk::error::WorkflowError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::context::RunContext;
use super::schema::SchemaContract;

/// Ways a step can stop a run
#[derive(Debug, Error)]
pub enum StepError {
    /// Workflow-fatal: nothing meaningful can follow this step
    #[error("{0}")]
    Failed(String),

    /// Conversion between JSON and the step's records failed
    #[error(transparent)]
    Payload(#[from] serde_json::Error),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Core trait for workflow steps
#[async_trait]
pub trait Step: Send + Sync {
    /// Returns the step id (unique within a workflow)
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn input_schema(&self) -> &SchemaContract;

    fn output_schema(&self) -> &SchemaContract;

    /// Run the step. `input` already satisfies `input_schema`.
    ///
    /// Domain failures that a later step can handle belong in the returned
    /// value; `Err` aborts the whole run.
    async fn execute(&self, input: Value, ctx: &RunContext) -> Result<Value, StepError>;
}

/// A step whose boundaries are Rust records
#[async_trait]
pub trait TypedStep: Send + Sync {
    type Input: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + JsonSchema + Send;

    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn run(&self, input: Self::Input, ctx: &RunContext) -> Result<Self::Output, StepError>;
}

/// Adapts a `TypedStep` to `Step`, deriving contracts from its records
pub struct Typed<S> {
    inner: S,
    input_schema: SchemaContract,
    output_schema: SchemaContract,
}

impl<S: TypedStep> Typed<S> {
    pub fn new(inner: S) -> Result<Self, WorkflowError> {
        let invalid = |message: String| WorkflowError::InvalidSchema {
            owner: inner.id().to_string(),
            message,
        };
        let input_schema = SchemaContract::for_type::<S::Input>().map_err(invalid)?;
        let output_schema = SchemaContract::for_type::<S::Output>().map_err(invalid)?;

        Ok(Self {
            inner,
            input_schema,
            output_schema,
        })
    }
}

#[async_trait]
impl<S: TypedStep + 'static> Step for Typed<S> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> &SchemaContract {
        &self.input_schema
    }

    fn output_schema(&self) -> &SchemaContract {
        &self.output_schema
    }

    async fn execute(&self, input: Value, ctx: &RunContext) -> Result<Value, StepError> {
        let input: S::Input = serde_json::from_value(input)?;
        let output = self.inner.run(input, ctx).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Runs a tool as a step; its JSON schemas become the step's contracts
pub struct ToolStep {
    tool: Arc<dyn Tool>,
    input_schema: SchemaContract,
    output_schema: SchemaContract,
}

impl ToolStep {
    pub fn new(tool: Arc<dyn Tool>) -> Result<Self, WorkflowError> {
        let owner = tool.name().to_string();
        let invalid = |message: String| WorkflowError::InvalidSchema {
            owner: owner.clone(),
            message,
        };

        let input_schema = SchemaContract::from_json_schema(tool.schema()).map_err(invalid)?;
        let output_schema = match tool.output_schema() {
            Some(schema) => SchemaContract::from_json_schema(schema).map_err(invalid)?,
            None => SchemaContract::new(),
        };

        Ok(Self {
            tool,
            input_schema,
            output_schema,
        })
    }
}

#[async_trait]
impl Step for ToolStep {
    fn id(&self) -> &str {
        self.tool.name()
    }

    fn description(&self) -> &str {
        self.tool.description()
    }

    fn input_schema(&self) -> &SchemaContract {
        &self.input_schema
    }

    fn output_schema(&self) -> &SchemaContract {
        &self.output_schema
    }

    async fn execute(&self, input: Value, _ctx: &RunContext) -> Result<Value, StepError> {
        self.tool
            .execute(input)
            .await
            .map_err(|e| StepError::Failed(e.to_string()))
    }
}
