// SPDX-License-Identifier: MIT

//! Sequential workflow executor
//!
//! A `Workflow` is built once with `WorkflowBuilder::commit` and can then be
//! run any number of times. Each run gets its own `RunContext`; the workflow
//! itself holds no run state, so concurrent runs need no coordination.

use crate::adk::error::{FailureKind, WorkflowError};
use crate::adk::tool::Tool;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::context::RunContext;
use super::schema::SchemaContract;
use super::step::{Step, StepError, ToolStep, Typed, TypedStep};

/// Progress notifications emitted by `Workflow::run_stream`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    RunStarted {
        run_id: Uuid,
        workflow: String,
        started_at: DateTime<Utc>,
    },
    StepStarted {
        step: String,
    },
    StepCompleted {
        step: String,
        output: Value,
        elapsed_ms: u64,
    },
    StepFailed {
        step: String,
        error: String,
    },
    RunCompleted {
        output: Value,
    },
    RunFailed {
        error: String,
        kind: FailureKind,
    },
}

/// Serializable summary of a workflow and its contracts
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDescription {
    pub id: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub steps: Vec<StepDescription>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepDescription {
    pub id: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

impl WorkflowDescription {
    /// Render as YAML, the format the CLI prints
    pub fn to_yaml(&self) -> crate::adk::error::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// A finished run: its id and the final output
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub output: Value,
}

/// An ordered chain of steps with overall input and output contracts
pub struct Workflow {
    id: String,
    description: String,
    input_schema: SchemaContract,
    output_schema: SchemaContract,
    steps: Vec<Arc<dyn Step>>,
}

impl Workflow {
    pub fn builder(id: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &SchemaContract {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &SchemaContract {
        &self.output_schema
    }

    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    pub fn describe(&self) -> WorkflowDescription {
        WorkflowDescription {
            id: self.id.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.to_json_schema(),
            output_schema: self.output_schema.to_json_schema(),
            steps: self
                .steps
                .iter()
                .map(|step| StepDescription {
                    id: step.id().to_string(),
                    description: step.description().to_string(),
                    input_schema: step.input_schema().to_json_schema(),
                    output_schema: step.output_schema().to_json_schema(),
                })
                .collect(),
        }
    }

    /// Run the workflow and return the last step's output
    pub async fn run(&self, input: Value) -> Result<Value, WorkflowError> {
        Ok(self.execute(input, None).await?.output)
    }

    /// Like `run`, but also returns the run id
    pub async fn run_tracked(&self, input: Value) -> Result<RunOutcome, WorkflowError> {
        self.execute(input, None).await
    }

    /// Run the workflow, reporting progress on `tx`
    pub async fn run_stream(
        &self,
        input: Value,
        tx: mpsc::Sender<WorkflowEvent>,
    ) -> Result<Value, WorkflowError> {
        Ok(self.execute(input, Some(&tx)).await?.output)
    }

    /// Run with typed input and output records
    pub async fn invoke<I, O>(&self, input: &I) -> Result<O, WorkflowError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let payload = |source| WorkflowError::Payload {
            owner: self.id.clone(),
            source,
        };
        let input = serde_json::to_value(input).map_err(payload)?;
        let output = self.run(input).await?;
        serde_json::from_value(output).map_err(payload)
    }

    async fn execute(
        &self,
        input: Value,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> Result<RunOutcome, WorkflowError> {
        let result = self.execute_steps(input, events).await;

        match &result {
            Ok(outcome) => {
                emit(
                    events,
                    WorkflowEvent::RunCompleted {
                        output: outcome.output.clone(),
                    },
                )
                .await
            }
            Err(e) => {
                log::error!("Workflow {} failed: {}", self.id, e);
                emit(
                    events,
                    WorkflowEvent::RunFailed {
                        error: e.to_string(),
                        kind: e.kind(),
                    },
                )
                .await
            }
        }

        result
    }

    async fn execute_steps(
        &self,
        input: Value,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> Result<RunOutcome, WorkflowError> {
        self.input_schema
            .validate(&input)
            .map_err(|source| WorkflowError::InvalidInput {
                workflow: self.id.clone(),
                source,
            })?;

        let mut ctx = RunContext::new(&self.id, input);
        log::info!("Workflow {} run {} started", self.id, ctx.run_id());
        emit(
            events,
            WorkflowEvent::RunStarted {
                run_id: ctx.run_id(),
                workflow: self.id.clone(),
                started_at: ctx.started_at(),
            },
        )
        .await;

        for (i, step) in self.steps.iter().enumerate() {
            log::info!(
                "Executing step {}/{}: {}",
                i + 1,
                self.steps.len(),
                step.id()
            );
            emit(
                events,
                WorkflowEvent::StepStarted {
                    step: step.id().to_string(),
                },
            )
            .await;

            let started = Instant::now();
            match self.run_step(step.as_ref(), &ctx).await {
                Ok(output) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    log::info!("Step {} completed in {}ms", step.id(), elapsed_ms);
                    if let Some(error) = output.get("error").filter(|e| !e.is_null()) {
                        log::warn!("Step {} reported a degraded result: {}", step.id(), error);
                    }

                    emit(
                        events,
                        WorkflowEvent::StepCompleted {
                            step: step.id().to_string(),
                            output: output.clone(),
                            elapsed_ms,
                        },
                    )
                    .await;
                    ctx.advance(output);
                }
                Err(e) => {
                    log::error!("Step {} failed: {}", step.id(), e);
                    emit(
                        events,
                        WorkflowEvent::StepFailed {
                            step: step.id().to_string(),
                            error: e.to_string(),
                        },
                    )
                    .await;
                    return Err(e);
                }
            }
        }

        let run_id = ctx.run_id();
        let started_at = ctx.started_at();
        let output = ctx.into_output();
        self.output_schema
            .validate(&output)
            .map_err(|source| WorkflowError::InvalidOutput {
                workflow: self.id.clone(),
                source,
            })?;

        log::info!(
            "Workflow {} run {} finished in {}ms",
            self.id,
            run_id,
            (Utc::now() - started_at).num_milliseconds()
        );
        Ok(RunOutcome { run_id, output })
    }

    /// Validate, execute and re-validate a single step
    async fn run_step(&self, step: &dyn Step, ctx: &RunContext) -> Result<Value, WorkflowError> {
        let step_id = step.id().to_string();

        step.input_schema()
            .validate(ctx.current_output())
            .map_err(|source| WorkflowError::StepInputMismatch {
                step: step_id.clone(),
                source,
            })?;

        let output = step
            .execute(ctx.current_output().clone(), ctx)
            .await
            .map_err(|e| match e {
                StepError::Failed(message) => WorkflowError::step_failed(&step_id, message),
                StepError::Payload(source) => WorkflowError::Payload {
                    owner: step_id.clone(),
                    source,
                },
            })?;

        step.output_schema()
            .validate(&output)
            .map_err(|source| WorkflowError::StepOutputMismatch {
                step: step_id,
                source,
            })?;

        Ok(output)
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("id", &self.id)
            .field(
                "steps",
                &self.steps.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

async fn emit(events: Option<&mpsc::Sender<WorkflowEvent>>, event: WorkflowEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening any more
        let _ = tx.send(event).await;
    }
}

/// Builder for `Workflow`; contract problems surface from `commit`
pub struct WorkflowBuilder {
    id: String,
    description: String,
    input_schema: SchemaContract,
    output_schema: SchemaContract,
    steps: Vec<Arc<dyn Step>>,
    error: Option<WorkflowError>,
}

impl WorkflowBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            input_schema: SchemaContract::new(),
            output_schema: SchemaContract::new(),
            steps: Vec::new(),
            error: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn input_schema(mut self, schema: SchemaContract) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn output_schema(mut self, schema: SchemaContract) -> Self {
        self.output_schema = schema;
        self
    }

    /// Use the JSON Schema of `T` as the input contract
    pub fn input_type<T: JsonSchema>(mut self) -> Self {
        match SchemaContract::for_type::<T>() {
            Ok(schema) => self.input_schema = schema,
            Err(message) => self.record(WorkflowError::InvalidSchema {
                owner: self.id.clone(),
                message,
            }),
        }
        self
    }

    /// Use the JSON Schema of `T` as the output contract
    pub fn output_type<T: JsonSchema>(mut self) -> Self {
        match SchemaContract::for_type::<T>() {
            Ok(schema) => self.output_schema = schema,
            Err(message) => self.record(WorkflowError::InvalidSchema {
                owner: self.id.clone(),
                message,
            }),
        }
        self
    }

    pub fn then(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn then_typed<S: TypedStep + 'static>(mut self, step: S) -> Self {
        match Typed::new(step) {
            Ok(step) => self.steps.push(Arc::new(step)),
            Err(e) => self.record(e),
        }
        self
    }

    pub fn then_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        match ToolStep::new(tool) {
            Ok(step) => self.steps.push(Arc::new(step)),
            Err(e) => self.record(e),
        }
        self
    }

    fn record(&mut self, error: WorkflowError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Check the chain and freeze it into a runnable `Workflow`
    pub fn commit(self) -> Result<Workflow, WorkflowError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.steps.is_empty() {
            return Err(WorkflowError::Empty(self.id));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id()) {
                return Err(WorkflowError::DuplicateStep(step.id().to_string()));
            }
        }

        let input_label = format!("{} input", self.id);
        let mut producer: (&str, &SchemaContract) = (&input_label, &self.input_schema);
        for step in &self.steps {
            step.input_schema()
                .check_compatible(producer.1)
                .map_err(|reason| WorkflowError::IncompatibleSteps {
                    producer: producer.0.to_string(),
                    consumer: step.id().to_string(),
                    reason,
                })?;
            producer = (step.id(), step.output_schema());
        }
        self.output_schema
            .check_compatible(producer.1)
            .map_err(|reason| WorkflowError::IncompatibleSteps {
                producer: producer.0.to_string(),
                consumer: format!("{} output", self.id),
                reason,
            })?;

        log::info!(
            "Committed workflow '{}' with {} steps",
            self.id,
            self.steps.len()
        );

        Ok(Workflow {
            id: self.id,
            description: self.description,
            input_schema: self.input_schema,
            output_schema: self.output_schema,
            steps: self.steps,
        })
    }
}
