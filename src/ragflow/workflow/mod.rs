// SPDX-License-Identifier: MIT

//! Sequential typed workflow engine
//!
//! This module provides:
//! - `SchemaContract` - the shape of values crossing step boundaries
//! - `Step` / `TypedStep` / `ToolStep` - units of work
//! - `Workflow` - an ordered chain of steps, validated at every boundary
//! - `RunContext` - per-run state shared (read-only) with every step
//! - `WorkflowRegistry` - named workflows available to the CLI and server

pub mod context;
pub mod engine;
pub mod registry;
pub mod schema;
pub mod step;

pub use context::RunContext;
pub use engine::{RunOutcome, Workflow, WorkflowBuilder, WorkflowDescription, WorkflowEvent};
pub use registry::WorkflowRegistry;
pub use schema::{FieldDef, FieldType, SchemaContract, ValidationError, Violation};
pub use step::{Step, StepError, ToolStep, Typed, TypedStep};
