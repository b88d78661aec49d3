use crate::adk::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A named operation over JSON values, described by JSON Schema.
///
/// Tools run inside workflows through `ToolStep`, which turns `schema()` and
/// `output_schema()` into the step's contracts. Schemas are usually held in
/// `Lazy` statics and handed out by reference.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique within a workflow; doubles as the step id
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Input schema (an `object` with `properties`)
    fn schema(&self) -> &Value;

    /// Output schema; `None` leaves the output unconstrained
    fn output_schema(&self) -> Option<&Value> {
        None
    }

    /// `Err` is fatal to the surrounding run; recoverable failures belong in the output
    async fn execute(&self, input: Value) -> Result<Value>;
}
