// SPDX-License-Identifier: MIT

//! Per-invocation run state

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

/// State owned by a single workflow invocation
///
/// The initial input is written once when the run starts; the current output
/// is replaced after every step. Steps only ever see a shared reference.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    workflow_id: String,
    started_at: DateTime<Utc>,
    initial_input: Value,
    current_output: Value,
}

impl RunContext {
    pub fn new(workflow_id: impl Into<String>, initial_input: Value) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            workflow_id: workflow_id.into(),
            started_at: Utc::now(),
            current_output: initial_input.clone(),
            initial_input,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The value the workflow was invoked with
    pub fn initial_input(&self) -> &Value {
        &self.initial_input
    }

    /// The initial input decoded into a typed record
    pub fn init_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.initial_input)
    }

    /// Output of the last completed step, or the initial input before any step ran
    pub fn current_output(&self) -> &Value {
        &self.current_output
    }

    pub(crate) fn advance(&mut self, output: Value) {
        self.current_output = output;
    }

    pub(crate) fn into_output(self) -> Value {
        self.current_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Question {
        query: String,
    }

    #[test]
    fn test_initial_input_is_kept() {
        let mut ctx = RunContext::new("wf", json!({"query": "AI"}));
        assert_eq!(ctx.current_output(), &json!({"query": "AI"}));

        ctx.advance(json!({"cql": "text ~ \"AI\""}));
        ctx.advance(json!({"text": "answer"}));

        assert_eq!(ctx.initial_input(), &json!({"query": "AI"}));
        assert_eq!(ctx.current_output(), &json!({"text": "answer"}));
        assert_eq!(ctx.workflow_id(), "wf");
    }

    #[test]
    fn test_init_data_typed() {
        let ctx = RunContext::new("wf", json!({"query": "AIについての情報"}));
        let question: Question = ctx.init_data().unwrap();
        assert_eq!(question.query, "AIについての情報");
    }

    #[test]
    fn test_each_context_has_its_own_run_id() {
        let a = RunContext::new("wf", json!({}));
        let b = RunContext::new("wf", json!({}));
        assert_ne!(a.run_id(), b.run_id());
    }
}
