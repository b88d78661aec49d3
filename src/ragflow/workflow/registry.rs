// SPDX-License-Identifier: MIT

use super::engine::Workflow;
use crate::adk::error::WorkflowError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Committed workflows, looked up by id
#[derive(Clone)]
pub struct WorkflowRegistry {
    workflows: Arc<RwLock<HashMap<String, Arc<Workflow>>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, workflow: Arc<Workflow>) {
        let mut workflows = self.workflows.write().await;
        workflows.insert(workflow.id().to_string(), workflow);
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Workflow>> {
        let workflows = self.workflows.read().await;
        workflows.get(id).cloned()
    }

    /// Like `get`, but a missing workflow is an error
    pub async fn require(&self, id: &str) -> Result<Arc<Workflow>, WorkflowError> {
        self.get(id)
            .await
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }

    /// All registered workflows, sorted by id
    pub async fn list(&self) -> Vec<Arc<Workflow>> {
        let workflows = self.workflows.read().await;
        let mut all: Vec<Arc<Workflow>> = workflows.values().cloned().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ragflow::workflow::context::RunContext;
    use crate::ragflow::workflow::schema::SchemaContract;
    use crate::ragflow::workflow::step::{Step, StepError};
    use async_trait::async_trait;
    use serde_json::Value;

    /// A step that passes its input through
    struct PassThrough {
        schema: SchemaContract,
    }

    #[async_trait]
    impl Step for PassThrough {
        fn id(&self) -> &str {
            "pass"
        }

        fn input_schema(&self) -> &SchemaContract {
            &self.schema
        }

        fn output_schema(&self) -> &SchemaContract {
            &self.schema
        }

        async fn execute(&self, input: Value, _ctx: &RunContext) -> Result<Value, StepError> {
            Ok(input)
        }
    }

    fn workflow(id: &str) -> Arc<Workflow> {
        Arc::new(
            Workflow::builder(id)
                .then(Arc::new(PassThrough {
                    schema: SchemaContract::new(),
                }))
                .commit()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_register_and_get_workflow() {
        let registry = WorkflowRegistry::new();
        registry.register(workflow("handson-workflow")).await;

        let retrieved = registry.get("handson-workflow").await;
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().id(), "handson-workflow");
    }

    #[tokio::test]
    async fn test_require_missing_workflow() {
        let registry = WorkflowRegistry::new();
        let err = registry.require("nonexistent").await.err().unwrap();
        assert!(matches!(err, WorkflowError::NotFound(ref id) if id == "nonexistent"));
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let registry = WorkflowRegistry::new();
        registry.register(workflow("b")).await;
        registry.register(workflow("a")).await;

        let ids: Vec<String> = registry
            .list()
            .await
            .iter()
            .map(|w| w.id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_registry_is_clone() {
        let registry = WorkflowRegistry::new();
        let cloned = registry.clone();

        // Registering on clone should be visible to original
        cloned.register(workflow("shared")).await;
        assert!(registry.get("shared").await.is_some());
    }
}
