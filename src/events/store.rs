//! Step execution store
//!
//! Target events only carry the id of their step. The store remembers every
//! started step so that target events can be matched with the step's action
//! kind, and forgets all steps of an execution once it completes.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::types::StepExecution;

/// Concurrency-safe map from step execution id to step
#[derive(Debug, Clone, Default)]
pub struct StepExecutionStore {
    inner: Arc<RwLock<HashMap<Uuid, StepExecution>>>,
}

impl StepExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a step, replacing an earlier one with the same id
    pub fn insert(&self, step: StepExecution) {
        self.inner.write().insert(step.id, step);
    }

    pub fn get(&self, id: &Uuid) -> Option<StepExecution> {
        self.inner.read().get(id).cloned()
    }

    /// Remove all steps of an execution, returning how many were removed
    pub fn remove_execution(&self, execution_id: f64) -> usize {
        let mut steps = self.inner.write();
        let before = steps.len();
        steps.retain(|_, step| step.execution_id != execution_id);
        before - steps.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
