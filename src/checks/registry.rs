//! Action registry
//!
//! Central registry of all available check actions. New checks should be
//! registered here.
//!
//! Actions are kept in registration order so that the manifest lists them
//! deterministically (detector before SLO).

use indexmap::IndexMap;
use std::sync::Arc;

use super::traits::Action;
use super::{DetectorCheck, SloCheck};
use crate::client::SplunkClient;

/// Registered actions, keyed by action id
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: IndexMap<&'static str, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the detector and SLO checks
    ///
    /// `console_url` is the web console base used for metric deep links.
    pub fn splunk(client: SplunkClient, console_url: &str) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DetectorCheck::new(client.clone(), console_url)));
        registry.register(Arc::new(SloCheck::new(client, console_url)));
        registry
    }

    pub fn register(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.id(), action);
    }

    /// Get an action by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(id).cloned()
    }

    /// All action ids in registration order
    pub fn ids(&self) -> Vec<&'static str> {
        self.actions.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Action>> {
        self.actions.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.ids())
            .finish()
    }
}
