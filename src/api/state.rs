//! API State management
//!
//! Shared state of the extension HTTP API: registered actions, cached
//! discoveries, the event forwarder and the readiness flag.

use indexmap::IndexMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::types::{EndpointRef, EventListener, ExtensionList};
use crate::checks::{Action, ActionRegistry};
use crate::discovery::CachedDiscovery;
use crate::events::{EventForwarder, EventKind};

#[derive(Debug)]
struct Inner {
    actions: ActionRegistry,
    discoveries: IndexMap<&'static str, CachedDiscovery>,
    forwarder: EventForwarder,
    ready: AtomicBool,
}

/// Shared API state
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    /// Create new API state; not ready until [`AppState::set_ready`]
    pub fn new(
        actions: ActionRegistry,
        discoveries: Vec<CachedDiscovery>,
        forwarder: EventForwarder,
    ) -> Self {
        let discoveries = discoveries
            .into_iter()
            .map(|d| (d.target_type(), d))
            .collect();
        Self {
            inner: Arc::new(Inner {
                actions,
                discoveries,
                forwarder,
                ready: AtomicBool::new(false),
            }),
        }
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.inner.actions
    }

    pub fn action(&self, id: &str) -> Option<Arc<dyn Action>> {
        self.inner.actions.get(id)
    }

    pub fn discovery(&self, target_type: &str) -> Option<&CachedDiscovery> {
        self.inner.discoveries.get(target_type)
    }

    pub fn discoveries(&self) -> impl Iterator<Item = &CachedDiscovery> {
        self.inner.discoveries.values()
    }

    pub fn forwarder(&self) -> &EventForwarder {
        &self.inner.forwarder
    }

    pub fn set_ready(&self, ready: bool) {
        self.inner.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Root manifest listing every endpoint the host should load
    pub fn extension_list(&self) -> ExtensionList {
        let actions = self
            .inner
            .actions
            .ids()
            .into_iter()
            .map(|id| EndpointRef::get(format!("/{id}")))
            .collect();

        let mut list = ExtensionList {
            actions,
            ..Default::default()
        };
        for target_type in self.inner.discoveries.keys() {
            list.discoveries
                .push(EndpointRef::get(format!("/{target_type}/discovery")));
            list.target_types.push(EndpointRef::get(format!(
                "/{target_type}/discovery/target-description"
            )));
            list.target_attributes.push(EndpointRef::get(format!(
                "/{target_type}/discovery/attribute-descriptions"
            )));
        }
        list.event_listeners = EventKind::ALL
            .iter()
            .map(|kind| EventListener {
                method: "POST".into(),
                path: kind.path().to_string(),
                listen_to: kind.listen_to().iter().map(|s| s.to_string()).collect(),
            })
            .collect();
        list
    }
}
