//! Cached discovery with periodic refresh

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Discovery;
use crate::api::types::DiscoveredTarget;

/// Interval between two discovery runs
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Last discovered targets of one target type
///
/// A failed refresh keeps the previous targets.
#[derive(Clone)]
pub struct CachedDiscovery {
    discovery: Arc<dyn Discovery>,
    targets: Arc<RwLock<Vec<DiscoveredTarget>>>,
}

impl CachedDiscovery {
    pub fn new(discovery: Arc<dyn Discovery>) -> Self {
        Self {
            discovery,
            targets: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn discovery(&self) -> &dyn Discovery {
        self.discovery.as_ref()
    }

    pub fn target_type(&self) -> &'static str {
        self.discovery.target_type()
    }

    /// Snapshot of the cached targets
    pub fn targets(&self) -> Vec<DiscoveredTarget> {
        self.targets.read().clone()
    }

    /// Run the discovery once and replace the cached targets
    pub async fn refresh(&self) {
        let target_type = self.target_type();
        match self.discovery.discover().await {
            Ok(targets) => {
                debug!(target_type, count = targets.len(), "Discovery refreshed");
                *self.targets.write() = targets;
            }
            Err(e) => {
                warn!(target_type, error = %e, "Discovery failed, keeping previous targets");
            }
        }
    }

    /// Refresh now and then every `interval` until the task is aborted
    pub fn spawn_refresh(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                cache.refresh().await;
            }
        })
    }
}

impl std::fmt::Debug for CachedDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedDiscovery")
            .field("target_type", &self.target_type())
            .field("targets", &self.targets.read().len())
            .finish()
    }
}
