//! Target discovery
//!
//! Lists detectors and SLOs as inventory targets for the host.
//!
//! Each target type implements [`Discovery`]. The HTTP layer never calls
//! Splunk directly: it serves the last result of a [`CachedDiscovery`], which
//! a background task refreshes once a minute.
//!
//! ## Attribute excludes
//!
//! Attributes listed in the per-type exclude configuration are removed from
//! every discovered target. An entry ending with `*` removes every attribute
//! starting with the part before the `*`.

mod cache;
pub mod detector;
pub mod slo;

use async_trait::async_trait;

use crate::api::types::{
    AttributeDescription, DiscoveredTarget, DiscoveryDescription, EndpointRef, TargetDescription,
};
use crate::client::SplunkResult;

pub use cache::{CachedDiscovery, REFRESH_INTERVAL};
pub use detector::DetectorDiscovery;
pub use slo::SloDiscovery;

/// A discoverable target type
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Target type id, also the path prefix of the discovery endpoints
    fn target_type(&self) -> &'static str;

    fn describe_target(&self) -> TargetDescription;

    fn describe_attributes(&self) -> Vec<AttributeDescription>;

    /// Fetch the current targets, excludes already applied
    async fn discover(&self) -> SplunkResult<Vec<DiscoveredTarget>>;

    fn describe(&self) -> DiscoveryDescription {
        let target_type = self.target_type();
        DiscoveryDescription {
            id: target_type.to_string(),
            discover: EndpointRef::get(format!("/{target_type}/discovery/discovered-targets"))
                .with_call_interval("1m"),
        }
    }
}

/// Whether `attribute` is matched by one of the exclude entries
pub fn is_excluded(attribute: &str, excludes: &[String]) -> bool {
    excludes.iter().map(|e| e.trim()).any(|exclude| {
        match exclude.strip_suffix('*') {
            Some(prefix) => attribute.starts_with(prefix),
            None => !exclude.is_empty() && attribute == exclude,
        }
    })
}

/// Remove excluded attributes from every target
pub fn apply_attribute_excludes(
    mut targets: Vec<DiscoveredTarget>,
    excludes: &[String],
) -> Vec<DiscoveredTarget> {
    if excludes.is_empty() {
        return targets;
    }
    for target in &mut targets {
        target
            .attributes
            .retain(|attribute, _| !is_excluded(attribute, excludes));
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn target() -> DiscoveredTarget {
        DiscoveredTarget {
            id: "det1".into(),
            target_type: "com.steadybit.extension_splunk.detector".into(),
            label: "Detector".into(),
            attributes: BTreeMap::from([
                ("splunk.detector.id".to_string(), vec!["det1".to_string()]),
                ("splunk.detector.name".to_string(), vec!["Detector".to_string()]),
                ("splunk.detector.creator".to_string(), vec!["alice".to_string()]),
                ("splunk.detector.description".to_string(), vec!["d".to_string()]),
            ]),
        }
    }

    #[test]
    fn test_exact_exclude() {
        let excludes = vec!["splunk.detector.creator".to_string()];
        let targets = apply_attribute_excludes(vec![target()], &excludes);
        assert!(!targets[0].attributes.contains_key("splunk.detector.creator"));
        assert_eq!(targets[0].attributes.len(), 3);
    }

    #[test]
    fn test_prefix_exclude() {
        let excludes = vec!["splunk.detector.de*".to_string()];
        let targets = apply_attribute_excludes(vec![target()], &excludes);
        assert!(!targets[0].attributes.contains_key("splunk.detector.description"));
        assert!(targets[0].attributes.contains_key("splunk.detector.id"));
    }

    #[test]
    fn test_exclude_matching() {
        let excludes = vec![" splunk.slo.creator ".to_string(), String::new()];
        assert!(is_excluded("splunk.slo.creator", &excludes));
        assert!(!is_excluded("splunk.slo.creator.team", &excludes));
        assert!(!is_excluded("", &excludes));
    }
}
