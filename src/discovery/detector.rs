//! Detector discovery

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

use super::{Discovery, apply_attribute_excludes};
use crate::api::types::{
    AttributeDescription, Column, DiscoveredTarget, OrderBy, PluralLabel, SPLUNK_ICON, Table,
    TargetDescription, VERSION,
};
use crate::client::{Detector, SplunkClient, SplunkResult};

pub const TARGET_TYPE: &str = "com.steadybit.extension_splunk.detector";

pub const ID: &str = "splunk.detector.id";
pub const NAME: &str = "splunk.detector.name";
pub const DESCRIPTION: &str = "splunk.detector.description";
pub const STATUS: &str = "splunk.detector.status";
pub const CREATOR: &str = "splunk.detector.creator";
pub const ORIGIN: &str = "splunk.detector.detectorOrigin";

/// Map a detector to an inventory target
///
/// Optional fields the API left out are omitted from the attributes.
pub fn to_target(detector: &Detector) -> DiscoveredTarget {
    let mut attributes = BTreeMap::from([
        (ID.to_string(), vec![detector.id.clone()]),
        (NAME.to_string(), vec![detector.name.clone()]),
    ]);
    for (key, value) in [
        (DESCRIPTION, &detector.description),
        (STATUS, &detector.status),
        (CREATOR, &detector.creator),
        (ORIGIN, &detector.detector_origin),
    ] {
        if let Some(value) = value {
            attributes.insert(key.to_string(), vec![value.clone()]);
        }
    }

    DiscoveredTarget {
        id: detector.id.clone(),
        target_type: TARGET_TYPE.to_string(),
        label: detector.name.clone(),
        attributes,
    }
}

/// Discovers all detectors of the organization
pub struct DetectorDiscovery {
    client: SplunkClient,
    excludes: Vec<String>,
}

impl DetectorDiscovery {
    pub fn new(client: SplunkClient, excludes: Vec<String>) -> Self {
        Self { client, excludes }
    }
}

#[async_trait]
impl Discovery for DetectorDiscovery {
    fn target_type(&self) -> &'static str {
        TARGET_TYPE
    }

    fn describe_target(&self) -> TargetDescription {
        TargetDescription {
            id: TARGET_TYPE.to_string(),
            version: VERSION.to_string(),
            icon: SPLUNK_ICON.to_string(),
            label: PluralLabel::new("Splunk detector", "Splunk detectors"),
            category: "monitoring".into(),
            table: Table {
                columns: [ID, NAME, DESCRIPTION, STATUS, CREATOR, ORIGIN]
                    .into_iter()
                    .map(|attribute| Column {
                        attribute: attribute.to_string(),
                    })
                    .collect(),
                order_by: vec![OrderBy {
                    attribute: NAME.to_string(),
                    direction: "ASC".into(),
                }],
            },
        }
    }

    fn describe_attributes(&self) -> Vec<AttributeDescription> {
        [
            (ID, "ID", "IDs"),
            (NAME, "name", "names"),
            (DESCRIPTION, "Description", "Descriptions"),
            (STATUS, "Status", "Status"),
            (CREATOR, "Creator", "Creators"),
            (ORIGIN, "Detector origin", "Detector origins"),
        ]
        .into_iter()
        .map(|(attribute, one, other)| AttributeDescription {
            attribute: attribute.to_string(),
            label: PluralLabel::new(one, other),
        })
        .collect()
    }

    async fn discover(&self) -> SplunkResult<Vec<DiscoveredTarget>> {
        let detectors = self.client.detectors().await?;
        debug!(count = detectors.results.len(), "Detectors discovered");
        let targets = detectors.results.iter().map(to_target).collect();
        Ok(apply_attribute_excludes(targets, &self.excludes))
    }
}
