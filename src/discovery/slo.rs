//! SLO discovery

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

use super::{Discovery, apply_attribute_excludes};
use crate::api::types::{
    AttributeDescription, Column, DiscoveredTarget, OrderBy, PluralLabel, SPLUNK_ICON, Table,
    TargetDescription, VERSION,
};
use crate::client::{Slo, SplunkClient, SplunkResult};

pub const TARGET_TYPE: &str = "com.steadybit.extension_splunk.slo";

pub const ID: &str = "splunk.slo.id";
pub const NAME: &str = "splunk.slo.name";
pub const INDICATOR: &str = "splunk.slo.indicator";
pub const CREATOR: &str = "splunk.slo.creator";

pub fn to_target(slo: &Slo) -> DiscoveredTarget {
    let mut attributes = BTreeMap::from([
        (ID.to_string(), vec![slo.id.clone()]),
        (NAME.to_string(), vec![slo.name.clone()]),
    ]);
    if let Some(indicator) = &slo.indicator {
        attributes.insert(INDICATOR.to_string(), vec![indicator.clone()]);
    }
    if let Some(creator) = &slo.creator {
        attributes.insert(CREATOR.to_string(), vec![creator.clone()]);
    }

    DiscoveredTarget {
        id: slo.id.clone(),
        target_type: TARGET_TYPE.to_string(),
        label: slo.name.clone(),
        attributes,
    }
}

/// Discovers all SLOs of the organization
pub struct SloDiscovery {
    client: SplunkClient,
    excludes: Vec<String>,
}

impl SloDiscovery {
    pub fn new(client: SplunkClient, excludes: Vec<String>) -> Self {
        Self { client, excludes }
    }
}

#[async_trait]
impl Discovery for SloDiscovery {
    fn target_type(&self) -> &'static str {
        TARGET_TYPE
    }

    fn describe_target(&self) -> TargetDescription {
        TargetDescription {
            id: TARGET_TYPE.to_string(),
            version: VERSION.to_string(),
            icon: SPLUNK_ICON.to_string(),
            label: PluralLabel::new("Splunk SLO", "Splunk SLOs"),
            category: "monitoring".into(),
            table: Table {
                columns: vec![
                    Column {
                        attribute: NAME.to_string(),
                    },
                    Column {
                        attribute: INDICATOR.to_string(),
                    },
                ],
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
            (INDICATOR, "Indicator", "Indicators"),
            (CREATOR, "Creator", "Creators"),
        ]
        .into_iter()
        .map(|(attribute, one, other)| AttributeDescription {
            attribute: attribute.to_string(),
            label: PluralLabel::new(one, other),
        })
        .collect()
    }

    async fn discover(&self) -> SplunkResult<Vec<DiscoveredTarget>> {
        let slos = self.client.list_slos().await?;
        debug!(count = slos.results.len(), "SLOs discovered");
        let targets = slos.results.iter().map(to_target).collect();
        Ok(apply_attribute_excludes(targets, &self.excludes))
    }
}
