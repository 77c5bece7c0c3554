//! Host protocol types
//!
//! JSON shapes exchanged with the orchestration host: the root manifest,
//! action descriptions, discovery descriptions and the request/response
//! bodies of the action lifecycle endpoints.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::checks::{CheckState, CheckVerdict};

/// Version reported in every description
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Icon shared by all Splunk targets and actions
pub const SPLUNK_ICON: &str = "data:image/svg+xml;base64,PHN2ZyB3aWR0aD0iMjQiIGhlaWdodD0iMjQiIHZpZXdCb3g9IjAgMCAyNCAyNCIgZmlsbD0ibm9uZSIgeG1sbnM9Imh0dHA6Ly93d3cudzMub3JnLzIwMDAvc3ZnIj4KPHBhdGggZD0iTTUgOS41QzUgNS42MzQgOC4xMzQgMi41IDEyIDIuNUMxNS44NjYgMi41IDE5IDUuNjM0IDE5IDkuNVYxMi41TDIwLjI3NiAxNS4wNTNDMjAuNjA5IDE1LjcxOCAyMC4xMjUgMTYuNSAxOS4zODIgMTYuNUg0LjYxOEMzLjg3NSAxNi41IDMuMzkxIDE1LjcxOCAzLjcyNCAxNS4wNTNMNSAxMi41VjkuNVoiIGZpbGw9ImN1cnJlbnRDb2xvciIvPgo8cGF0aCBkPSJNOSAxOC41SDE1QzE1IDIwLjE1NyAxMy42NTcgMjEuNSAxMiAyMS41QzEwLjM0MyAyMS41IDkgMjAuMTU3IDkgMTguNVoiIGZpbGw9ImN1cnJlbnRDb2xvciIvPgo8L3N2Zz4=";

/// Reference to an HTTP endpoint of the extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRef {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_interval: Option<String>,
}

impl EndpointRef {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".into(),
            path: path.into(),
            call_interval: None,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: "POST".into(),
            path: path.into(),
            call_interval: None,
        }
    }

    pub fn with_call_interval(mut self, interval: impl Into<String>) -> Self {
        self.call_interval = Some(interval.into());
        self
    }
}

/// Event listener registration in the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListener {
    pub method: String,
    pub path: String,
    pub listen_to: Vec<String>,
}

/// Root manifest (`GET /`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionList {
    pub actions: Vec<EndpointRef>,
    pub discoveries: Vec<EndpointRef>,
    pub target_types: Vec<EndpointRef>,
    pub target_attributes: Vec<EndpointRef>,
    pub event_listeners: Vec<EventListener>,
}

// =============================================================================
// Actions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescription {
    pub id: String,
    pub label: String,
    pub description: String,
    pub version: String,
    pub icon: String,
    pub target_selection: TargetSelection,
    pub technology: String,
    pub category: String,
    pub kind: String,
    pub time_control: String,
    pub parameters: Vec<ActionParameter>,
    pub widgets: Vec<Widget>,
    pub prepare: EndpointRef,
    pub start: EndpointRef,
    pub status: EndpointRef,
    pub stop: EndpointRef,
}

impl ActionDescription {
    /// Description of a check action with the standard lifecycle endpoints
    pub fn check(
        id: &str,
        label: &str,
        description: &str,
        target_selection: TargetSelection,
        status_interval: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            description: description.to_string(),
            version: VERSION.to_string(),
            icon: SPLUNK_ICON.to_string(),
            target_selection,
            technology: "Splunk".into(),
            category: "Splunk".into(),
            kind: "check".into(),
            time_control: "INTERNAL".into(),
            parameters: Vec::new(),
            widgets: Vec::new(),
            prepare: EndpointRef::post(format!("/{id}/prepare")),
            start: EndpointRef::post(format!("/{id}/start")),
            status: EndpointRef::post(format!("/{id}/status")).with_call_interval(status_interval),
            stop: EndpointRef::post(format!("/{id}/stop")),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<ActionParameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_widget(mut self, widget: Widget) -> Self {
        self.widgets.push(widget);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSelection {
    pub target_type: String,
    pub quantity_restriction: String,
    pub selection_templates: Vec<SelectionTemplate>,
}

impl TargetSelection {
    /// Select every target matching `<attribute>=""`
    pub fn by_attribute(target_type: &str, attribute: &str, description: &str) -> Self {
        Self {
            target_type: target_type.to_string(),
            quantity_restriction: "all".into(),
            selection_templates: vec![SelectionTemplate {
                label: "default".into(),
                description: Some(description.to_string()),
                query: format!("{attribute}=\"\""),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionTemplate {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Duration,
    Boolean,
    String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameter {
    pub name: String,
    pub label: String,
    pub description: String,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ParameterOption>,
}

impl ActionParameter {
    pub fn new(name: &str, label: &str, parameter_type: ParameterType) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            description: String::new(),
            parameter_type,
            default_value: None,
            required: false,
            order: None,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_option(mut self, label: &str, value: &str) -> Self {
        self.options.push(ParameterOption {
            label: label.to_string(),
            value: value.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterOption {
    pub label: String,
    pub value: String,
}

/// State-over-time widget fed by the metrics of the status calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    #[serde(rename = "type")]
    pub widget_type: String,
    pub title: String,
    pub identity: FieldRef,
    pub label: FieldRef,
    pub state: FieldRef,
    pub tooltip: FieldRef,
    pub url: FieldRef,
    pub value: WidgetValue,
}

impl Widget {
    pub fn state_over_time(title: &str) -> Self {
        Self {
            widget_type: "com.steadybit.widget.state_over_time".into(),
            title: title.to_string(),
            identity: FieldRef::from("splunk.metric.id"),
            label: FieldRef::from("splunk.metric.label"),
            state: FieldRef::from("state"),
            tooltip: FieldRef::from("tooltip"),
            url: FieldRef::from("url"),
            value: WidgetValue { hide: true },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRef {
    pub from: String,
}

impl From<&str> for FieldRef {
    fn from(from: &str) -> Self {
        Self {
            from: from.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetValue {
    pub hide: bool,
}

/// Target handed to `prepare`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTarget {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

/// Body of `POST /{actionId}/prepare`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequest {
    #[serde(default)]
    pub target: Option<ActionTarget>,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

/// Body of `start`, `status` and `stop`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRequest {
    pub state: CheckState,
}

/// Response of `prepare` and `start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: CheckState,
}

/// Response of `status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub verdict: CheckVerdict,
    pub state: CheckState,
}

// =============================================================================
// Discovery
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDescription {
    pub id: String,
    pub discover: EndpointRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluralLabel {
    pub one: String,
    pub other: String,
}

impl PluralLabel {
    pub fn new(one: &str, other: &str) -> Self {
        Self {
            one: one.to_string(),
            other: other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescription {
    pub id: String,
    pub version: String,
    pub icon: String,
    pub label: PluralLabel,
    pub category: String,
    pub table: Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub columns: Vec<Column>,
    pub order_by: Vec<OrderBy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub attribute: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    pub attribute: String,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDescription {
    pub attribute: String,
    pub label: PluralLabel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDescriptions {
    pub attributes: Vec<AttributeDescription>,
}

/// Inventory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredTarget {
    pub id: String,
    pub target_type: String,
    pub label: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryData {
    pub targets: Vec<DiscoveredTarget>,
}

/// Error body returned for hard failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionError {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_description_endpoints() {
        let description = ActionDescription::check(
            "com.example.check",
            "Check",
            "Checks things",
            TargetSelection::by_attribute("com.example", "example.id", "Find by id"),
            "1s",
        );
        assert_eq!(description.prepare.path, "/com.example.check/prepare");
        assert_eq!(description.status.method, "POST");
        assert_eq!(description.status.call_interval.as_deref(), Some("1s"));
        assert_eq!(
            description.target_selection.selection_templates[0].query,
            "example.id=\"\""
        );
    }

    #[test]
    fn test_parameter_serialization() {
        let parameter = ActionParameter::new("duration", "Duration", ParameterType::Duration)
            .with_default("30s")
            .required();
        let value = serde_json::to_value(&parameter).unwrap();
        assert_eq!(value["type"], "duration");
        assert_eq!(value["defaultValue"], "30s");
        assert_eq!(value["required"], true);
        assert!(value.get("options").is_none());
    }

    #[test]
    fn test_prepare_request_defaults() {
        let request: PrepareRequest = serde_json::from_str("{}").unwrap();
        assert!(request.target.is_none());
        assert!(request.config.is_empty());
    }
}
