use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single CloudWatch metric dimension, serialized in the wire casing
/// the PutMetricAlarm API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A live cloud resource selected for monitoring.
///
/// `identifier` is whatever the backing list API returned (an ARN for
/// tag-search kinds, a bare name for kinds listed through their own API).
/// `short_name` is the kind-specific normalized name used to derive alarm
/// names. Recomputed on every run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredResource {
    pub identifier: String,
    pub short_name: String,
}

/// The alarm parameters a provider produces for one (resource, metric) pair,
/// before the alarm name is derived.
///
/// `overrides` holds the per-metric parameter overrides from configuration;
/// they are merged shallowly over the base fields when the create payload is
/// assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmProps {
    pub metric_name: String,
    pub namespace: String,
    pub dimensions: Vec<Dimension>,
    pub overrides: Map<String, Value>,
}

/// One required alarm as produced by the expansion stage: the resource it
/// targets plus its alarm parameters. Input to name derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricAlarmParam {
    pub resource_name: String,
    pub props: AlarmProps,
}

/// A fully-qualified required alarm. `alarm_name` is the unique key the
/// reconciliation engine matches against the live inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSpec {
    pub alarm_name: String,
    pub description: String,
    pub props: AlarmProps,
}

/// The create/keep/delete partition computed by one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub to_create: Vec<AlarmSpec>,
    pub to_keep: Vec<AlarmSpec>,
    pub to_delete: Vec<String>,
}

impl ChangeSet {
    /// True when applying this change set would issue no backend call.
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}
