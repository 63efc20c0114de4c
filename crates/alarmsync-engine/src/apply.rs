use std::sync::Arc;
use std::time::Duration;

use alarmsync_common::config::GlobalAlarmConfig;
use alarmsync_common::types::{AlarmSpec, ChangeSet};
use anyhow::Context;
use serde_json::{Map, Value};

use crate::AlarmBackend;

/// The backend's documented maximum for one batch-delete call.
pub const DELETE_BATCH_SIZE: usize = 100;

/// Executes a computed change set against the alerting backend.
///
/// Calls are issued strictly sequentially with an optional delay after each
/// one; this is deliberate backpressure against backend rate limits, not a
/// throughput concern. There is no retry here: the first failed call aborts
/// the remaining sequence and the whole reconciliation can be re-run safely.
pub struct ApplyExecutor {
    backend: Arc<dyn AlarmBackend>,
    interval: Duration,
    base_params: Map<String, Value>,
}

impl ApplyExecutor {
    /// Build the executor and its immutable base-parameter template: the
    /// configured default alarm parameters plus the notification action
    /// lists and the uniform tag set. Built once per run, never mutated.
    pub fn new(
        backend: Arc<dyn AlarmBackend>,
        alarm_config: &GlobalAlarmConfig,
        interval_millis: u64,
        extra_actions: &[String],
    ) -> Self {
        let mut base_params = alarm_config.default_alarm_params.clone();

        let mut actions = alarm_config.alarm_actions.clone();
        actions.extend(extra_actions.iter().cloned());
        let actions = Value::from(actions);
        base_params.insert("AlarmActions".to_string(), actions.clone());
        base_params.insert("OKActions".to_string(), actions.clone());
        base_params.insert("InsufficientDataActions".to_string(), actions);

        if !alarm_config.alarm_tagging.is_empty() {
            let tags: Vec<Value> = alarm_config
                .alarm_tagging
                .iter()
                .map(|(key, value)| serde_json::json!({ "Key": key, "Value": value }))
                .collect();
            base_params.insert("Tags".to_string(), Value::from(tags));
        }

        Self {
            backend,
            interval: Duration::from_millis(interval_millis),
            base_params,
        }
    }

    /// Issue all creates, then all deletes. Aborts on the first failed call.
    pub async fn apply(&self, change_set: &ChangeSet) -> anyhow::Result<()> {
        self.create_alarms(&change_set.to_create).await?;
        self.delete_alarms(&change_set.to_delete).await?;
        tracing::info!(
            created = change_set.to_create.len(),
            deleted = change_set.to_delete.len(),
            "Change set applied"
        );
        Ok(())
    }

    async fn create_alarms(&self, specs: &[AlarmSpec]) -> anyhow::Result<()> {
        for spec in specs {
            let payload = self.alarm_payload(spec);
            tracing::debug!(alarm = %spec.alarm_name, "Creating alarm");
            self.backend
                .put_metric_alarm(&payload)
                .await
                .with_context(|| format!("Failed to create alarm `{}`", spec.alarm_name))?;
            self.pause().await;
        }
        Ok(())
    }

    async fn delete_alarms(&self, alarm_names: &[String]) -> anyhow::Result<()> {
        for chunk in alarm_names.chunks(DELETE_BATCH_SIZE) {
            tracing::debug!(count = chunk.len(), "Deleting alarm batch");
            self.backend
                .delete_alarms(chunk)
                .await
                .with_context(|| format!("Failed to delete alarm batch starting at `{}`", chunk[0]))?;
            self.pause().await;
        }
        Ok(())
    }

    /// Merge the base template with one spec. Spec fields win per key, the
    /// per-metric overrides win over those, and the derived name/description
    /// are set last so nothing can override the unique key.
    fn alarm_payload(&self, spec: &AlarmSpec) -> Map<String, Value> {
        let mut payload = self.base_params.clone();
        payload.insert(
            "MetricName".to_string(),
            Value::from(spec.props.metric_name.clone()),
        );
        payload.insert(
            "Namespace".to_string(),
            Value::from(spec.props.namespace.clone()),
        );
        payload.insert(
            "Dimensions".to_string(),
            serde_json::to_value(&spec.props.dimensions).unwrap_or_default(),
        );
        for (key, value) in &spec.props.overrides {
            payload.insert(key.clone(), value.clone());
        }
        payload.insert(
            "AlarmName".to_string(),
            Value::from(spec.alarm_name.clone()),
        );
        payload.insert(
            "AlarmDescription".to_string(),
            Value::from(spec.description.clone()),
        );
        payload
    }

    async fn pause(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}
