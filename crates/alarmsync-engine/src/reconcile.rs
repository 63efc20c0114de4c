use std::collections::{HashMap, HashSet};

use alarmsync_common::types::{AlarmSpec, ChangeSet, MetricAlarmParam};
use anyhow::Context;

use crate::{AlarmBackend, EngineError};

/// Derive the unique alarm name for a (resource, metric) pair.
///
/// The derivation is deterministic so the engine can match required specs to
/// existing alarms by name alone, with no tagging side channel.
pub fn derive_alarm_name(prefix: &str, resource_name: &str, metric_name: &str) -> String {
    format!("{prefix}{resource_name}-{metric_name}")
}

/// Materialize the expansion output into fully-qualified alarm specs,
/// rejecting duplicate derived names before any backend call is made.
///
/// Input order is preserved; it determines `to_create`/`to_keep` ordering in
/// the change set.
pub fn required_alarm_specs(
    prefix: &str,
    params: Vec<MetricAlarmParam>,
) -> Result<Vec<AlarmSpec>, EngineError> {
    let mut specs = Vec::with_capacity(params.len());
    let mut seen: HashMap<String, String> = HashMap::with_capacity(params.len());

    for param in params {
        let alarm_name = derive_alarm_name(prefix, &param.resource_name, &param.props.metric_name);
        if let Some(first_resource) = seen.get(&alarm_name) {
            return Err(EngineError::DuplicateAlarmName {
                alarm_name,
                first_resource: first_resource.clone(),
                second_resource: param.resource_name,
            });
        }
        seen.insert(alarm_name.clone(), param.resource_name.clone());

        specs.push(AlarmSpec {
            description: format!(
                "Metric Alarm for `{}` of {}",
                param.props.metric_name, param.resource_name
            ),
            alarm_name,
            props: param.props,
        });
    }

    Ok(specs)
}

/// Fetch every alarm name under `prefix`, following continuation tokens
/// until the backend reports no more pages.
pub async fn fetch_current_alarm_names(
    backend: &dyn AlarmBackend,
    prefix: &str,
) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = backend
            .list_alarms(prefix, token.as_deref())
            .await
            .with_context(|| format!("Failed to list alarms with prefix `{prefix}`"))?;
        names.extend(page.alarm_names);

        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }

    tracing::debug!(prefix, count = names.len(), "Fetched current alarm inventory");
    Ok(names)
}

/// Pure set difference over alarm names.
///
/// `to_create`/`to_keep` keep the order of `required`; `to_delete` keeps the
/// order of `current_names`. The three sets partition the union of both name
/// sets.
pub fn compute_change_set(required: Vec<AlarmSpec>, current_names: Vec<String>) -> ChangeSet {
    let current: HashSet<&str> = current_names.iter().map(String::as_str).collect();
    let required_names: HashSet<&str> =
        required.iter().map(|spec| spec.alarm_name.as_str()).collect();

    let to_delete: Vec<String> = current_names
        .iter()
        .filter(|name| !required_names.contains(name.as_str()))
        .cloned()
        .collect();

    let mut to_create = Vec::new();
    let mut to_keep = Vec::new();
    for spec in required {
        if current.contains(spec.alarm_name.as_str()) {
            to_keep.push(spec);
        } else {
            to_create.push(spec);
        }
    }

    ChangeSet {
        to_create,
        to_keep,
        to_delete,
    }
}

/// Full reconciliation pass: derive required specs, fetch the live
/// inventory, and diff the two.
pub async fn build_change_set(
    backend: &dyn AlarmBackend,
    prefix: &str,
    params: Vec<MetricAlarmParam>,
) -> anyhow::Result<ChangeSet> {
    let required = required_alarm_specs(prefix, params)?;
    let current = fetch_current_alarm_names(backend, prefix).await?;

    let change_set = compute_change_set(required, current);
    tracing::info!(
        create = change_set.to_create.len(),
        keep = change_set.to_keep.len(),
        delete = change_set.to_delete.len(),
        "Change set computed"
    );
    Ok(change_set)
}
