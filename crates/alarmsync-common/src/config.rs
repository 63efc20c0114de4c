use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root configuration: global alarm settings plus one block per resource
/// rule. `resources` is a `BTreeMap` so providers are always built and
/// expanded in the same order for a given config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub globals: GlobalConfig,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "default_region")]
    pub region: String,
    /// Delay inserted after every create/delete call, in milliseconds.
    /// Zero disables the delay.
    #[serde(default)]
    pub api_call_interval_millis: u64,
    pub alarm: GlobalAlarmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalAlarmConfig {
    /// Prefix of every alarm this tool owns. Reconciliation only ever lists,
    /// creates, and deletes alarms under this prefix.
    pub alarm_name_prefix: String,
    /// Base PutMetricAlarm parameters shared by every created alarm
    /// (threshold, period, statistic, ...). Free-form: keys are passed to
    /// the API verbatim, spec-level fields win on conflict.
    #[serde(default)]
    pub default_alarm_params: Map<String, Value>,
    /// Notification targets set as alarm, OK, and insufficient-data actions
    /// on every created alarm.
    #[serde(default)]
    pub alarm_actions: Vec<String>,
    /// Optional tags applied uniformly to every created alarm.
    #[serde(default)]
    pub alarm_tagging: BTreeMap<String, String>,
}

/// One resource-discovery rule: which resources of a kind are in scope and
/// which alarms each of them gets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRuleConfig {
    /// Resource kind identifier, e.g. `"lambda:function"` or `"sqs:queue"`.
    pub target_resource_type: String,
    /// Tag equality filter; all entries must match.
    #[serde(default)]
    pub target_resource_tags: BTreeMap<String, String>,
    /// Anchored regex matched against the resource short name, client-side.
    #[serde(default)]
    pub target_resource_name_pattern: Option<String>,
    pub alarm: AlarmRuleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmRuleConfig {
    /// CloudWatch namespace shared by all metrics of this rule.
    pub namespace: String,
    /// Metric names; each discovered resource gets one alarm per entry.
    pub metrics: Vec<String>,
    /// Per-metric parameter overrides, keyed by metric name. Shallow merge:
    /// an override key replaces the base key wholesale.
    #[serde(default)]
    pub alarm_param_overrides: BTreeMap<String, Map<String, Value>>,
}

fn default_region() -> String {
    std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string())
}

impl SyncConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{path}'"))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[globals]
region = "eu-west-1"
api_call_interval_millis = 200

[globals.alarm]
alarm_name_prefix = "myapp-"
alarm_actions = ["arn:aws:sns:eu-west-1:111111111111:alerts"]

[globals.alarm.default_alarm_params]
EvaluationPeriods = 1
Period = 60
Statistic = "Sum"
Threshold = 1.0
ComparisonOperator = "GreaterThanOrEqualToThreshold"
TreatMissingData = "notBreaching"

[globals.alarm.alarm_tagging]
managed-by = "alarmsync"

[resources.lambda]
target_resource_type = "lambda:function"
target_resource_name_pattern = "^orders-"

[resources.lambda.target_resource_tags]
monitored = "true"

[resources.lambda.alarm]
namespace = "AWS/Lambda"
metrics = ["Errors", "Throttles"]

[resources.lambda.alarm.alarm_param_overrides.Errors]
Threshold = 5.0
"#;

    #[test]
    fn parses_full_config() {
        let config: SyncConfig = toml::from_str(SAMPLE).expect("config should parse");

        assert_eq!(config.globals.region, "eu-west-1");
        assert_eq!(config.globals.api_call_interval_millis, 200);
        assert_eq!(config.globals.alarm.alarm_name_prefix, "myapp-");
        assert_eq!(
            config.globals.alarm.default_alarm_params.get("Statistic"),
            Some(&serde_json::json!("Sum"))
        );
        assert_eq!(
            config.globals.alarm.alarm_tagging.get("managed-by"),
            Some(&"alarmsync".to_string())
        );

        let lambda = config.resources.get("lambda").expect("lambda rule");
        assert_eq!(lambda.target_resource_type, "lambda:function");
        assert_eq!(
            lambda.target_resource_name_pattern.as_deref(),
            Some("^orders-")
        );
        assert_eq!(lambda.alarm.metrics, vec!["Errors", "Throttles"]);
        let overrides = lambda
            .alarm
            .alarm_param_overrides
            .get("Errors")
            .expect("Errors override");
        assert_eq!(overrides.get("Threshold"), Some(&serde_json::json!(5.0)));
    }

    #[test]
    fn optional_blocks_default_to_empty() {
        let minimal = r#"
[globals]
[globals.alarm]
alarm_name_prefix = "p-"

[resources.queues]
target_resource_type = "sqs:queue"
[resources.queues.alarm]
namespace = "AWS/SQS"
metrics = ["ApproximateNumberOfMessagesVisible"]
"#;
        let config: SyncConfig = toml::from_str(minimal).expect("config should parse");

        assert_eq!(config.globals.api_call_interval_millis, 0);
        assert!(config.globals.alarm.alarm_actions.is_empty());
        assert!(config.globals.alarm.alarm_tagging.is_empty());
        assert!(config.globals.alarm.default_alarm_params.is_empty());

        let queues = config.resources.get("queues").expect("queues rule");
        assert!(queues.target_resource_tags.is_empty());
        assert!(queues.target_resource_name_pattern.is_none());
        assert!(queues.alarm.alarm_param_overrides.is_empty());
    }

    #[test]
    fn load_reports_path_on_missing_file() {
        let err = SyncConfig::load("/nonexistent/alarmsync.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/alarmsync.toml"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write config");
        let config =
            SyncConfig::load(file.path().to_str().expect("utf-8 path")).expect("load config");
        assert_eq!(config.globals.alarm.alarm_name_prefix, "myapp-");
    }
}
