//! Resource discovery: turn heterogeneous cloud-resource listings into a
//! uniform stream of alarm parameters.
//!
//! One [`ResourceProvider`] implementation exists per resource kind,
//! selected by [`build_provider`]. The shared expansion loop lives in
//! [`expand_metric_alarms`]; providers only supply listing, short-name, and
//! dimension behavior. Adding a kind means adding a provider (or a
//! [`tag_search::TagSearchProvider`] kind spec), never branching inside the
//! expansion logic.

pub mod arn;
pub mod error;
pub mod rest_api;
pub mod tag_search;

use std::sync::Arc;

use alarmsync_aws::apigateway::ApiGatewayClient;
use alarmsync_aws::tagging::TaggingClient;
use alarmsync_common::config::{ResourceRuleConfig, SyncConfig};
use alarmsync_common::types::{AlarmProps, Dimension, DiscoveredResource, MetricAlarmParam};
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;

pub use error::DiscoveryError;

/// One resource kind's discovery capability: list the in-scope resources and
/// name the metric dimension each alarm should carry.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Resource kind identifier (e.g. `"lambda:function"`).
    fn kind(&self) -> &str;

    /// List all resources matching this provider's selector. Paginated
    /// backends are drained internally; a fresh call restarts from page one.
    async fn list_resources(&self) -> anyhow::Result<Vec<DiscoveredResource>>;

    /// The dimension list identifying `resource` for one metric alarm.
    fn dimensions(&self, metric_name: &str, resource: &DiscoveredResource) -> Vec<Dimension>;
}

/// The service clients discovery providers draw from.
pub struct DiscoveryClients {
    pub tagging: Arc<TaggingClient>,
    pub apigateway: Arc<ApiGatewayClient>,
}

/// Build the provider for one resource rule.
///
/// # Errors
///
/// Returns [`DiscoveryError::UnknownResourceKind`] if the rule names a kind
/// with no registered provider, and [`DiscoveryError::InvalidNamePattern`]
/// if its name pattern does not compile.
pub fn build_provider(
    rule: &ResourceRuleConfig,
    clients: &DiscoveryClients,
) -> Result<Box<dyn ResourceProvider>, DiscoveryError> {
    use tag_search::{TagSearchProvider, EVENTS_RULE, LAMBDA_FUNCTION, SNS_TOPIC, SQS_QUEUE, STATE_MACHINE};

    let tagging = Arc::clone(&clients.tagging);
    match rule.target_resource_type.as_str() {
        "lambda:function" => Ok(Box::new(TagSearchProvider::new(LAMBDA_FUNCTION, rule, tagging)?)),
        "states:stateMachine" => Ok(Box::new(TagSearchProvider::new(STATE_MACHINE, rule, tagging)?)),
        "sns:topic" => Ok(Box::new(TagSearchProvider::new(SNS_TOPIC, rule, tagging)?)),
        "sqs:queue" => Ok(Box::new(TagSearchProvider::new(SQS_QUEUE, rule, tagging)?)),
        "events:rule" => Ok(Box::new(TagSearchProvider::new(EVENTS_RULE, rule, tagging)?)),
        rest_api::RESOURCE_TYPE => Ok(Box::new(rest_api::RestApiProvider::new(
            rule,
            Arc::clone(&clients.apigateway),
        )?)),
        other => Err(DiscoveryError::UnknownResourceKind(other.to_string())),
    }
}

/// Build one provider per configured resource rule, in rule order.
///
/// Fails on the first bad rule before any discovery call is made, so a typo
/// in one kind never leaves a half-reconciled alarm set.
pub fn build_providers(
    config: &SyncConfig,
    clients: &DiscoveryClients,
) -> Result<Vec<(String, Box<dyn ResourceProvider>)>, DiscoveryError> {
    config
        .resources
        .iter()
        .map(|(rule_name, rule)| Ok((rule_name.clone(), build_provider(rule, clients)?)))
        .collect()
}

/// The shared expansion loop: one alarm parameter set per
/// (resource, metric) pair, with per-metric overrides attached when the
/// rule configures them.
pub async fn expand_metric_alarms(
    provider: &dyn ResourceProvider,
    rule: &ResourceRuleConfig,
) -> anyhow::Result<Vec<MetricAlarmParam>> {
    let resources = provider
        .list_resources()
        .await
        .with_context(|| format!("Discovery failed for resource kind `{}`", provider.kind()))?;

    let mut params = Vec::with_capacity(resources.len() * rule.alarm.metrics.len());
    for resource in &resources {
        for metric_name in &rule.alarm.metrics {
            let overrides = rule
                .alarm
                .alarm_param_overrides
                .get(metric_name)
                .cloned()
                .unwrap_or_default();

            params.push(MetricAlarmParam {
                resource_name: resource.short_name.clone(),
                props: AlarmProps {
                    metric_name: metric_name.clone(),
                    namespace: rule.alarm.namespace.clone(),
                    dimensions: provider.dimensions(metric_name, resource),
                    overrides,
                },
            });
        }
    }

    Ok(params)
}

pub(crate) fn compile_name_pattern(
    pattern: Option<&str>,
) -> Result<Option<Regex>, DiscoveryError> {
    pattern
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| DiscoveryError::InvalidNamePattern {
                pattern: pattern.to_string(),
                source,
            })
        })
        .transpose()
}

/// Match at the start of `name` only, like the anchored matching the name
/// patterns are written against.
pub(crate) fn matches_at_start(pattern: &Regex, name: &str) -> bool {
    pattern.find(name).is_some_and(|m| m.start() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alarmsync_aws::AwsCredentials;
    use alarmsync_common::config::AlarmRuleConfig;
    use serde_json::Map;
    use std::collections::BTreeMap;

    struct MockProvider {
        resources: Vec<DiscoveredResource>,
    }

    #[async_trait]
    impl ResourceProvider for MockProvider {
        fn kind(&self) -> &str {
            "mock:resource"
        }

        async fn list_resources(&self) -> anyhow::Result<Vec<DiscoveredResource>> {
            Ok(self.resources.clone())
        }

        fn dimensions(&self, _metric_name: &str, resource: &DiscoveredResource) -> Vec<Dimension> {
            vec![Dimension::new("MockName", resource.short_name.clone())]
        }
    }

    fn rule_with_metrics(metrics: &[&str]) -> ResourceRuleConfig {
        ResourceRuleConfig {
            target_resource_type: "mock:resource".to_string(),
            target_resource_tags: BTreeMap::new(),
            target_resource_name_pattern: None,
            alarm: AlarmRuleConfig {
                namespace: "Mock/Namespace".to_string(),
                metrics: metrics.iter().map(|m| m.to_string()).collect(),
                alarm_param_overrides: BTreeMap::new(),
            },
        }
    }

    fn clients() -> DiscoveryClients {
        let credentials = AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
        };
        DiscoveryClients {
            tagging: Arc::new(TaggingClient::new("us-east-1", credentials.clone()).expect("client")),
            apigateway: Arc::new(ApiGatewayClient::new("us-east-1", credentials).expect("client")),
        }
    }

    #[tokio::test]
    async fn expands_one_param_per_resource_metric_pair() {
        let provider = MockProvider {
            resources: vec![
                DiscoveredResource {
                    identifier: "arn:a".to_string(),
                    short_name: "a".to_string(),
                },
                DiscoveredResource {
                    identifier: "arn:b".to_string(),
                    short_name: "b".to_string(),
                },
            ],
        };
        let rule = rule_with_metrics(&["Errors", "Throttles"]);

        let params = expand_metric_alarms(&provider, &rule).await.unwrap();

        assert_eq!(params.len(), 4);
        let pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|p| (p.resource_name.as_str(), p.props.metric_name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("a", "Errors"),
                ("a", "Throttles"),
                ("b", "Errors"),
                ("b", "Throttles"),
            ]
        );
        assert_eq!(params[0].props.namespace, "Mock/Namespace");
        assert_eq!(params[0].props.dimensions, vec![Dimension::new("MockName", "a")]);
    }

    #[tokio::test]
    async fn attaches_overrides_only_for_configured_metrics() {
        let provider = MockProvider {
            resources: vec![DiscoveredResource {
                identifier: "arn:a".to_string(),
                short_name: "a".to_string(),
            }],
        };
        let mut rule = rule_with_metrics(&["Errors", "Throttles"]);
        let mut errors_override = Map::new();
        errors_override.insert("Threshold".to_string(), serde_json::json!(5.0));
        rule.alarm
            .alarm_param_overrides
            .insert("Errors".to_string(), errors_override);

        let params = expand_metric_alarms(&provider, &rule).await.unwrap();

        assert_eq!(
            params[0].props.overrides.get("Threshold"),
            Some(&serde_json::json!(5.0))
        );
        assert!(params[1].props.overrides.is_empty());
    }

    #[test]
    fn registry_rejects_unknown_resource_kind() {
        let rule = ResourceRuleConfig {
            target_resource_type: "dynamodb:table".to_string(),
            ..rule_with_metrics(&["Errors"])
        };

        let err = build_provider(&rule, &clients()).err().unwrap();
        match err {
            DiscoveryError::UnknownResourceKind(kind) => assert_eq!(kind, "dynamodb:table"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn registry_builds_all_known_kinds() {
        let clients = clients();
        for kind in [
            "lambda:function",
            "states:stateMachine",
            "sns:topic",
            "sqs:queue",
            "events:rule",
            "apigateway:restapi",
        ] {
            let rule = ResourceRuleConfig {
                target_resource_type: kind.to_string(),
                ..rule_with_metrics(&["Errors"])
            };
            let provider = build_provider(&rule, &clients).expect("provider");
            assert_eq!(provider.kind(), kind);
        }
    }

    #[test]
    fn name_pattern_matches_anchored_at_start() {
        let pattern = compile_name_pattern(Some("orders-")).unwrap().unwrap();
        assert!(matches_at_start(&pattern, "orders-fn"));
        assert!(!matches_at_start(&pattern, "all-orders-fn"));
    }
}
