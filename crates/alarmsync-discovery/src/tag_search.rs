use std::collections::BTreeMap;
use std::sync::Arc;

use alarmsync_aws::tagging::TaggingClient;
use alarmsync_common::config::ResourceRuleConfig;
use alarmsync_common::types::{Dimension, DiscoveredResource};
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;

use crate::arn::ArnShape;
use crate::error::DiscoveryError;
use crate::{compile_name_pattern, matches_at_start, ResourceProvider};

/// What the alarm dimension carries for a kind: the normalized short name,
/// or the raw identifier when the metric dimension expects the full
/// reference (state machines key their metrics by ARN).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DimensionValue {
    ShortName,
    FullIdentifier,
}

/// Per-kind wiring for the shared tag-search listing: how the kind is named
/// in the tag API, which metric dimension it uses, and how its short name
/// falls out of the ARN.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KindSpec {
    pub resource_type: &'static str,
    pub dimension_key: &'static str,
    pub arn_shape: ArnShape,
    pub dimension_value: DimensionValue,
}

pub(crate) const LAMBDA_FUNCTION: KindSpec = KindSpec {
    resource_type: "lambda:function",
    dimension_key: "FunctionName",
    arn_shape: ArnShape::ThroughResourceType,
    dimension_value: DimensionValue::ShortName,
};

pub(crate) const STATE_MACHINE: KindSpec = KindSpec {
    resource_type: "states:stateMachine",
    dimension_key: "StateMachineArn",
    arn_shape: ArnShape::ThroughResourceType,
    dimension_value: DimensionValue::FullIdentifier,
};

pub(crate) const SNS_TOPIC: KindSpec = KindSpec {
    resource_type: "sns:topic",
    dimension_key: "TopicName",
    arn_shape: ArnShape::ThroughAccount,
    dimension_value: DimensionValue::ShortName,
};

pub(crate) const SQS_QUEUE: KindSpec = KindSpec {
    resource_type: "sqs:queue",
    dimension_key: "QueueName",
    arn_shape: ArnShape::ThroughAccount,
    dimension_value: DimensionValue::ShortName,
};

pub(crate) const EVENTS_RULE: KindSpec = KindSpec {
    resource_type: "events:rule",
    dimension_key: "RuleName",
    arn_shape: ArnShape::ThroughLastSlash,
    dimension_value: DimensionValue::ShortName,
};

/// Discovery provider for every kind reachable through the generic
/// "resources by tag" API. Tag filters are applied server-side, the name
/// pattern client-side against the extracted short name.
pub struct TagSearchProvider {
    spec: KindSpec,
    tagging: Arc<TaggingClient>,
    tag_filters: BTreeMap<String, String>,
    name_pattern: Option<Regex>,
}

impl TagSearchProvider {
    pub(crate) fn new(
        spec: KindSpec,
        rule: &ResourceRuleConfig,
        tagging: Arc<TaggingClient>,
    ) -> Result<Self, DiscoveryError> {
        Ok(Self {
            spec,
            tagging,
            tag_filters: rule.target_resource_tags.clone(),
            name_pattern: compile_name_pattern(rule.target_resource_name_pattern.as_deref())?,
        })
    }
}

#[async_trait]
impl ResourceProvider for TagSearchProvider {
    fn kind(&self) -> &str {
        self.spec.resource_type
    }

    async fn list_resources(&self) -> anyhow::Result<Vec<DiscoveredResource>> {
        let mut resources = Vec::new();
        let mut pager = self
            .tagging
            .resource_arns(self.spec.resource_type, &self.tag_filters);

        while let Some(arns) = pager.next_page().await.with_context(|| {
            format!("Failed to list `{}` resources by tag", self.spec.resource_type)
        })? {
            for arn in arns {
                let short_name = self.spec.arn_shape.short_name(&arn);
                if let Some(pattern) = &self.name_pattern {
                    if !matches_at_start(pattern, &short_name) {
                        continue;
                    }
                }
                resources.push(DiscoveredResource {
                    identifier: arn,
                    short_name,
                });
            }
        }

        tracing::debug!(
            kind = self.spec.resource_type,
            count = resources.len(),
            "Discovered resources"
        );
        Ok(resources)
    }

    fn dimensions(&self, _metric_name: &str, resource: &DiscoveredResource) -> Vec<Dimension> {
        let value = match self.spec.dimension_value {
            DimensionValue::ShortName => resource.short_name.clone(),
            DimensionValue::FullIdentifier => resource.identifier.clone(),
        };
        vec![Dimension::new(self.spec.dimension_key, value)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alarmsync_aws::AwsCredentials;
    use alarmsync_common::config::AlarmRuleConfig;

    fn rule(resource_type: &str) -> ResourceRuleConfig {
        ResourceRuleConfig {
            target_resource_type: resource_type.to_string(),
            target_resource_tags: BTreeMap::new(),
            target_resource_name_pattern: None,
            alarm: AlarmRuleConfig {
                namespace: "AWS/Test".to_string(),
                metrics: vec!["Errors".to_string()],
                alarm_param_overrides: BTreeMap::new(),
            },
        }
    }

    fn tagging() -> Arc<TaggingClient> {
        let credentials = AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
        };
        Arc::new(TaggingClient::new("us-east-1", credentials).expect("client"))
    }

    fn resource(identifier: &str, short_name: &str) -> DiscoveredResource {
        DiscoveredResource {
            identifier: identifier.to_string(),
            short_name: short_name.to_string(),
        }
    }

    #[test]
    fn lambda_dimension_uses_short_function_name() {
        let provider = TagSearchProvider::new(LAMBDA_FUNCTION, &rule("lambda:function"), tagging())
            .expect("provider");
        let dims = provider.dimensions(
            "Errors",
            &resource(
                "arn:aws:lambda:us-east-1:111111111111:function:orders-fn",
                "orders-fn",
            ),
        );
        assert_eq!(dims, vec![Dimension::new("FunctionName", "orders-fn")]);
    }

    #[test]
    fn state_machine_dimension_uses_raw_arn() {
        let provider = TagSearchProvider::new(STATE_MACHINE, &rule("states:stateMachine"), tagging())
            .expect("provider");
        let arn = "arn:aws:states:us-east-1:111111111111:stateMachine:orders-workflow";
        let dims = provider.dimensions("ExecutionsFailed", &resource(arn, "orders-workflow"));
        assert_eq!(dims, vec![Dimension::new("StateMachineArn", arn)]);
    }

    #[test]
    fn queue_topic_and_rule_dimension_keys() {
        let cases = [
            (SQS_QUEUE, "QueueName"),
            (SNS_TOPIC, "TopicName"),
            (EVENTS_RULE, "RuleName"),
        ];
        for (spec, expected_key) in cases {
            let provider = TagSearchProvider::new(spec, &rule(spec.resource_type), tagging())
                .expect("provider");
            let dims = provider.dimensions("Whatever", &resource("arn", "orders"));
            assert_eq!(dims, vec![Dimension::new(expected_key, "orders")]);
        }
    }

    #[test]
    fn invalid_name_pattern_fails_at_construction() {
        let mut bad_rule = rule("lambda:function");
        bad_rule.target_resource_name_pattern = Some("(unclosed".to_string());
        let err = TagSearchProvider::new(LAMBDA_FUNCTION, &bad_rule, tagging()).err().unwrap();
        assert!(matches!(err, DiscoveryError::InvalidNamePattern { .. }));
    }
}
