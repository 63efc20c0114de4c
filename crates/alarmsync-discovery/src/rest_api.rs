use std::collections::BTreeMap;
use std::sync::Arc;

use alarmsync_aws::apigateway::ApiGatewayClient;
use alarmsync_common::config::ResourceRuleConfig;
use alarmsync_common::types::{Dimension, DiscoveredResource};
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;

use crate::error::DiscoveryError;
use crate::{compile_name_pattern, matches_at_start, ResourceProvider};

pub(crate) const RESOURCE_TYPE: &str = "apigateway:restapi";

/// Discovery provider for API Gateway REST APIs.
///
/// The generic tag-search surface does not cover this kind, so the provider
/// lists every API and filters client-side: tag-subset containment plus the
/// optional name pattern. The API's own name doubles as its identifier and
/// short name; no ARN parsing is involved.
pub struct RestApiProvider {
    client: Arc<ApiGatewayClient>,
    tag_filters: BTreeMap<String, String>,
    name_pattern: Option<Regex>,
}

impl RestApiProvider {
    pub(crate) fn new(
        rule: &ResourceRuleConfig,
        client: Arc<ApiGatewayClient>,
    ) -> Result<Self, DiscoveryError> {
        Ok(Self {
            client,
            tag_filters: rule.target_resource_tags.clone(),
            name_pattern: compile_name_pattern(rule.target_resource_name_pattern.as_deref())?,
        })
    }
}

#[async_trait]
impl ResourceProvider for RestApiProvider {
    fn kind(&self) -> &str {
        RESOURCE_TYPE
    }

    async fn list_resources(&self) -> anyhow::Result<Vec<DiscoveredResource>> {
        let apis = self
            .client
            .get_rest_apis()
            .await
            .context("Failed to list API Gateway REST APIs")?;

        let resources: Vec<DiscoveredResource> = apis
            .into_iter()
            .filter(|api| contains_tags(&api.tags, &self.tag_filters))
            .filter(|api| match &self.name_pattern {
                Some(pattern) => matches_at_start(pattern, &api.name),
                None => true,
            })
            .map(|api| DiscoveredResource {
                identifier: api.name.clone(),
                short_name: api.name,
            })
            .collect();

        tracing::debug!(
            kind = RESOURCE_TYPE,
            count = resources.len(),
            "Discovered resources"
        );
        Ok(resources)
    }

    fn dimensions(&self, _metric_name: &str, resource: &DiscoveredResource) -> Vec<Dimension> {
        vec![Dimension::new("ApiName", resource.short_name.clone())]
    }
}

/// True when every expected tag is present with the expected value.
fn contains_tags(actual: &BTreeMap<String, String>, expected: &BTreeMap<String, String>) -> bool {
    expected
        .iter()
        .all(|(key, value)| actual.get(key) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn empty_expectation_matches_any_tags() {
        assert!(contains_tags(&tags(&[("env", "prod")]), &tags(&[])));
        assert!(contains_tags(&tags(&[]), &tags(&[])));
    }

    #[test]
    fn requires_all_expected_tags_to_match() {
        let actual = tags(&[("env", "prod"), ("team", "backend")]);

        assert!(contains_tags(&actual, &tags(&[("env", "prod")])));
        assert!(contains_tags(
            &actual,
            &tags(&[("env", "prod"), ("team", "backend")])
        ));
        assert!(!contains_tags(&actual, &tags(&[("env", "dev")])));
        assert!(!contains_tags(&actual, &tags(&[("missing", "tag")])));
    }
}
