use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::error::Result;
use crate::{AwsApiClient, AwsCredentials};

const TARGET_PREFIX: &str = "ResourceGroupsTaggingAPI_20170126";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const RESOURCES_PER_PAGE: u64 = 100;

/// Resource Groups Tagging API client: the generic "resources by tag"
/// surface used by every tag-search discovery kind.
pub struct TaggingClient {
    api: AwsApiClient,
    host: String,
}

/// One GetResources page.
#[derive(Debug, Clone)]
pub struct ResourceArnPage {
    pub resource_arns: Vec<String>,
    pub pagination_token: Option<String>,
}

impl TaggingClient {
    pub fn new(region: &str, credentials: AwsCredentials) -> Result<Self> {
        Ok(Self {
            host: format!("tagging.{region}.amazonaws.com"),
            api: AwsApiClient::new(region, credentials)?,
        })
    }

    /// Fetch one page of resource ARNs of `resource_type` matching all of
    /// `tag_filters` (server-side).
    pub async fn get_resources_page(
        &self,
        resource_type: &str,
        tag_filters: &BTreeMap<String, String>,
        pagination_token: Option<&str>,
    ) -> Result<ResourceArnPage> {
        let mut payload = json!({
            "ResourceTypeFilters": [resource_type],
            "ResourcesPerPage": RESOURCES_PER_PAGE,
        });
        if !tag_filters.is_empty() {
            let filters: Vec<Value> = tag_filters
                .iter()
                .map(|(key, value)| json!({ "Key": key, "Values": [value] }))
                .collect();
            payload["TagFilters"] = Value::from(filters);
        }
        if let Some(token) = pagination_token {
            payload["PaginationToken"] = Value::from(token);
        }

        let response = self
            .api
            .post_target_json(
                "tagging",
                &self.host,
                &format!("{TARGET_PREFIX}.GetResources"),
                CONTENT_TYPE,
                &payload,
            )
            .await?;
        Ok(parse_resource_page(&response))
    }

    /// Start a lazy listing of all matching resource ARNs. The pager follows
    /// continuation tokens internally; callers just drain pages. Finite and
    /// not restartable; call this again for a fresh listing.
    pub fn resource_arns<'a>(
        &'a self,
        resource_type: &str,
        tag_filters: &BTreeMap<String, String>,
    ) -> ResourceArnPager<'a> {
        ResourceArnPager {
            client: self,
            resource_type: resource_type.to_string(),
            tag_filters: tag_filters.clone(),
            pagination_token: None,
            done: false,
        }
    }
}

fn parse_resource_page(response: &Value) -> ResourceArnPage {
    let resource_arns = response
        .get("ResourceTagMappingList")
        .and_then(Value::as_array)
        .map(|mappings| {
            mappings
                .iter()
                .filter_map(|mapping| mapping.get("ResourceARN").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    // The API signals exhaustion with an empty-string token.
    let pagination_token = response
        .get("PaginationToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    ResourceArnPage {
        resource_arns,
        pagination_token,
    }
}

/// Token-driven pager over GetResources.
pub struct ResourceArnPager<'a> {
    client: &'a TaggingClient,
    resource_type: String,
    tag_filters: BTreeMap<String, String>,
    pagination_token: Option<String>,
    done: bool,
}

impl ResourceArnPager<'_> {
    /// Fetch the next page of ARNs, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .client
            .get_resources_page(
                &self.resource_type,
                &self.tag_filters,
                self.pagination_token.as_deref(),
            )
            .await?;

        match page.pagination_token {
            Some(token) => self.pagination_token = Some(token),
            None => self.done = true,
        }
        Ok(Some(page.resource_arns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_arns_and_token_from_page() {
        let response = json!({
            "ResourceTagMappingList": [
                { "ResourceARN": "arn:aws:lambda:us-east-1:111111111111:function:orders-fn" },
                { "ResourceARN": "arn:aws:lambda:us-east-1:111111111111:function:billing-fn" },
            ],
            "PaginationToken": "opaque",
        });

        let page = parse_resource_page(&response);
        assert_eq!(page.resource_arns.len(), 2);
        assert_eq!(page.pagination_token.as_deref(), Some("opaque"));
    }

    #[test]
    fn empty_token_means_exhausted() {
        let response = json!({
            "ResourceTagMappingList": [],
            "PaginationToken": "",
        });

        let page = parse_resource_page(&response);
        assert!(page.resource_arns.is_empty());
        assert!(page.pagination_token.is_none());
    }
}
