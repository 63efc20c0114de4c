use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;
use crate::{AwsApiClient, AwsCredentials};

const PAGE_LIMIT: &str = "500";

/// A REST API as returned by the API Gateway control plane, reduced to what
/// discovery needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestApi {
    pub name: String,
    pub tags: BTreeMap<String, String>,
}

/// API Gateway control-plane client. This resource kind is not covered by
/// the generic tag-search surface, so discovery lists all APIs here and
/// filters client-side.
pub struct ApiGatewayClient {
    api: AwsApiClient,
    host: String,
}

impl ApiGatewayClient {
    pub fn new(region: &str, credentials: AwsCredentials) -> Result<Self> {
        Ok(Self {
            host: format!("apigateway.{region}.amazonaws.com"),
            api: AwsApiClient::new(region, credentials)?,
        })
    }

    /// List every REST API in the region, following position tokens until
    /// exhausted.
    pub async fn get_rest_apis(&self) -> Result<Vec<RestApi>> {
        let mut apis = Vec::new();
        let mut position: Option<String> = None;

        loop {
            let mut query = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(pos) = &position {
                query.push(("position", pos.clone()));
            }

            let response = self
                .api
                .get_rest_json("apigateway", &self.host, "/restapis", &query)
                .await?;

            apis.extend(parse_rest_apis(&response));

            match response.get("position").and_then(Value::as_str) {
                Some(pos) if !pos.is_empty() => position = Some(pos.to_string()),
                _ => break,
            }
        }

        Ok(apis)
    }
}

fn parse_rest_apis(response: &Value) -> Vec<RestApi> {
    response
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = item.get("name").and_then(Value::as_str)?;
                    let tags = item
                        .get("tags")
                        .and_then(Value::as_object)
                        .map(|tags| {
                            tags.iter()
                                .filter_map(|(key, value)| {
                                    value.as_str().map(|v| (key.clone(), v.to_string()))
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    Some(RestApi {
                        name: name.to_string(),
                        tags,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
