use async_trait::async_trait;
use serde_json::{json, Map, Value};

use alarmsync_engine::{AlarmBackend, AlarmInventoryPage};

use crate::error::Result;
use crate::{AwsApiClient, AwsCredentials};

const TARGET_PREFIX: &str = "GraniteServiceVersion20100801";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Inventory listing page size; the DescribeAlarms maximum.
const MAX_RECORDS: u64 = 100;

/// CloudWatch alarm API client.
///
/// `put_metric_alarm` is an upsert keyed by alarm name and `delete_alarms`
/// ignores absent names, which is what makes a re-run of the whole
/// reconciliation safe after a partial apply.
pub struct CloudWatchClient {
    api: AwsApiClient,
    host: String,
}

impl CloudWatchClient {
    pub fn new(region: &str, credentials: AwsCredentials) -> Result<Self> {
        Ok(Self {
            host: format!("monitoring.{region}.amazonaws.com"),
            api: AwsApiClient::new(region, credentials)?,
        })
    }

    async fn call(&self, action: &str, payload: &Value) -> Result<Value> {
        self.api
            .post_target_json(
                "monitoring",
                &self.host,
                &format!("{TARGET_PREFIX}.{action}"),
                CONTENT_TYPE,
                payload,
            )
            .await
    }

    /// Fetch one page of metric alarms whose names start with `name_prefix`.
    pub async fn describe_alarms_page(
        &self,
        name_prefix: &str,
        next_token: Option<&str>,
    ) -> Result<AlarmInventoryPage> {
        let mut payload = json!({
            "AlarmNamePrefix": name_prefix,
            "AlarmTypes": ["MetricAlarm"],
            "MaxRecords": MAX_RECORDS,
        });
        if let Some(token) = next_token {
            payload["NextToken"] = Value::from(token);
        }

        let response = self.call("DescribeAlarms", &payload).await?;
        Ok(parse_alarm_page(&response))
    }

    pub async fn put_metric_alarm(&self, params: &Map<String, Value>) -> Result<()> {
        self.call("PutMetricAlarm", &Value::Object(params.clone()))
            .await?;
        Ok(())
    }

    pub async fn delete_alarms(&self, alarm_names: &[String]) -> Result<()> {
        self.call("DeleteAlarms", &json!({ "AlarmNames": alarm_names }))
            .await?;
        Ok(())
    }
}

fn parse_alarm_page(response: &Value) -> AlarmInventoryPage {
    let alarm_names = response
        .get("MetricAlarms")
        .and_then(Value::as_array)
        .map(|alarms| {
            alarms
                .iter()
                .filter_map(|alarm| alarm.get("AlarmName").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let next_token = response
        .get("NextToken")
        .and_then(Value::as_str)
        .map(str::to_string);

    AlarmInventoryPage {
        alarm_names,
        next_token,
    }
}

#[async_trait]
impl AlarmBackend for CloudWatchClient {
    async fn list_alarms(
        &self,
        name_prefix: &str,
        next_token: Option<&str>,
    ) -> anyhow::Result<AlarmInventoryPage> {
        Ok(self.describe_alarms_page(name_prefix, next_token).await?)
    }

    async fn put_metric_alarm(&self, params: &Map<String, Value>) -> anyhow::Result<()> {
        Ok(CloudWatchClient::put_metric_alarm(self, params).await?)
    }

    async fn delete_alarms(&self, alarm_names: &[String]) -> anyhow::Result<()> {
        Ok(CloudWatchClient::delete_alarms(self, alarm_names).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_alarm_names_and_token_from_page() {
        let response = json!({
            "MetricAlarms": [
                { "AlarmName": "p-a-Errors", "StateValue": "OK" },
                { "AlarmName": "p-b-Errors", "StateValue": "ALARM" },
            ],
            "NextToken": "opaque-token",
        });

        let page = parse_alarm_page(&response);
        assert_eq!(page.alarm_names, vec!["p-a-Errors", "p-b-Errors"]);
        assert_eq!(page.next_token.as_deref(), Some("opaque-token"));
    }

    #[test]
    fn missing_alarm_list_parses_as_empty_final_page() {
        let page = parse_alarm_page(&json!({}));
        assert!(page.alarm_names.is_empty());
        assert!(page.next_token.is_none());
    }
}
