//! Signed AWS transport client.
//!
//! One [`AwsApiClient`] per run signs every request with SigV4 and speaks the
//! JSON target-header protocol (CloudWatch, Resource Groups Tagging API) or
//! plain REST (API Gateway). Service wrappers live in their own modules;
//! the engine and discovery crates only ever see their typed methods.

pub mod apigateway;
pub mod cloudwatch;
pub mod error;
pub mod tagging;

mod sigv4;

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::{AwsApiError, Result};

/// Static credentials resolved from the standard environment variables.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Read `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN` from the environment.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| AwsApiError::MissingCredentials("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| AwsApiError::MissingCredentials("AWS_SECRET_ACCESS_KEY"))?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// Shared signing HTTP client for all AWS service wrappers.
pub struct AwsApiClient {
    credentials: AwsCredentials,
    region: String,
    client: Client,
}

impl AwsApiClient {
    pub fn new(region: &str, credentials: AwsCredentials) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            credentials,
            region: region.to_string(),
            client,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// POST a JSON action to a target-header service
    /// (`X-Amz-Target: <prefix>.<Action>`).
    pub(crate) async fn post_target_json(
        &self,
        service: &str,
        host: &str,
        target: &str,
        content_type: &str,
        payload: &Value,
    ) -> Result<Value> {
        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let body = payload.to_string();
        tracing::debug!(target_action = target, host, "Calling AWS API");

        let mut headers = vec![
            ("content-type".to_string(), content_type.to_string()),
            ("host".to_string(), host.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
            ("x-amz-target".to_string(), target.to_string()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let authorization = sigv4::authorization_header(
            &self.credentials.access_key_id,
            &self.credentials.secret_access_key,
            &self.region,
            service,
            "POST",
            "/",
            "",
            &headers,
            body.as_bytes(),
            &amz_date,
        )?;

        let mut request = self
            .client
            .post(format!("https://{host}/"))
            .header("Content-Type", content_type)
            .header("X-Amz-Date", &amz_date)
            .header("X-Amz-Target", target)
            .header("Authorization", authorization);
        if let Some(token) = &self.credentials.session_token {
            request = request.header("X-Amz-Security-Token", token);
        }

        let response = request.body(body).send().await?;
        self.decode_response(service, response).await
    }

    /// GET a REST-style resource path with an optional query string.
    pub(crate) async fn get_rest_json(
        &self,
        service: &str,
        host: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value> {
        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        tracing::debug!(path, host, "Calling AWS API");

        let mut pairs: Vec<(String, String)> = query
            .iter()
            .map(|(key, value)| (sigv4::percent_encode(key), sigv4::percent_encode(value)))
            .collect();
        pairs.sort();
        let canonical_querystring = pairs
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut headers = vec![
            ("host".to_string(), host.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let authorization = sigv4::authorization_header(
            &self.credentials.access_key_id,
            &self.credentials.secret_access_key,
            &self.region,
            service,
            "GET",
            path,
            &canonical_querystring,
            &headers,
            b"",
            &amz_date,
        )?;

        let url = if canonical_querystring.is_empty() {
            format!("https://{host}{path}")
        } else {
            format!("https://{host}{path}?{canonical_querystring}")
        };

        let mut request = self
            .client
            .get(url)
            .header("X-Amz-Date", &amz_date)
            .header("Authorization", authorization);
        if let Some(token) = &self.credentials.session_token {
            request = request.header("X-Amz-Security-Token", token);
        }

        let response = request.send().await?;
        self.decode_response(service, response).await
    }

    async fn decode_response(&self, service: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Structured errors carry `__type` (target APIs) or `message`.
            if let Ok(error_body) = serde_json::from_str::<Value>(&body) {
                let code = error_body
                    .get("__type")
                    .or_else(|| error_body.get("code"))
                    .and_then(Value::as_str);
                let message = error_body
                    .get("message")
                    .or_else(|| error_body.get("Message"))
                    .and_then(Value::as_str);
                if let (Some(code), Some(message)) = (code, message) {
                    return Err(AwsApiError::ApiResponseError {
                        service: service.to_string(),
                        code: code.to_string(),
                        message: message.to_string(),
                    });
                }
            }
            return Err(AwsApiError::HttpError {
                service: service.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
