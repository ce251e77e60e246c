//! Outbound calls to the platform on behalf of the console: event
//! ingestion (interact / collection surfaces) and profile reads.
//!
//! Every call obtains its bearer token from the [`TokenIssuer`] first; a
//! token failure fails the whole proxied request. Downstream failures never
//! touch the token cache.

pub mod collection;
pub mod interact;
pub mod profile;
pub mod send;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::service::PlatformConfig;
use crate::credentials::resolver::pick;
use crate::credentials::CredentialOverrides;
use crate::error::{body_to_value, ProxyError};
use crate::sources::issuer::TokenIssuer;
use crate::utils::constants::{HEADER_API_KEY, HEADER_ORG_ID, HEADER_SANDBOX_NAME};

/// The console's `envVars` object: credential and platform overrides side by side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestOverrides {
    #[serde(flatten)]
    pub credentials: CredentialOverrides,
    #[serde(flatten)]
    pub platform: PlatformOverrides,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformOverrides {
    #[serde(rename = "ADOBE_URL", default)]
    pub interact_url: Option<String>,
    #[serde(rename = "COLLECTION_URL", default)]
    pub collection_url: Option<String>,
    #[serde(rename = "API_KEY", default)]
    pub api_key: Option<String>,
    #[serde(rename = "ORG_ID", default)]
    pub org_id: Option<String>,
    #[serde(rename = "SANDBOX_NAME", default)]
    pub sandbox_name: Option<String>,
    #[serde(rename = "FLOW_ID", default)]
    pub flow_id: Option<String>,
}

/// Platform values for one request after applying overrides.
#[derive(Debug, Clone)]
pub struct EffectivePlatform {
    pub interact_url: String,
    pub collection_url: String,
    pub api_key: String,
    pub org_id: String,
    pub sandbox_name: String,
    pub flow_id: String,
}

impl EffectivePlatform {
    pub fn resolve(overrides: &PlatformOverrides, defaults: &PlatformConfig) -> Self {
        Self {
            interact_url: pick(&overrides.interact_url, &defaults.interact_url),
            collection_url: pick(&overrides.collection_url, &defaults.collection_url),
            api_key: pick(&overrides.api_key, &defaults.api_key),
            org_id: pick(&overrides.org_id, &defaults.org_id),
            sandbox_name: pick(&overrides.sandbox_name, &defaults.sandbox_name),
            flow_id: pick(&overrides.flow_id, &defaults.flow_id),
        }
    }

    /// Org, api key and sandbox headers shared by every call. Unset (empty)
    /// values are left out; `Authorization` is added once a token is known.
    pub fn common_headers(&self) -> Result<HeaderMap, ProxyError> {
        let mut headers = HeaderMap::new();
        insert_non_empty(&mut headers, HEADER_ORG_ID, &self.org_id)?;
        insert_non_empty(&mut headers, HEADER_API_KEY, &self.api_key)?;
        insert_non_empty(&mut headers, HEADER_SANDBOX_NAME, &self.sandbox_name)?;
        Ok(headers)
    }
}

pub struct Dispatcher {
    client: Client,
    platform: PlatformConfig,
    issuer: Arc<TokenIssuer>,
}

impl Dispatcher {
    pub fn new(client: Client, platform: PlatformConfig, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            client,
            platform,
            issuer,
        }
    }

    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    pub fn platform(&self) -> &PlatformConfig {
        &self.platform
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch the bearer token for `overrides` and add it to `headers`.
    ///
    /// Everything that can turn a request into a 400 must be checked before
    /// this call, so rejected requests never cost a credential exchange.
    pub(crate) async fn authorize(
        &self,
        overrides: &RequestOverrides,
        headers: &mut HeaderMap,
    ) -> Result<String, ProxyError> {
        let token = self.issuer.get_valid_token(&overrides.credentials).await?;
        insert_bearer(headers, &token)?;
        Ok(token)
    }
}

pub(crate) fn insert_bearer(headers: &mut HeaderMap, token: &str) -> Result<(), ProxyError> {
    insert_header(headers, AUTHORIZATION.as_str(), &format!("Bearer {}", token))
}

pub(crate) fn insert_header(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
) -> Result<(), ProxyError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ProxyError::bad_request(format!("Invalid header name '{}'", name)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|_| ProxyError::bad_request(format!("Invalid value for header '{}'", name)))?;
    headers.insert(header_name, header_value);
    Ok(())
}

pub(crate) fn insert_non_empty(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
) -> Result<(), ProxyError> {
    if value.is_empty() {
        return Ok(());
    }
    insert_header(headers, name, value)
}

/// Upstream body as JSON on 2xx, `ProxyError::Upstream` otherwise.
pub(crate) async fn read_upstream(response: Response) -> Result<Value, ProxyError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProxyError::upstream_transport(&e))?;
    if !status.is_success() {
        return Err(ProxyError::upstream_status(status.as_u16(), &body));
    }
    Ok(body_to_value(&body))
}

/// Loose truthiness: `null`, `false`, `0` and `""` count as absent.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric reading of a number or numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// String form used when a JSON scalar ends up in a header or query.
pub fn as_plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
