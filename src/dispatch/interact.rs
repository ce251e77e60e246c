use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tracing::info;

use crate::dispatch::send::SendRequest;
use crate::dispatch::{insert_header, is_truthy, read_upstream, Dispatcher, EffectivePlatform};
use crate::error::ProxyError;

const IMPRESSION_ID: &str = "1234";
const IMPRESSION_TYPE: &str = "app:ventajas y beneficios:home:si";
const PAGE_URL: &str = "https://www.verti.es/hipotecas/seguros-de-hogar";
const PAGE_NAME: &str = "seguros-de-hogar";

/// Interact event variations understood by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractVariation {
    Display,
    PageView,
    Dismiss,
    Interact,
}

impl InteractVariation {
    /// 1..=4. Numbers are truncated; strings are read up to the first
    /// non-digit, so `"2abc"` is 2.
    pub fn from_value(value: Option<&Value>) -> Option<Self> {
        let number = match value? {
            Value::Number(n) => n.as_f64()?.trunc() as i64,
            Value::String(s) => leading_integer(s)?,
            _ => return None,
        };
        match number {
            1 => Some(Self::Display),
            2 => Some(Self::PageView),
            3 => Some(Self::Dismiss),
            4 => Some(Self::Interact),
            _ => None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Display => "inappmessageTracking.display",
            Self::PageView => "web.webpagedetails.pageViews",
            Self::Dismiss => "inappmessageTracking.dismissals",
            Self::Interact => "inappmessageTracking.interact",
        }
    }

    /// Full interact request body for `client_id`, stamped with `timestamp`.
    pub fn event(&self, client_id: &Value, timestamp: DateTime<Utc>) -> Value {
        let mut xdm = json!({
            "identityMap": {
                "clientId": [
                    {
                        "id": client_id,
                        "authenticatedState": "authenticated",
                        "primary": true
                    }
                ]
            },
            "eventType": self.event_type(),
        });

        let (key, detail) = match self {
            Self::Display => (
                "alerts",
                json!({
                    "clicks": 1,
                    "impressions": [{ "ID": IMPRESSION_ID, "displays": 1, "type": IMPRESSION_TYPE }]
                }),
            ),
            Self::PageView => (
                "web",
                json!({
                    "webPageDetails": {
                        "pageViews": { "value": 1 },
                        "isHomePage": true,
                        "URL": PAGE_URL,
                        "name": PAGE_NAME
                    }
                }),
            ),
            Self::Dismiss => (
                "alerts",
                json!({
                    "clicks": 1,
                    "dismissals": 1,
                    "impressions": [{ "ID": IMPRESSION_ID, "type": IMPRESSION_TYPE }]
                }),
            ),
            Self::Interact => (
                "alerts",
                json!({
                    "clicks": 1,
                    "impressions": [{ "ID": IMPRESSION_ID, "selected": 1, "type": IMPRESSION_TYPE }]
                }),
            ),
        };
        xdm[key] = detail;
        xdm["timestamp"] = Value::String(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true));

        json!({ "event": { "xdm": xdm } })
    }
}

/// Optional sign followed by at least one digit, after leading whitespace.
fn leading_integer(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let unsigned = trimmed.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(trimmed);
    let digits = unsigned.len() - unsigned.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let sign_len = trimmed.len() - unsigned.len();
    trimmed[..sign_len + digits].parse().ok()
}

impl Dispatcher {
    pub(crate) async fn send_interact(&self, request: &SendRequest) -> Result<Value, ProxyError> {
        let client_id = request
            .client_id
            .as_ref()
            .filter(|id| is_truthy(id))
            .ok_or_else(|| ProxyError::bad_request("Client ID is required"))?;
        let variation = InteractVariation::from_value(request.variation.as_ref())
            .ok_or_else(|| ProxyError::bad_request("Invalid variation"))?;

        let overrides = request.overrides();
        let platform = EffectivePlatform::resolve(&overrides.platform, self.platform());
        let mut headers = platform.common_headers()?;
        insert_header(&mut headers, CONTENT_TYPE.as_str(), "application/json")?;
        self.authorize(&overrides, &mut headers).await?;

        let body = variation.event(client_id, Utc::now());

        info!("sending interact event '{}'", variation.event_type());
        let response = self
            .client()
            .post(&platform.interact_url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProxyError::upstream_transport(&e))?;
        read_upstream(response).await
    }
}
