use serde::Deserialize;
use serde_json::{Map, Value};

use crate::dispatch::{as_number, is_truthy, Dispatcher, RequestOverrides};
use crate::error::ProxyError;
use crate::utils::constants::{REQUEST_TYPE_COLLECTION, REQUEST_TYPE_INTERACT};

/// Inbound `/api/send` body. Unknown fields are kept in the raw body and
/// travel with collection payloads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(default)]
    pub client_id: Option<Value>,
    #[serde(default)]
    pub variation: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub custom_headers: Option<Map<String, Value>>,
    #[serde(default)]
    pub env_vars: Option<RequestOverrides>,
    #[serde(default)]
    pub request_type: Option<String>,
    #[serde(default)]
    pub kafka_topic: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Interact,
    Collection,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Interact => REQUEST_TYPE_INTERACT,
            Surface::Collection => REQUEST_TYPE_COLLECTION,
        }
    }
}

impl SendRequest {
    pub fn from_body(body: &Value) -> Result<Self, ProxyError> {
        if !body.is_object() {
            return Err(ProxyError::bad_request("Request body must be a JSON object"));
        }
        serde_json::from_value(body.clone())
            .map_err(|e| ProxyError::bad_request(format!("Invalid request body: {}", e)))
    }

    /// Root `kafkaTopic` forces collection; then `requestType`; then
    /// `variation >= 5 && variation != 8` means collection.
    pub fn surface(&self) -> Surface {
        if self.kafka_topic.as_ref().is_some_and(is_truthy) {
            return Surface::Collection;
        }
        if let Some(request_type) = self.request_type.as_deref().filter(|t| !t.is_empty()) {
            return if request_type == REQUEST_TYPE_COLLECTION {
                Surface::Collection
            } else {
                Surface::Interact
            };
        }
        match self.variation.as_ref().and_then(as_number) {
            Some(variation) if variation >= 5.0 && variation != 8.0 => Surface::Collection,
            _ => Surface::Interact,
        }
    }

    pub fn overrides(&self) -> RequestOverrides {
        self.env_vars.clone().unwrap_or_default()
    }
}

impl Dispatcher {
    /// Route one console event to the interact or collection surface.
    pub async fn send(&self, body: Value) -> Result<(Surface, Value), ProxyError> {
        let request = SendRequest::from_body(&body)?;
        let surface = request.surface();
        let response = match surface {
            Surface::Interact => self.send_interact(&request).await?,
            Surface::Collection => self.send_collection(&request, body).await?,
        };
        Ok((surface, response))
    }
}
