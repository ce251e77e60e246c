use reqwest::header::{HeaderMap, CACHE_CONTROL, CONTENT_TYPE};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::dispatch::send::SendRequest;
use crate::dispatch::{
    as_plain_string, insert_header, insert_non_empty, is_truthy, read_upstream, Dispatcher,
    EffectivePlatform,
};
use crate::error::ProxyError;
use crate::utils::constants::HEADER_FLOW_ID;

/// Console-only fields stripped before forwarding.
const CONSOLE_FIELDS: [&str; 3] = ["requestType", "variation", "envVars"];
const ID_CLIENTE: &str = "idCliente";

/// Collection payload: `data` when given, else the whole inbound body,
/// minus console fields, with a truthy `idCliente` coerced to a number.
pub fn build_collection_payload(
    data: Option<&Value>,
    body: Value,
) -> Result<Map<String, Value>, ProxyError> {
    let source = match data {
        Some(data) if is_truthy(data) => data.clone(),
        _ => body,
    };
    let Value::Object(mut payload) = source else {
        return Err(ProxyError::bad_request(
            "Collection payload must be a JSON object",
        ));
    };

    for field in CONSOLE_FIELDS {
        payload.remove(field);
    }

    if let Some(id) = payload.get_mut(ID_CLIENTE) {
        if is_truthy(id) {
            *id = coerce_number(id);
        }
    }
    Ok(payload)
}

/// Integer when the value reads as one, float otherwise, `null` when not numeric.
fn coerce_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::Bool(b) => Value::from(u8::from(*b)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Value::from(0);
            }
            if let Ok(int) = trimmed.parse::<i64>() {
                return Value::from(int);
            }
            match trimmed.parse::<f64>() {
                Ok(float) if is_whole(float) => Value::from(float as i64),
                Ok(float) => Number::from_f64(float)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                Err(_) => Value::Null,
            }
        }
        _ => Value::Null,
    }
}

/// `1e3` and `42.0` read as integers.
fn is_whole(float: f64) -> bool {
    float.is_finite()
        && float.fract() == 0.0
        && float >= i64::MIN as f64
        && float < i64::MAX as f64
}

/// Configured `custom_headers`, then the request's `customHeaders` (later wins).
fn custom_headers(
    configured: &HashMap<String, String>,
    requested: Option<&Map<String, Value>>,
) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::new();
    for (name, value) in configured {
        insert_header(&mut headers, name, value)?;
    }
    for (name, value) in requested.into_iter().flatten() {
        insert_header(&mut headers, name, &as_plain_string(value))?;
    }
    Ok(headers)
}

impl Dispatcher {
    pub(crate) async fn send_collection(
        &self,
        request: &SendRequest,
        body: Value,
    ) -> Result<Value, ProxyError> {
        let payload = build_collection_payload(request.data.as_ref(), body)?;
        let extra_headers =
            custom_headers(&self.platform().custom_headers, request.custom_headers.as_ref())?;

        let overrides = request.overrides();
        let platform = EffectivePlatform::resolve(&overrides.platform, self.platform());
        let mut headers = platform.common_headers()?;
        insert_non_empty(&mut headers, HEADER_FLOW_ID, &platform.flow_id)?;
        insert_header(&mut headers, CONTENT_TYPE.as_str(), "application/json")?;
        insert_header(&mut headers, CACHE_CONTROL.as_str(), "no-cache")?;
        for (name, value) in extra_headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        self.authorize(&overrides, &mut headers).await?;

        let topic = payload.get("kafkaTopic").map(as_plain_string).unwrap_or_default();
        let dumped = Value::Object(payload.clone());
        debug!("collection payload: {}", dumped);
        info!("sending collection payload, kafkaTopic: {}", topic);
        let response = self
            .client()
            .post(&platform.collection_url)
            .headers(headers)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProxyError::upstream_transport(&e))?;
        read_upstream(response).await
    }
}
