use reqwest::header::{ACCEPT, CONTENT_TYPE, ORIGIN, REFERER};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::dispatch::{
    as_plain_string, insert_bearer, insert_header, insert_non_empty, is_truthy, read_upstream,
    Dispatcher, EffectivePlatform, RequestOverrides,
};
use crate::error::ProxyError;
use crate::utils::constants::HEADER_API_KEY;

const PROFILE_SCHEMA: &str = "_xdm.context.profile";
const EVENT_SCHEMA: &str = "_xdm.context.experienceevent";
const EVENTS_PAGE_LIMIT: u32 = 25;
const EVENTS_QUERY: &str = "query profileExperienceEvent($page: PageInput!, $params: ProfileExperienceEventInput!) {\n  profileExperienceEvent(page: $page, params: $params) {\n    children\n    _links\n    __typename\n  }\n}\n";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[serde(default)]
    pub client_id: Option<Value>,
    #[serde(default)]
    pub env_vars: Option<RequestOverrides>,
}

/// Experience events for one profile plus the diagnostics shown when
/// there are none.
#[derive(Debug, Default)]
pub struct ProfileEvents {
    pub events: Vec<Value>,
    pub debug: Value,
}

impl Dispatcher {
    /// Read the profile for `clientId` and attach its recent experience events.
    pub async fn profile(&self, body: Value) -> Result<Value, ProxyError> {
        let request: ProfileRequest = serde_json::from_value(body)
            .map_err(|e| ProxyError::bad_request(format!("Invalid request body: {}", e)))?;
        let client_id = request
            .client_id
            .as_ref()
            .filter(|id| is_truthy(id))
            .map(as_plain_string)
            .ok_or_else(|| ProxyError::bad_request("clientId is required"))?;

        let overrides = request.env_vars.unwrap_or_default();
        let platform = EffectivePlatform::resolve(&overrides.platform, self.platform());
        let mut headers = platform.common_headers()?;
        insert_header(&mut headers, ACCEPT.as_str(), "application/json")?;
        let token = self.authorize(&overrides, &mut headers).await?;

        info!("reading profile for client '{}'", client_id);
        let response = self
            .client()
            .get(&self.platform().profile_url)
            .query(&[
                ("schema.name", PROFILE_SCHEMA),
                ("entityIdNS", "clientId"),
                ("entityId", client_id.as_str()),
            ])
            .headers(headers)
            .send()
            .await
            .map_err(|e| ProxyError::upstream_transport(&e))?;
        let entities = read_upstream(response).await?;

        // the entity key is opaque; take the first one
        let Some((entity_key, entity_data)) = entities.as_object().and_then(|m| m.iter().next())
        else {
            return Ok(no_profile());
        };
        let Some(entity) = entity_data.get("entity").filter(|e| is_truthy(e)) else {
            return Ok(no_profile());
        };

        let merge_policy_id = entity_data
            .pointer("/mergePolicy/id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(self.platform().default_merge_policy_id.as_str())
            .to_owned();
        let ProfileEvents {
            events,
            debug: diagnostics,
        } = self
            .profile_events(&token, &platform, entity_key, &merge_policy_id)
            .await;

        Ok(json!({
            "email": field(entity, "/personalEmail/address"),
            "firstName": field(entity, "/person/name/firstName"),
            "lastName": field(entity, "/person/name/lastName"),
            "middleName": field(entity, "/person/name/middleName"),
            "clientId": field(entity, "/identityMap/clientid/0/id"),
            "customPersonalization": field(entity, &self.platform().personalization_pointer),
            "events": events,
            "debug": diagnostics,
        }))
    }

    /// Never fails: problems end up in `debug`.
    async fn profile_events(
        &self,
        token: &str,
        platform: &EffectivePlatform,
        profile_id: &str,
        merge_policy_id: &str,
    ) -> ProfileEvents {
        let body = json!({
            "operationName": "profileExperienceEvent",
            "variables": {
                "params": {
                    "mergePolicyId": merge_policy_id,
                    "profileId": profile_id,
                    "schemaName": EVENT_SCHEMA,
                    "relatedSchemaName": PROFILE_SCHEMA
                },
                "page": {
                    "limit": EVENTS_PAGE_LIMIT,
                    "start": 1
                }
            },
            "query": EVENTS_QUERY
        });

        info!("fetching events for profile '{}'", profile_id);
        let result = self.post_events_query(token, platform, &body).await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("fetching events for profile '{}' failed: {}", profile_id, e);
                let error = match e {
                    ProxyError::Upstream { message, details, .. } if details.is_null() => {
                        Value::String(message)
                    }
                    ProxyError::Upstream { details, .. } => details,
                    other => Value::String(other.to_string()),
                };
                return ProfileEvents {
                    events: Vec::new(),
                    debug: json!({
                        "message": "Exception caught",
                        "error": error,
                        "profileIdUsed": profile_id,
                    }),
                };
            }
        };

        let events = response
            .pointer("/data/profileExperienceEvent/children")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if !events.is_empty() {
            return ProfileEvents {
                events,
                debug: Value::Null,
            };
        }

        let errors = response.get("errors").cloned().unwrap_or(Value::Null);
        let message = if is_truthy(&errors) {
            "GraphQL Errors"
        } else {
            "No events returned"
        };
        let diagnostics = json!({
            "message": message,
            "errors": errors,
            "profileIdUsed": profile_id,
            "mergePolicyIdUsed": merge_policy_id,
            "sandbox": platform.sandbox_name,
            "orgId": platform.org_id,
        });
        info!("no events for profile '{}': {}", profile_id, diagnostics);
        ProfileEvents {
            events,
            debug: diagnostics,
        }
    }

    async fn post_events_query(
        &self,
        token: &str,
        platform: &EffectivePlatform,
        body: &Value,
    ) -> Result<Value, ProxyError> {
        let headers = self.events_headers(token, platform)?;
        let response = self
            .client()
            .post(&self.platform().graphql_url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ProxyError::upstream_transport(&e))?;
        read_upstream(response).await
    }

    fn events_headers(
        &self,
        token: &str,
        platform: &EffectivePlatform,
    ) -> Result<reqwest::header::HeaderMap, ProxyError> {
        let origin = self.platform().graphql_origin.trim_end_matches('/');
        let mut headers = platform.common_headers()?;
        insert_bearer(&mut headers, token)?;
        insert_header(&mut headers, CONTENT_TYPE.as_str(), "application/json")?;
        insert_non_empty(&mut headers, HEADER_API_KEY, &self.platform().graphql_api_key)?;
        insert_non_empty(&mut headers, ORIGIN.as_str(), origin)?;
        if !origin.is_empty() {
            insert_header(&mut headers, REFERER.as_str(), &format!("{}/", origin))?;
        }
        Ok(headers)
    }
}

fn no_profile() -> Value {
    json!({ "message": "No profile data found" })
}

/// Truthy value at `pointer`, else `null`. An empty pointer yields `null`.
fn field(entity: &Value, pointer: &str) -> Value {
    if pointer.is_empty() {
        return Value::Null;
    }
    entity
        .pointer(pointer)
        .filter(|value| is_truthy(value))
        .cloned()
        .unwrap_or(Value::Null)
}
