use serde::Deserialize;
use std::collections::HashMap;

use crate::config::settings::SettingsConfig;
use crate::credentials::CredentialParameters;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    /// process-wide credential defaults; request overrides win
    #[serde(default)]
    pub credentials: CredentialParameters,
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// ================================
/// Platform (outbound call targets)
/// ================================
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlatformConfig {
    /// interact (edge) event ingestion endpoint
    pub interact_url: String,
    /// collection (streaming) ingestion endpoint
    pub collection_url: String,
    pub profile_url: String,
    pub graphql_url: String,
    pub org_id: String,
    pub api_key: String,
    pub sandbox_name: String,
    pub flow_id: String,
    /// api key the profile events GraphQL endpoint expects
    pub graphql_api_key: String,
    /// sent as `Origin`, and with a trailing slash as `Referer`
    pub graphql_origin: String,
    pub default_merge_policy_id: String,
    /// JSON pointer into the profile entity
    pub personalization_pointer: String,
    /// extra headers for collection calls; request headers win
    pub custom_headers: HashMap<String, String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            interact_url: String::new(),
            collection_url: String::new(),
            profile_url: "https://platform.adobe.io/data/core/ups/access/entities".to_owned(),
            graphql_url: "https://platform.adobe.io/data/xql/graphql".to_owned(),
            org_id: String::new(),
            api_key: String::new(),
            sandbox_name: String::new(),
            flow_id: String::new(),
            graphql_api_key: "acp_ui_platform".to_owned(),
            graphql_origin: "https://experience.adobe.com".to_owned(),
            default_merge_policy_id: "d6419369-aef2-4c60-a856-5d91ce6a68eb".to_owned(),
            personalization_pointer: "/_mapfretechsa/journeyOptimizer/customPersonalization"
                .to_owned(),
            custom_headers: HashMap::new(),
        }
    }
}
