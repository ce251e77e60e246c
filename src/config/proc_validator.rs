//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks server / logging / metrics / token settings
//! - Checks every configured URL and the collection custom headers
//! - Warns (does not fail) on credential defaults that requests must supply

use http::{HeaderName, HeaderValue};
use reqwest::Url;
use tracing::{error, info, warn};

use crate::config::service::{PlatformConfig, ServiceConfig};
use crate::config::settings::{LoggingConfig, SettingsConfig};
use crate::credentials::CredentialParameters;
use crate::observability::metrics::get_metrics;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_credentials(&cfg.credentials, &mut errors);
    validate_platform(&cfg.platform, &mut errors);

    if errors.is_empty() {
        info!("config is valid");
        return Ok(());
    }

    let metrics = get_metrics().await;
    for e in &errors {
        error!("config validation: {}", e);
        metrics.config_validation_errors.inc();
    }
    Err(errors)
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port == 0 {
        errors.push("settings.server.port must be greater than 0".to_string());
    }

    if let Some(logging) = &settings.logging {
        validate_logging(logging, errors);
    }

    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }

    if settings.token.freshness_window_seconds == 0 {
        errors.push("settings.token.freshness_window_seconds must be greater than 0".to_string());
    }
    if settings.token.exchange_timeout_ms == 0 {
        errors.push("settings.token.exchange_timeout_ms must be greater than 0".to_string());
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "settings.logging.level '{}' must be one of {:?}",
            logging.level, LOG_LEVELS
        ));
    }
}

fn validate_credentials(credentials: &CredentialParameters, errors: &mut Vec<String>) {
    validate_url("credentials.token_url", &credentials.token_url, errors);

    if credentials.client_id.is_empty() {
        warn!("credentials.client_id is empty; every request must supply CLIENT_ID");
    }
    if credentials.token_url.is_empty() {
        warn!("credentials.token_url is empty; every request must supply TOKEN_URL");
    }
}

fn validate_platform(platform: &PlatformConfig, errors: &mut Vec<String>) {
    validate_url("platform.interact_url", &platform.interact_url, errors);
    validate_url("platform.collection_url", &platform.collection_url, errors);
    validate_url("platform.profile_url", &platform.profile_url, errors);
    validate_url("platform.graphql_url", &platform.graphql_url, errors);
    validate_url("platform.graphql_origin", &platform.graphql_origin, errors);

    if !platform.personalization_pointer.is_empty()
        && !platform.personalization_pointer.starts_with('/')
    {
        errors.push(format!(
            "platform.personalization_pointer '{}' must be a JSON pointer starting with '/'",
            platform.personalization_pointer
        ));
    }

    for (name, value) in &platform.custom_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(format!(
                "platform.custom_headers: '{}' is not a valid header name",
                name
            ));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(format!(
                "platform.custom_headers['{}']: value is not a valid header value",
                name
            ));
        }
    }
}

/// Empty is allowed (may come from request overrides), anything else must be http(s).
fn validate_url(field: &str, value: &str, errors: &mut Vec<String>) {
    if value.is_empty() {
        return;
    }
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!(
            "{} '{}' must use http or https, got '{}'",
            field,
            value,
            url.scheme()
        )),
        Err(e) => errors.push(format!("{} '{}' is not a valid URL: {}", field, value, e)),
    }
}
