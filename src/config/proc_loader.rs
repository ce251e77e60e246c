use crate::config::proc_validator;
use crate::config::service::ServiceConfig;
use crate::config::settings::LoggingConfig;
use crate::observability::metrics::get_metrics;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::path::Path;
use tracing::{debug, error};

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read config file {}", path.display()))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(&content).inspect_err(|e| {
        error!("parse config error: {}", e);
        metrics.parse_failures.inc();
    })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::default());
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| anyhow!("config is not valid: {}", errors.join("; ")))?;

    Ok(service_config)
}

/// Replace `${VAR}` / `${VAR:default}` with the environment value.
/// Unset variables without a default become empty.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var)
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())
    });
    Ok(expanded.into_owned())
}
