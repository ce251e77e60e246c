use serde::Deserialize;
use std::fmt;

/// Effective parameters for one client-credentials grant.
///
/// Also the shape of the process-wide `credentials` config section, where
/// every field may be left empty and supplied per request instead.
#[derive(Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialParameters {
    /// Credential identity; the token cache key.
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub grant_type: String,
    pub scope: String,
}

impl CredentialParameters {
    pub fn identity(&self) -> &str {
        &self.client_id
    }
}

impl fmt::Debug for CredentialParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialParameters")
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("token_url", &self.token_url)
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Request-scoped credential overrides, as sent by the console in `envVars`.
#[derive(Deserialize, Clone, Default)]
pub struct CredentialOverrides {
    #[serde(rename = "CLIENT_ID", default)]
    pub client_id: Option<String>,
    #[serde(rename = "CLIENT_SECRET", default)]
    pub client_secret: Option<String>,
    #[serde(rename = "TOKEN_URL", default)]
    pub token_url: Option<String>,
    #[serde(rename = "GRANT_TYPE", default)]
    pub grant_type: Option<String>,
    #[serde(rename = "SCOPE", default)]
    pub scope: Option<String>,
}

impl fmt::Debug for CredentialOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialOverrides")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_deref().map(redacted))
            .field("token_url", &self.token_url)
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Field-by-field: a present, non-empty override wins, else the default.
///
/// Missing required values are not checked here; they surface as an
/// exchange failure.
pub fn resolve(
    overrides: &CredentialOverrides,
    defaults: &CredentialParameters,
) -> CredentialParameters {
    CredentialParameters {
        client_id: pick(&overrides.client_id, &defaults.client_id),
        client_secret: pick(&overrides.client_secret, &defaults.client_secret),
        token_url: pick(&overrides.token_url, &defaults.token_url),
        grant_type: pick(&overrides.grant_type, &defaults.grant_type),
        scope: pick(&overrides.scope, &defaults.scope),
    }
}

pub fn pick(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_owned()
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "***"
    }
}
