use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::credentials::CredentialParameters;
use crate::error::CredentialExchangeFailure;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// One client-credentials grant: form-encoded POST to `token_url`,
/// `access_token` read from the JSON answer. Single attempt.
pub async fn exchange(
    client: &Client,
    params: &CredentialParameters,
    timeout: Duration,
) -> Result<String, CredentialExchangeFailure> {
    let form = [
        ("client_id", params.client_id.as_str()),
        ("client_secret", params.client_secret.as_str()),
        ("grant_type", params.grant_type.as_str()),
        ("scope", params.scope.as_str()),
    ];

    let response = client
        .post(&params.token_url)
        .timeout(timeout)
        .form(&form)
        .send()
        .await
        .map_err(|e| CredentialExchangeFailure::transport(&e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| CredentialExchangeFailure::transport(&e))?;

    if !status.is_success() {
        return Err(CredentialExchangeFailure::rejected(status.as_u16(), &body));
    }

    serde_json::from_str::<TokenResponse>(&body)
        .ok()
        .and_then(|parsed| parsed.access_token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CredentialExchangeFailure::malformed(status.as_u16(), &body))
}
