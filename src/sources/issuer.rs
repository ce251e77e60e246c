use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::cache::token_cache::TokenCache;
use crate::credentials::{resolve, CredentialOverrides, CredentialParameters};
use crate::error::CredentialExchangeFailure;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::sources::client_credentials::exchange;

static HIT_MSG: &str = "hit";
static MISS_MSG: &str = "miss";
static DEFAULT_CREDENTIALS: &str = "default";
static OVERRIDE_CREDENTIALS: &str = "override";

/// Hands out a valid bearer token per credential identity, exchanging
/// client credentials only when the cache has nothing fresh.
///
/// Concurrent callers that all miss each run their own exchange; the last
/// `put` wins. Both tokens are valid for the identity.
pub struct TokenIssuer {
    client: Client,
    defaults: CredentialParameters,
    cache: TokenCache,
    exchange_timeout: Duration,
}

impl TokenIssuer {
    pub fn new(
        client: Client,
        defaults: CredentialParameters,
        cache: TokenCache,
        exchange_timeout: Duration,
    ) -> Self {
        Self {
            client,
            defaults,
            cache,
            exchange_timeout,
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn defaults(&self) -> &CredentialParameters {
        &self.defaults
    }

    pub async fn get_valid_token(
        &self,
        overrides: &CredentialOverrides,
    ) -> Result<String, CredentialExchangeFailure> {
        let params = resolve(overrides, &self.defaults);
        let identity = params.identity();
        let metrics = get_metrics().await;

        if let Some(cached) = self.cache.get_fresh(identity).await {
            metrics.token_cache_lookups.with_label_values(&[HIT_MSG]).inc();
            debug!("using cached token for client '{}'", identity);
            return Ok(cached.value);
        }
        metrics.token_cache_lookups.with_label_values(&[MISS_MSG]).inc();

        // label by credential source, never by the request-supplied identity
        let source = if identity == self.defaults.identity() {
            DEFAULT_CREDENTIALS
        } else {
            OVERRIDE_CREDENTIALS
        };
        info!("fetching new token for client '{}'", identity);
        metrics.token_exchange_requests.with_label_values(&[source]).inc();
        let start = get_instant();
        let result = exchange(&self.client, &params, self.exchange_timeout).await;
        metrics
            .token_exchange_duration
            .with_label_values(&[source])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(token) => {
                let cached = self.cache.put(identity, token).await;
                info!(
                    "new token for client '{}' cached at {}",
                    identity, cached.acquired_at
                );
                Ok(cached.value)
            }
            Err(failure) => {
                error!(
                    "token exchange for client '{}' failed: {} ({})",
                    identity, failure.message, failure.upstream_details
                );
                metrics
                    .token_exchange_failures
                    .with_label_values(&[source, failure.reason()])
                    .inc();
                Err(failure)
            }
        }
    }
}
