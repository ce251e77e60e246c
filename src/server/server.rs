use anyhow::{Context, Result};
use axum::Router;
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cache::token_cache::TokenCache;
use crate::config::settings::SettingsConfig;
use crate::dispatch::Dispatcher;
use crate::helpers::time::get_freshness_window;
use crate::observability::metrics::get_metrics;
use crate::observability::routes::MetricsState;
use crate::server::routes;
use crate::sources::issuer::TokenIssuer;
use crate::ServiceConfig;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub async fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let metrics = get_metrics().await;
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            dispatcher,
        }
    }

    /// Wire the token cache, issuer and dispatcher for one process lifetime.
    pub async fn build(service_config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        let token_settings = &service_config.settings.token;
        let cache = TokenCache::new(get_freshness_window(Some(
            token_settings.freshness_window_seconds,
        )));
        let issuer = Arc::new(TokenIssuer::new(
            client.clone(),
            service_config.credentials.clone(),
            cache,
            Duration::from_millis(token_settings.exchange_timeout_ms),
        ));
        let dispatcher = Dispatcher::new(client, service_config.platform.clone(), issuer);
        Ok(Self::new(Arc::new(dispatcher)).await)
    }
}

pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(routes::router())
        .with_state(state)
}

/// Serve the console API until `shutdown` resolves.
pub async fn start<F>(settings_config: &SettingsConfig, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics = get_metrics().await;
    let app = router(settings_config, state);

    let bind_addr = settings_config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;
    info!("listening on http://{}", bind_addr);

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server failed")?;
    metrics.up.set(0);

    Ok(())
}
