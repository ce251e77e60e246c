use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token cache metrics
    pub token_cache_lookups: IntCounterVec,
    pub cached_identities: IntGauge,

    // Credential exchange metrics
    pub token_exchange_requests: IntCounterVec,
    pub token_exchange_failures: IntCounterVec,
    pub token_exchange_duration: HistogramVec,

    // Proxy metrics
    pub proxy_requests: IntCounterVec,
    pub proxy_failures: IntCounterVec,
    pub proxy_duration: HistogramVec,

    // Config/runtime
    pub parse_failures: IntCounter,
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("eventconsole".into()), None)
            .expect("metrics registry prefix is valid");

        Arc::new(Self {
            // Cache
            token_cache_lookups: register(&registry, IntCounterVec::new(Opts::new("token_cache_lookups_total", "Token cache lookups by result"), &["result"])),
            cached_identities: register(&registry, IntGauge::new("cached_identities", "Credential identities holding a cached token")),

            // Exchange
            token_exchange_requests: register(&registry, IntCounterVec::new(Opts::new("token_exchange_requests_total", "Credential exchange attempts by credential source"), &["credentials"])),
            token_exchange_failures: register(&registry, IntCounterVec::new(Opts::new("token_exchange_failures_total", "Credential exchange failures by reason"), &["credentials", "reason"])),
            token_exchange_duration: register(&registry, HistogramVec::new(HistogramOpts::new("token_exchange_duration_seconds", "Credential exchange duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["credentials"])),

            // Proxy
            proxy_requests: register(&registry, IntCounterVec::new(Opts::new("proxy_requests_total", "Proxied requests received by route"), &["route"])),
            proxy_failures: register(&registry, IntCounterVec::new(Opts::new("proxy_failures_total", "Proxied request failures"), &["route", "reason"])),
            proxy_duration: register(&registry, HistogramVec::new(HistogramOpts::new("proxy_duration_seconds", "Proxied request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["route"])),

            // Config/runtime
            parse_failures: register(&registry, IntCounter::new("config_parse_failures_total", "Config file parse failures")),
            config_validation_errors: register(&registry, IntCounter::new("config_validation_errors_total", "Validation errors during startup")),
            up: register(&registry, IntGauge::new("up", "1 if service is serving")),

            registry,
        })
    }
}

fn register<C>(registry: &Registry, collector: prometheus::Result<C>) -> C
where
    C: Collector + Clone + 'static,
{
    let collector = collector.expect("metric definition is valid");
    registry
        .register(Box::new(collector.clone()))
        .expect("metric names are unique");
    collector
}
