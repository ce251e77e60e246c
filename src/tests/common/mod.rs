// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::token_cache::TokenCache;
use crate::config::service::PlatformConfig;
use crate::config::settings::{MetricsConfig, ServerConfig, SettingsConfig, TokenSettings};
use crate::credentials::CredentialParameters;
use crate::dispatch::Dispatcher;
use crate::error::body_to_value;
use crate::helpers::time::Clock;
use crate::server::server::{router, AppState};
use crate::sources::issuer::TokenIssuer;

pub const CLIENT_A: &str = "client-A";
pub const SECRET_A: &str = "secret-A";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Clock the test moves by hand.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(clock_start()),
        })
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

/// t=0 of every [`ManualClock`].
pub fn clock_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Scripted client-credentials endpoint.
///
/// Answers `POST /token` with the scripted responses in order; the last one
/// repeats. Every submitted form is recorded. `POST /slow` never answers
/// in time.
pub struct TokenEndpoint {
    responses: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<HashMap<String, String>>>,
}

impl TokenEndpoint {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> (u16, String) {
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap_or((500, String::new()))
        }
    }
}

pub fn token_body(token: &str) -> String {
    json!({ "access_token": token, "token_type": "bearer", "expires_in": 86399 }).to_string()
}

pub async fn spawn_token_endpoint(
    responses: Vec<(u16, String)>,
) -> (JoinHandle<()>, String, Arc<TokenEndpoint>) {
    let endpoint = Arc::new(TokenEndpoint {
        responses: Mutex::new(responses.into()),
        requests: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .route("/token", post(issue_token))
        .route("/slow", post(slow_token))
        .with_state(endpoint.clone());
    let (handle, addr) = spawn_axum(router).await;
    (handle, format!("http://{}/token", addr), endpoint)
}

async fn issue_token(
    State(endpoint): State<Arc<TokenEndpoint>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    endpoint.requests.lock().unwrap().push(form);
    let (status, body) = endpoint.next_response();
    let status = StatusCode::from_u16(status).unwrap();
    (status, [("content-type", "application/json")], body).into_response()
}

async fn slow_token() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    (StatusCode::OK, token_body("too-late")).into_response()
}

pub fn credential_defaults(token_url: &str) -> CredentialParameters {
    CredentialParameters {
        client_id: CLIENT_A.to_owned(),
        client_secret: SECRET_A.to_owned(),
        token_url: token_url.to_owned(),
        grant_type: "client_credentials".to_owned(),
        scope: "openid,AdobeID".to_owned(),
    }
}

pub fn build_issuer(defaults: CredentialParameters, clock: Arc<ManualClock>) -> TokenIssuer {
    build_issuer_with_timeout(defaults, clock, Duration::from_secs(5))
}

pub fn build_issuer_with_timeout(
    defaults: CredentialParameters,
    clock: Arc<ManualClock>,
    timeout: Duration,
) -> TokenIssuer {
    let cache = TokenCache::with_clock(TimeDelta::hours(24), clock);
    TokenIssuer::new(Client::new(), defaults, cache, timeout)
}

/// One request as seen by [`FakePlatform`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body: Value,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Stand-in for the platform APIs: records every request and answers with
/// the response configured for its path (404 otherwise).
#[derive(Default)]
pub struct FakePlatform {
    responses: Mutex<HashMap<String, (u16, Value)>>,
    recorded: Mutex<Vec<Recorded>>,
}

impl FakePlatform {
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_owned(), (status, body));
    }

    pub fn recorded(&self, path: &str) -> Vec<Recorded> {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

async fn platform_handler(
    State(platform): State<Arc<FakePlatform>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let path = uri.path().to_owned();
    platform.recorded.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        headers,
        query,
        body: body_to_value(&body),
    });
    match platform.responses.lock().unwrap().get(&path).cloned() {
        Some((status, body)) => {
            (StatusCode::from_u16(status).unwrap(), axum::Json(body)).into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

pub struct ConsoleHarness {
    pub base_url: String,
    pub token_endpoint: Arc<TokenEndpoint>,
    pub platform: Arc<FakePlatform>,
    pub issuer: Arc<TokenIssuer>,
    pub client: Client,
    handles: Vec<JoinHandle<()>>,
}

impl ConsoleHarness {
    /// Console API wired to a scripted token endpoint and a fake platform.
    pub async fn start(token_responses: Vec<(u16, String)>) -> Self {
        let (token_handle, token_url, token_endpoint) =
            spawn_token_endpoint(token_responses).await;

        let platform = Arc::new(FakePlatform::default());
        let platform_router = Router::new()
            .fallback(platform_handler)
            .with_state(platform.clone());
        let (platform_handle, platform_addr) = spawn_axum(platform_router).await;
        let platform_url = format!("http://{}", platform_addr);

        let platform_config = PlatformConfig {
            interact_url: format!("{}/interact", platform_url),
            collection_url: format!("{}/collection", platform_url),
            profile_url: format!("{}/profile", platform_url),
            graphql_url: format!("{}/graphql", platform_url),
            org_id: "org@AdobeOrg".to_owned(),
            api_key: "api-key".to_owned(),
            sandbox_name: "dev".to_owned(),
            flow_id: "flow-default".to_owned(),
            personalization_pointer: "/_tenant/journeyOptimizer/customPersonalization".to_owned(),
            custom_headers: HashMap::from([("x-config-header".to_owned(), "cfg".to_owned())]),
            ..PlatformConfig::default()
        };

        let issuer = Arc::new(build_issuer(credential_defaults(&token_url), ManualClock::new()));
        let dispatcher = Dispatcher::new(Client::new(), platform_config, issuer.clone());
        let state = AppState::new(Arc::new(dispatcher)).await;
        let settings = test_settings();
        let (app_handle, app_addr) = spawn_axum(router(&settings, state)).await;

        Self {
            base_url: format!("http://{}", app_addr),
            token_endpoint,
            platform,
            issuer,
            client: Client::new(),
            handles: vec![token_handle, platform_handle, app_handle],
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .expect("console request");
        let status = response.status().as_u16();
        let text = response.text().await.expect("console body");
        (status, body_to_value(&text))
    }
}

impl Drop for ConsoleHarness {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

pub fn test_settings() -> SettingsConfig {
    SettingsConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        },
        metrics: MetricsConfig {
            path: "/metrics".to_owned(),
            is_enabled: true,
        },
        token: TokenSettings::default(),
        logging: None,
    }
}
