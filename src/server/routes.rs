use axum::{extract::State, response::IntoResponse, response::Response, routing::post, Json, Router};
use serde_json::Value;
use tracing::{error, info};

use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::server::server::AppState;

pub static SEND_ROUTE: &str = "/api/send";
pub static PROFILE_ROUTE: &str = "/api/profile";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(SEND_ROUTE, post(send))
        .route(PROFILE_ROUTE, post(profile))
}

async fn send(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let metrics = get_metrics().await;
    let start = get_instant();
    metrics.proxy_requests.with_label_values(&[SEND_ROUTE]).inc();
    info!("received send request");

    let result = state.dispatcher.send(body).await;
    metrics
        .proxy_duration
        .with_label_values(&[SEND_ROUTE])
        .observe(start.elapsed().as_secs_f64());

    match result {
        Ok((surface, response)) => {
            info!("send request delivered to the {} surface", surface.as_str());
            Json(response).into_response()
        }
        Err(e) => {
            error!("error processing send request: {}", e);
            metrics
                .proxy_failures
                .with_label_values(&[SEND_ROUTE, e.reason()])
                .inc();
            e.into_response()
        }
    }
}

async fn profile(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let metrics = get_metrics().await;
    let start = get_instant();
    metrics.proxy_requests.with_label_values(&[PROFILE_ROUTE]).inc();

    let result = state.dispatcher.profile(body).await;
    metrics
        .proxy_duration
        .with_label_values(&[PROFILE_ROUTE])
        .observe(start.elapsed().as_secs_f64());

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!("error fetching profile: {}", e);
            metrics
                .proxy_failures
                .with_label_values(&[PROFILE_ROUTE, e.reason()])
                .inc();
            e.into_response()
        }
    }
}
