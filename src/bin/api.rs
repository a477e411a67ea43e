//! HTTP API Lambda exposing one trigger endpoint per granularity.
//!
//! Business logic lives in `hateburank::api`; this file only adapts
//! `lambda_http` requests and responses.

use hateburank::api::{self, ApiRequest, AppState};
use hateburank::app::build_dispatcher;
use hateburank::config::Config;
use hateburank::publisher::AnyPublisher;
use hateburank::ranking::HatebuRankingSource;
use hateburank::storage::AnyDedupStore;
use lambda_http::{Body, Error, Request, RequestExt, Response, run, service_fn};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env()?;
    let dispatcher = build_dispatcher(&config)
        .await
        .map_err(|e| Error::from(format!("{:#}", e)))?;
    let state = Arc::new(AppState::new(dispatcher, config.schedule));

    run(service_fn(|event| {
        let state = state.clone();
        async move { handler(event, &state).await }
    }))
    .await
}

type State = AppState<HatebuRankingSource, AnyDedupStore, AnyPublisher>;

async fn handler(event: Request, state: &Arc<State>) -> Result<Response<Body>, Error> {
    let query: HashMap<String, String> = event
        .query_string_parameters()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let request = ApiRequest {
        method: event.method().as_str().to_string(),
        path: event.uri().path().to_string(),
        query,
    };

    info!(method = %request.method, path = %request.path, "Handling request");

    let response = api::handle(&request, state).await;

    Ok(Response::builder()
        .status(response.status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Body::from(response.body))?)
}
