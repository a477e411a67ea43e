//! HTTP entry points, one per granularity.
//!
//! Framework-agnostic: accepts `ApiRequest`, returns `ApiResponse`.
//! The Lambda entry point in `src/bin/api.rs` adapts `lambda_http` types to/from
//! these and calls `handle`.

mod handlers;

use crate::config::CategorySchedule;
use crate::dispatcher::Dispatcher;
use crate::publisher::Publisher;
use crate::ranking::RankingSource;
use crate::storage::DedupStore;
use crate::types::Granularity;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Request / Response types
// ============================================================================

pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
}

#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

// ============================================================================
// Application state
// ============================================================================

pub struct AppState<R, S, P> {
    pub(crate) dispatcher: Dispatcher<R, S, P>,
    pub(crate) schedule: CategorySchedule,
}

impl<R, S, P> AppState<R, S, P> {
    pub fn new(dispatcher: Dispatcher<R, S, P>, schedule: CategorySchedule) -> Self {
        Self {
            dispatcher,
            schedule,
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

pub async fn handle<R, S, P>(request: &ApiRequest, state: &Arc<AppState<R, S, P>>) -> ApiResponse
where
    R: RankingSource,
    S: DedupStore,
    P: Publisher,
{
    // Any non-empty value turns force on, e.g. `?force=1`.
    let force = request
        .query
        .get("force")
        .is_some_and(|v| !v.is_empty());

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => handlers::root_get(),
        ("GET", "/api/tweet/daily") => handlers::run_get(state, Granularity::Daily, force).await,
        ("GET", "/api/tweet/weekly") => handlers::run_get(state, Granularity::Weekly, force).await,
        ("GET", "/api/tweet/monthly") => {
            handlers::run_get(state, Granularity::Monthly, force).await
        }
        _ => ApiResponse::text(404, "Not Found"),
    }
}
