use super::{ApiResponse, AppState};
use crate::dispatcher::DispatchReport;
use crate::publisher::Publisher;
use crate::ranking::RankingSource;
use crate::storage::DedupStore;
use crate::types::Granularity;
use std::sync::Arc;

// ============================================================================
// Route handlers
// ============================================================================

/// GET /
pub(super) fn root_get() -> ApiResponse {
    ApiResponse::text(200, "Hello from hateburank!")
}

/// GET /api/tweet/{daily,weekly,monthly}[?force=1]
///
/// Runs every configured category for the granularity. Categories that were
/// already published are listed but do not fail the request.
pub(super) async fn run_get<R, S, P>(
    state: &Arc<AppState<R, S, P>>,
    granularity: Granularity,
    force: bool,
) -> ApiResponse
where
    R: RankingSource,
    S: DedupStore,
    P: Publisher,
{
    let categories = state.schedule.categories(granularity);
    let report = state
        .dispatcher
        .run_now(granularity, categories, force)
        .await;
    report_response(&report)
}

pub(super) fn report_response(report: &DispatchReport) -> ApiResponse {
    // Failures were already logged by the dispatcher.
    if report.has_hard_failures() {
        return ApiResponse::text(500, report.error_lines().join("\n"));
    }

    let mut lines = vec![format!("Succeed to run {} job", report.granularity)];
    lines.extend(report.skipped().map(|e| e.to_string()));
    ApiResponse::text(200, lines.join("\n"))
}

// ============================================================================
// Tests
// ============================================================================
