//! Scheduled Lambda entry point.
//!
//! Triggered by an EventBridge rule whose constant input names the
//! granularities to run, e.g. `{"granularities": ["weekly"], "force": false}`.
//! Without a list every granularity runs; dedup makes the extra runs no-ops.

use hateburank::app::{AppDispatcher, build_dispatcher};
use hateburank::config::{CategorySchedule, Config};
use hateburank::scheduled::{ScheduledEvent, ScheduledSummary, run_scheduled};
use lambda_runtime::{Error, LambdaEvent, service_fn};
use std::sync::Arc;
use tracing::{error, info};

struct AppState {
    dispatcher: AppDispatcher,
    schedule: CategorySchedule,
}

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
    let state = Arc::new(AppState {
        dispatcher,
        schedule: config.schedule,
    });

    lambda_runtime::run(service_fn(|event| handler(event, state.clone()))).await?;
    Ok(())
}

async fn handler(event: LambdaEvent<ScheduledEvent>, state: Arc<AppState>) -> Result<(), Error> {
    let event = event.payload;
    info!(
        granularities = ?event.granularities,
        force = event.force,
        "Starting hateburank handler..."
    );

    let reports = run_scheduled(&state.dispatcher, &state.schedule, &event).await;
    let summary = ScheduledSummary::from_reports(&reports);

    // Failures were logged per category by the dispatcher. Returning Ok keeps
    // Lambda from retrying, which would repost anything left unrecorded.
    if summary.failed > 0 {
        error!(
            published = summary.published,
            skipped = summary.skipped,
            failed = summary.failed,
            "Handler completed with failures."
        );
    } else {
        info!(
            published = summary.published,
            skipped = summary.skipped,
            "Handler completed successfully."
        );
    }
    Ok(())
}
