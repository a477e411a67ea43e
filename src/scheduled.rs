//! Scheduled trigger: one invocation runs a set of granularities.
//!
//! Different granularities run side by side because their dedup namespaces
//! are disjoint. A granularity listed twice runs once.
//!
//! The invocation never reports failure back to the scheduler. An async
//! retry would repost every category whose message went out but whose
//! record failed to save.

use crate::config::CategorySchedule;
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::publisher::Publisher;
use crate::ranking::RankingSource;
use crate::storage::DedupStore;
use crate::types::Granularity;
use serde::Deserialize;

/// EventBridge constant input, e.g. `{"granularities": ["weekly"], "force": false}`.
#[derive(Debug, Deserialize)]
pub struct ScheduledEvent {
    #[serde(default = "all_granularities")]
    pub granularities: Vec<Granularity>,
    #[serde(default)]
    pub force: bool,
}

fn all_granularities() -> Vec<Granularity> {
    Granularity::ALL.to_vec()
}

impl ScheduledEvent {
    /// Requested granularities in first-seen order, each at most once.
    pub fn unique_granularities(&self) -> Vec<Granularity> {
        let mut unique = Vec::with_capacity(self.granularities.len());
        for &granularity in &self.granularities {
            if !unique.contains(&granularity) {
                unique.push(granularity);
            }
        }
        unique
    }
}

/// Counts across every report of one invocation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScheduledSummary {
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ScheduledSummary {
    pub fn from_reports(reports: &[DispatchReport]) -> Self {
        reports.iter().fold(Self::default(), |acc, report| Self {
            published: acc.published + report.published.len(),
            skipped: acc.skipped + report.skipped().count(),
            failed: acc.failed + report.hard_failures().count(),
        })
    }
}

pub async fn run_scheduled<R, S, P>(
    dispatcher: &Dispatcher<R, S, P>,
    schedule: &CategorySchedule,
    event: &ScheduledEvent,
) -> Vec<DispatchReport>
where
    R: RankingSource,
    S: DedupStore,
    P: Publisher,
{
    let runs = event.unique_granularities().into_iter().map(|granularity| {
        dispatcher.run_now(granularity, schedule.categories(granularity), event.force)
    });
    futures::future::join_all(runs).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::test_utils::SpyPublisher;
    use crate::ranking::test_utils::FakeRankingSource;
    use crate::storage::InMemoryDedupStore;
    use crate::storage::test_utils::FailingDedupStore;
    use crate::types::Category;
    use chrono::FixedOffset;
    use std::sync::Arc;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn schedule(categories: &[Category]) -> CategorySchedule {
        CategorySchedule {
            daily: categories.to_vec(),
            weekly: categories.to_vec(),
            monthly: categories.to_vec(),
        }
    }

    fn event(json: &str) -> ScheduledEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn missing_fields_default_to_every_granularity_without_force() {
        let e = event("{}");
        assert_eq!(e.granularities, Granularity::ALL.to_vec());
        assert!(!e.force);
    }

    #[test]
    fn repeated_granularities_collapse_in_order() {
        let e = event(r#"{"granularities": ["weekly", "daily", "weekly", "daily"]}"#);
        assert_eq!(
            e.unique_granularities(),
            vec![Granularity::Weekly, Granularity::Daily]
        );
    }

    #[tokio::test]
    async fn repeated_granularity_publishes_once() {
        let publisher = Arc::new(SpyPublisher::new());
        let store = Arc::new(InMemoryDedupStore::new());
        let d = Dispatcher::new(
            Arc::new(FakeRankingSource::new()),
            Arc::clone(&store),
            Arc::clone(&publisher),
            jst(),
        );

        let reports = run_scheduled(
            &d,
            &schedule(&[Category::It]),
            &event(r#"{"granularities": ["weekly", "weekly"]}"#),
        )
        .await;

        assert_eq!(reports.len(), 1);
        assert_eq!(publisher.sent_count(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn record_failure_is_counted_not_raised() {
        let publisher = Arc::new(SpyPublisher::new());
        let d = Dispatcher::new(
            Arc::new(FakeRankingSource::new()),
            Arc::new(FailingDedupStore::failing_writes(InMemoryDedupStore::new())),
            Arc::clone(&publisher),
            jst(),
        );

        let reports = run_scheduled(
            &d,
            &schedule(&[Category::Hotentry, Category::It]),
            &event(r#"{"granularities": ["daily"]}"#),
        )
        .await;

        assert_eq!(publisher.sent_count(), 2);
        assert_eq!(
            ScheduledSummary::from_reports(&reports),
            ScheduledSummary {
                published: 0,
                skipped: 0,
                failed: 2,
            }
        );
    }

    #[tokio::test]
    async fn summary_counts_skips_separately() {
        let store = Arc::new(InMemoryDedupStore::new());
        let d = Dispatcher::new(
            Arc::new(FakeRankingSource::new()),
            Arc::clone(&store),
            Arc::new(SpyPublisher::new()),
            jst(),
        );
        let schedule = schedule(&[Category::Game]);
        let weekly = event(r#"{"granularities": ["weekly"]}"#);

        let first = run_scheduled(&d, &schedule, &weekly).await;
        let second = run_scheduled(&d, &schedule, &weekly).await;

        assert_eq!(ScheduledSummary::from_reports(&first).published, 1);
        assert_eq!(
            ScheduledSummary::from_reports(&second),
            ScheduledSummary {
                published: 0,
                skipped: 1,
                failed: 0,
            }
        );
    }
}
