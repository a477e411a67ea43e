//! Idempotent per-granularity dispatch.
//!
//! For each configured category, in order: resolve the latest period, skip it
//! if it was already published (unless forced), render the message, publish,
//! then record the period. Categories fail independently and nothing is
//! rolled back.
//!
//! The dedup check and the record write are not atomic. Two overlapping runs
//! of the same granularity can both see "not published" and post twice.

use crate::error::DispatchError;
use crate::message::format_message;
use crate::period::PeriodResolver;
use crate::publisher::Publisher;
use crate::ranking::RankingSource;
use crate::storage::DedupStore;
use crate::types::{Category, Granularity, Period};
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};

/// Outcome of one batch.
#[derive(Debug)]
pub struct DispatchReport {
    pub granularity: Granularity,
    pub published: Vec<Period>,
    pub failures: Vec<DispatchError>,
}

impl DispatchReport {
    fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            published: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True only when no category failed or was skipped.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures other than "already published" skips.
    pub fn hard_failures(&self) -> impl Iterator<Item = &DispatchError> {
        self.failures.iter().filter(|e| !e.is_skip())
    }

    pub fn has_hard_failures(&self) -> bool {
        self.hard_failures().next().is_some()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &DispatchError> {
        self.failures.iter().filter(|e| e.is_skip())
    }

    /// One line per failed category, in dispatch order.
    pub fn error_lines(&self) -> Vec<String> {
        self.failures.iter().map(|e| e.to_string()).collect()
    }
}

pub struct Dispatcher<R, S, P> {
    resolver: PeriodResolver<R>,
    store: Arc<S>,
    publisher: Arc<P>,
}

impl<R, S, P> Dispatcher<R, S, P>
where
    R: RankingSource,
    S: DedupStore,
    P: Publisher,
{
    pub fn new(ranking: Arc<R>, store: Arc<S>, publisher: Arc<P>, offset: FixedOffset) -> Self {
        Self {
            resolver: PeriodResolver::new(ranking, offset),
            store,
            publisher,
        }
    }

    pub async fn run_daily(&self, categories: &[Category], force: bool) -> DispatchReport {
        self.run_now(Granularity::Daily, categories, force).await
    }

    pub async fn run_weekly(&self, categories: &[Category], force: bool) -> DispatchReport {
        self.run_now(Granularity::Weekly, categories, force).await
    }

    pub async fn run_monthly(&self, categories: &[Category], force: bool) -> DispatchReport {
        self.run_now(Granularity::Monthly, categories, force).await
    }

    /// Dispatches the period that is latest as of the current time.
    pub async fn run_now(
        &self,
        granularity: Granularity,
        categories: &[Category],
        force: bool,
    ) -> DispatchReport {
        self.run(granularity, categories, force, Utc::now()).await
    }

    pub async fn run(
        &self,
        granularity: Granularity,
        categories: &[Category],
        force: bool,
        now: DateTime<Utc>,
    ) -> DispatchReport {
        let span = info_span!("dispatch", granularity = %granularity, force);
        async move {
            info!(categories = categories.len(), "Starting dispatch");
            let mut report = DispatchReport::new(granularity);

            for &category in categories {
                match self.dispatch_one(granularity, category, force, now).await {
                    Ok(period) => report.published.push(period),
                    Err(e) if e.is_skip() => {
                        info!(category = %category, "{}", e);
                        report.failures.push(e);
                    }
                    Err(e) => {
                        error!(category = %category, error = %e, "Fail to run {} job", granularity);
                        report.failures.push(e);
                    }
                }
            }

            info!(
                published = report.published.len(),
                skipped = report.skipped().count(),
                failed = report.hard_failures().count(),
                "Dispatch finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn dispatch_one(
        &self,
        granularity: Granularity,
        category: Category,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<Period, DispatchError> {
        let period = self
            .resolver
            .resolve(category, granularity, now)
            .await
            .map_err(|source| DispatchError::Resolution { category, source })?;
        let key = period.dedup_key();

        if !force && self.store.exists(&key).await {
            return Err(DispatchError::AlreadyPublished {
                category,
                url: period.canonical_url,
            });
        }

        let text = format_message(&period)
            .map_err(|source| DispatchError::Format { category, source })?;

        self.publisher
            .publish(&text)
            .await
            .map_err(|source| DispatchError::Publish {
                category,
                url: period.canonical_url.clone(),
                source,
            })?;
        info!(category = %category, url = %period.canonical_url, "Succeed to post tweet");

        if let Err(source) = self.store.record(&key, &period.canonical_url).await {
            // Logged once by the batch loop; the error text carries the URL
            // an operator needs for mark-published.
            return Err(DispatchError::Record {
                category,
                url: period.canonical_url,
                source,
            });
        }
        info!(category = %category, url = %period.canonical_url, "Succeed to save tweet");

        Ok(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::test_utils::SpyPublisher;
    use crate::ranking::test_utils::FakeRankingSource;
    use crate::storage::InMemoryDedupStore;
    use crate::storage::test_utils::FailingDedupStore;
    use crate::types::DedupKey;
    use chrono::TimeZone;

    const WEEKLY_IT_URL: &str = "https://ranking.test/weekly/20240304/it";

    fn now() -> DateTime<Utc> {
        // Friday 2024-03-15, noon in JST
        Utc.with_ymd_and_hms(2024, 3, 15, 3, 0, 0).unwrap()
    }

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn dispatcher<S: DedupStore>(
        ranking: FakeRankingSource,
        store: S,
        publisher: SpyPublisher,
    ) -> Dispatcher<FakeRankingSource, S, SpyPublisher> {
        Dispatcher::new(Arc::new(ranking), Arc::new(store), Arc::new(publisher), jst())
    }

    #[tokio::test]
    async fn publishes_and_records_every_category() {
        let d = dispatcher(
            FakeRankingSource::new(),
            InMemoryDedupStore::new(),
            SpyPublisher::new(),
        );

        let report = d
            .run(Granularity::Weekly, &[Category::Hotentry, Category::It], false, now())
            .await;

        assert!(report.is_success());
        assert_eq!(report.published.len(), 2);
        assert_eq!(d.publisher.sent_count(), 2);
        assert_eq!(d.store.write_count(), 2);
        assert!(d.store.contains(&DedupKey::new(Granularity::Weekly, WEEKLY_IT_URL)));
    }

    #[tokio::test]
    async fn recorded_url_is_the_one_in_the_message() {
        let d = dispatcher(
            FakeRankingSource::new(),
            InMemoryDedupStore::new(),
            SpyPublisher::new(),
        );

        let report = d.run(Granularity::Weekly, &[Category::It], false, now()).await;

        let sent = d.publisher.sent_messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].ends_with(WEEKLY_IT_URL));
        assert!(sent[0].contains("2024/03/04-2024/03/10"));
        assert_eq!(report.published[0].canonical_url, WEEKLY_IT_URL);
        assert_eq!(d.store.write_count(), 1);
        assert!(d.store.contains(&DedupKey::new(Granularity::Weekly, WEEKLY_IT_URL)));
    }

    #[tokio::test]
    async fn already_published_category_is_skipped_without_publishing() {
        let store = InMemoryDedupStore::new()
            .with_record(DedupKey::new(Granularity::Weekly, WEEKLY_IT_URL));
        let d = dispatcher(FakeRankingSource::new(), store, SpyPublisher::new());

        let report = d
            .run(Granularity::Weekly, &[Category::Hotentry, Category::It], false, now())
            .await;

        assert_eq!(d.publisher.sent_count(), 1);
        assert!(d.publisher.sent_messages()[0].contains("hateburank-weekly:hotentry"));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].is_skip());
        assert_eq!(report.failures[0].category(), Category::It);
        assert!(!report.is_success());
        assert!(!report.has_hard_failures());
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let d = dispatcher(
            FakeRankingSource::new(),
            InMemoryDedupStore::new(),
            SpyPublisher::new(),
        );
        let categories = [Category::Hotentry, Category::It];

        let first = d.run(Granularity::Weekly, &categories, false, now()).await;
        assert!(first.is_success());

        let second = d.run(Granularity::Weekly, &categories, false, now()).await;

        assert!(second.published.is_empty());
        assert_eq!(second.skipped().count(), 2);
        assert_eq!(d.publisher.sent_count(), 2);
        assert_eq!(d.store.write_count(), 2);
        assert_eq!(d.store.len(), 2);
    }

    #[tokio::test]
    async fn force_republishes_and_rewrites_record() {
        let store = InMemoryDedupStore::new()
            .with_record(DedupKey::new(Granularity::Weekly, WEEKLY_IT_URL));
        let d = dispatcher(FakeRankingSource::new(), store, SpyPublisher::new());

        let report = d.run(Granularity::Weekly, &[Category::It], true, now()).await;

        assert!(report.is_success());
        assert_eq!(d.publisher.sent_count(), 1);
        assert_eq!(d.store.write_count(), 1);
        assert_eq!(d.store.len(), 1);
    }

    #[tokio::test]
    async fn publish_failure_does_not_record() {
        let d = dispatcher(
            FakeRankingSource::new(),
            InMemoryDedupStore::new(),
            SpyPublisher::new().failing_on("weekly:it"),
        );

        let report = d
            .run(Granularity::Weekly, &[Category::It, Category::Game], false, now())
            .await;

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            DispatchError::Publish {
                category: Category::It,
                ..
            }
        ));
        assert!(!d.store.contains(&DedupKey::new(Granularity::Weekly, WEEKLY_IT_URL)));
        assert_eq!(d.store.write_count(), 1);
        assert_eq!(report.published[0].category, Category::Game);
    }

    #[tokio::test]
    async fn resolution_failure_is_isolated_to_its_category() {
        let d = dispatcher(
            FakeRankingSource::new().unavailable(Category::It),
            InMemoryDedupStore::new(),
            SpyPublisher::new(),
        );

        let report = d
            .run(
                Granularity::Daily,
                &[Category::Hotentry, Category::It, Category::Game],
                false,
                now(),
            )
            .await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].category(), Category::It);
        assert!(matches!(report.failures[0], DispatchError::Resolution { .. }));
        assert_eq!(d.publisher.sent_count(), 2);
        assert_eq!(d.store.write_count(), 2);
        let published: Vec<Category> = report.published.iter().map(|p| p.category).collect();
        assert_eq!(published, vec![Category::Hotentry, Category::Game]);
    }

    #[tokio::test]
    async fn record_failure_is_reported_after_publishing() {
        let d = dispatcher(
            FakeRankingSource::new(),
            FailingDedupStore::failing_writes(InMemoryDedupStore::new()),
            SpyPublisher::new(),
        );

        let report = d.run(Granularity::Monthly, &[Category::Game], false, now()).await;

        assert_eq!(d.publisher.sent_count(), 1);
        assert!(report.published.is_empty());
        assert!(matches!(report.failures[0], DispatchError::Record { .. }));
        assert!(report.has_hard_failures());
    }

    #[tokio::test]
    async fn failed_dedup_lookup_still_publishes() {
        let existing = DedupKey::new(Granularity::Weekly, WEEKLY_IT_URL);
        let store =
            FailingDedupStore::failing_lookups(InMemoryDedupStore::new().with_record(existing));
        let d = dispatcher(FakeRankingSource::new(), store, SpyPublisher::new());

        let report = d.run(Granularity::Weekly, &[Category::It], false, now()).await;

        assert!(report.is_success());
        assert_eq!(d.publisher.sent_count(), 1);
    }

    #[tokio::test]
    async fn categories_are_processed_in_configured_order() {
        let ranking = Arc::new(FakeRankingSource::new());
        let d = Dispatcher::new(
            Arc::clone(&ranking),
            Arc::new(InMemoryDedupStore::new()),
            Arc::new(SpyPublisher::new()),
            jst(),
        );
        let order = [Category::Game, Category::Hotentry, Category::It];

        d.run(Granularity::Daily, &order, false, now()).await;

        assert_eq!(*ranking.lookups.lock().unwrap(), order.to_vec());
    }

    #[tokio::test]
    async fn monthly_and_daily_periods_use_invocation_date() {
        let d = dispatcher(
            FakeRankingSource::new(),
            InMemoryDedupStore::new(),
            SpyPublisher::new(),
        );

        d.run(Granularity::Daily, &[Category::Hotentry], false, now()).await;
        d.run(Granularity::Monthly, &[Category::Hotentry], false, now()).await;

        let sent = d.publisher.sent_messages();
        assert!(sent[0].contains("2024/03/14"));
        assert!(sent[1].contains("2024年02月"));
    }

    #[tokio::test]
    async fn granularity_wrappers_dispatch_current_period() {
        let d = dispatcher(
            FakeRankingSource::new(),
            InMemoryDedupStore::new(),
            SpyPublisher::new(),
        );

        let daily = d.run_daily(&[Category::It], false).await;
        let weekly = d.run_weekly(&[Category::It], false).await;
        let monthly = d.run_monthly(&[Category::It], false).await;

        assert_eq!(daily.granularity, Granularity::Daily);
        assert_eq!(weekly.granularity, Granularity::Weekly);
        assert_eq!(monthly.granularity, Granularity::Monthly);
        assert!(daily.is_success() && weekly.is_success() && monthly.is_success());
        assert_eq!(d.store.len(), 3);
    }

    #[test]
    fn error_lines_follow_dispatch_order() {
        let mut report = DispatchReport::new(Granularity::Daily);
        report.failures.push(DispatchError::AlreadyPublished {
            category: Category::It,
            url: "https://ranking.test/daily/20240314/it".to_string(),
        });
        assert_eq!(
            report.error_lines(),
            vec!["Already tweeted: https://ranking.test/daily/20240314/it".to_string()]
        );
    }
}
