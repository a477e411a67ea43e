//! Period-window arithmetic and canonical period resolution.

use crate::error::RankingError;
use crate::ranking::RankingSource;
use crate::types::{Category, Granularity, Period, PeriodWindow};
use chrono::{DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, Utc};
use std::sync::Arc;

impl Granularity {
    /// The most recently completed period as seen on `today`.
    pub fn latest_window(&self, today: NaiveDate) -> PeriodWindow {
        match self {
            Self::Daily => PeriodWindow {
                granularity: *self,
                start: today - Days::new(1),
                end: None,
            },
            Self::Weekly => {
                let start = monday_of(today - Days::new(7));
                PeriodWindow {
                    granularity: *self,
                    start,
                    end: Some(start + Days::new(6)),
                }
            }
            Self::Monthly => {
                // chrono clamps to the last day of the shorter month
                let last_month = today - Months::new(1);
                let start = last_month.with_day(1).unwrap_or(last_month);
                let end = (start + Months::new(1)) - Days::new(1);
                PeriodWindow {
                    granularity: *self,
                    start,
                    end: Some(end),
                }
            }
        }
    }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

pub struct PeriodResolver<R> {
    ranking: Arc<R>,
    offset: FixedOffset,
}

impl<R: RankingSource> PeriodResolver<R> {
    /// `offset` is the time zone the ranking site cuts its days in.
    pub fn new(ranking: Arc<R>, offset: FixedOffset) -> Self {
        Self { ranking, offset }
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    pub async fn resolve(
        &self,
        category: Category,
        granularity: Granularity,
        now: DateTime<Utc>,
    ) -> Result<Period, RankingError> {
        let window = granularity.latest_window(self.local_date(now));
        let canonical_url = self.ranking.latest_period_url(category, &window).await?;
        Ok(Period {
            category,
            window,
            canonical_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::test_utils::FakeRankingSource;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_window_is_yesterday() {
        let w = Granularity::Daily.latest_window(date(2024, 3, 15));
        assert_eq!(w.start, date(2024, 3, 14));
        assert_eq!(w.end, None);
    }

    #[test]
    fn weekly_window_is_last_completed_monday_to_sunday() {
        let w = Granularity::Weekly.latest_window(date(2024, 3, 15));
        assert_eq!(w.start, date(2024, 3, 4));
        assert_eq!(w.end, Some(date(2024, 3, 10)));
    }

    #[test]
    fn weekly_window_on_sunday_does_not_pick_current_week() {
        // 2024-03-17 is a Sunday; the week of 03-11 is not complete yet
        let w = Granularity::Weekly.latest_window(date(2024, 3, 17));
        assert_eq!(w.start, date(2024, 3, 4));
    }

    #[test]
    fn weekly_window_on_monday_picks_previous_week() {
        let w = Granularity::Weekly.latest_window(date(2024, 3, 18));
        assert_eq!(w.start, date(2024, 3, 11));
        assert_eq!(w.end, Some(date(2024, 3, 17)));
    }

    #[test]
    fn monthly_window_is_previous_calendar_month() {
        let w = Granularity::Monthly.latest_window(date(2024, 3, 15));
        assert_eq!(w.start, date(2024, 2, 1));
        assert_eq!(w.end, Some(date(2024, 2, 29)));
    }

    #[test]
    fn monthly_window_clamps_at_month_end() {
        let w = Granularity::Monthly.latest_window(date(2024, 3, 31));
        assert_eq!(w.start, date(2024, 2, 1));
    }

    #[test]
    fn monthly_window_crosses_year_boundary() {
        let w = Granularity::Monthly.latest_window(date(2024, 1, 10));
        assert_eq!(w.start, date(2023, 12, 1));
        assert_eq!(w.end, Some(date(2023, 12, 31)));
    }

    #[test]
    fn local_date_uses_configured_offset() {
        let resolver = PeriodResolver::new(
            Arc::new(FakeRankingSource::new()),
            FixedOffset::east_opt(9 * 3600).unwrap(),
        );
        // 16:00 UTC on the 14th is already the 15th in JST
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 16, 0, 0).unwrap();
        assert_eq!(resolver.local_date(now), date(2024, 3, 15));
    }

    #[tokio::test]
    async fn resolve_attaches_canonical_url() {
        let resolver = PeriodResolver::new(
            Arc::new(FakeRankingSource::new()),
            FixedOffset::east_opt(0).unwrap(),
        );
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let period = resolver
            .resolve(Category::It, Granularity::Weekly, now)
            .await
            .unwrap();
        assert_eq!(period.window.start, date(2024, 3, 4));
        assert_eq!(period.canonical_url, "https://ranking.test/weekly/20240304/it");
    }

    #[tokio::test]
    async fn resolve_propagates_ranking_failure() {
        let resolver = PeriodResolver::new(
            Arc::new(FakeRankingSource::new().unavailable(Category::Game)),
            FixedOffset::east_opt(0).unwrap(),
        );
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let result = resolver.resolve(Category::Game, Granularity::Daily, now).await;
        assert!(matches!(result, Err(RankingError::NotAvailable(_))));
    }
}
