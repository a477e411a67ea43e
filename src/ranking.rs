use crate::error::RankingError;
use crate::types::{Category, Granularity, PeriodWindow};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://b.hatena.ne.jp/ranking";

// ============================================================================
// RankingSource trait
// ============================================================================

#[allow(async_fn_in_trait)]
pub trait RankingSource: Send + Sync {
    /// Canonical ranking URL for `category` over `window`.
    ///
    /// Fails when the ranking for that period has not been published yet.
    async fn latest_period_url(
        &self,
        category: Category,
        window: &PeriodWindow,
    ) -> Result<String, RankingError>;
}

/// `{base}/{granularity}/{stamp}` for the overall ranking and
/// `{base}/{granularity}/{stamp}/{category}` for the others.
pub fn canonical_url(base_url: &str, category: Category, window: &PeriodWindow) -> String {
    let stamp = match window.granularity {
        Granularity::Daily | Granularity::Weekly => window.start.format("%Y%m%d").to_string(),
        Granularity::Monthly => window.start.format("%Y%m").to_string(),
    };
    let base = base_url.trim_end_matches('/');
    match category {
        Category::Hotentry => format!("{}/{}/{}", base, window.granularity, stamp),
        other => format!("{}/{}/{}/{}", base, window.granularity, stamp, other),
    }
}

// ============================================================================
// HatebuRankingSource — Hatena Bookmark ranking pages
// ============================================================================

pub struct HatebuRankingSource {
    http_client: Client,
    base_url: String,
}

impl HatebuRankingSource {
    pub fn new(timeout_secs: u64) -> Result<Self, RankingError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs)
    }

    /// Points the source at another host (mock servers in tests).
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, RankingError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("hateburank/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.to_string(),
        })
    }
}

impl RankingSource for HatebuRankingSource {
    async fn latest_period_url(
        &self,
        category: Category,
        window: &PeriodWindow,
    ) -> Result<String, RankingError> {
        let url = canonical_url(&self.base_url, category, window);
        let response = self.http_client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RankingError::NotAvailable(url));
        }
        response.error_for_status()?;

        debug!(url = %url, "Ranking page available");
        Ok(url)
    }
}

// ============================================================================
// Test utilities
// ============================================================================
