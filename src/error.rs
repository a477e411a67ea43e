use crate::types::Category;
use thiserror::Error;

/// Failures of the ranking-data source.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("no ranking data available yet at {0}")]
    NotAvailable(String),

    #[error("ranking request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures of the external publishing channel.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publishing channel rejected credentials (HTTP {0})")]
    Auth(u16),

    #[error("publishing channel rate limit exceeded")]
    RateLimited,

    #[error("publishing channel rejected the message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("publishing channel request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("publishing channel returned an unexpected response: {0}")]
    InvalidResponse(String),

    #[error("failed to sign publishing request: {0}")]
    Signing(String),
}

/// Failures of the durable dedup store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("dedup store request failed: {0}")]
    Backend(String),

    #[error("dedup record is malformed: {0}")]
    InvalidData(String),
}

/// Why a single category of a dispatch batch did not publish.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Fail to resolve period for {category}: {source}")]
    Resolution {
        category: Category,
        #[source]
        source: RankingError,
    },

    #[error("Already tweeted: {url}")]
    AlreadyPublished { category: Category, url: String },

    #[error("Fail to format message for {category}: {source}")]
    Format {
        category: Category,
        #[source]
        source: askama::Error,
    },

    #[error("Fail to tweet for {url}: {source}")]
    Publish {
        category: Category,
        url: String,
        #[source]
        source: PublishError,
    },

    #[error("Tweeted but fail to save record for {url}, reconcile with mark-published: {source}")]
    Record {
        category: Category,
        url: String,
        #[source]
        source: StorageError,
    },
}

impl DispatchError {
    pub fn category(&self) -> Category {
        match self {
            Self::Resolution { category, .. }
            | Self::AlreadyPublished { category, .. }
            | Self::Format { category, .. }
            | Self::Publish { category, .. }
            | Self::Record { category, .. } => *category,
        }
    }

    /// A skip means "nothing new to publish", not a breakage.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::AlreadyPublished { .. })
    }
}

/// Invalid or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
