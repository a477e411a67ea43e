//! Environment-driven configuration, read once at cold start.

use crate::error::ConfigError;
use crate::publisher::DEFAULT_TWITTER_API_BASE_URL;
use crate::ranking::DEFAULT_BASE_URL as DEFAULT_RANKING_BASE_URL;
use crate::types::{Category, Granularity};
use chrono::FixedOffset;
use std::fmt;
use std::str::FromStr;

/// Publishing credentials, in the order they are reported when missing.
const CREDENTIAL_VARS: [&str; 4] = [
    "TWITTER_CONSUMER_KEY",
    "TWITTER_CONSUMER_SECRET",
    "TWITTER_ACCESS_TOKEN",
    "TWITTER_ACCESS_TOKEN_SECRET",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupBackend {
    DynamoDb,
    Memory,
}

/// Where a publishing-channel secret comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretSource {
    Plain(String),
    SsmParameter(String),
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain(<redacted>)"),
            Self::SsmParameter(name) => f.debug_tuple("SsmParameter").field(name).finish(),
        }
    }
}

/// The four OAuth 1.0a user-context credentials, each read as
/// `NAME` or, from SSM Parameter Store, `NAME_PARAMETER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitterCredentialSources {
    pub consumer_key: SecretSource,
    pub consumer_secret: SecretSource,
    pub access_token: SecretSource,
    pub access_token_secret: SecretSource,
}

impl TwitterCredentialSources {
    pub fn uses_ssm(&self) -> bool {
        [
            &self.consumer_key,
            &self.consumer_secret,
            &self.access_token,
            &self.access_token_secret,
        ]
        .iter()
        .any(|s| matches!(s, SecretSource::SsmParameter(_)))
    }
}

/// Categories published for each granularity, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySchedule {
    pub daily: Vec<Category>,
    pub weekly: Vec<Category>,
    pub monthly: Vec<Category>,
}

impl CategorySchedule {
    pub fn categories(&self, granularity: Granularity) -> &[Category] {
        match granularity {
            Granularity::Daily => &self.daily,
            Granularity::Weekly => &self.weekly,
            Granularity::Monthly => &self.monthly,
        }
    }
}

impl Default for CategorySchedule {
    fn default() -> Self {
        Self {
            daily: Category::defaults(),
            weekly: Category::defaults(),
            monthly: Category::defaults(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub dry_run: bool,
    pub dedup_backend: DedupBackend,
    pub dynamodb_table: Option<String>,
    pub twitter_credentials: Option<TwitterCredentialSources>,
    pub twitter_api_base_url: String,
    pub ranking_base_url: String,
    pub http_timeout_secs: u64,
    pub utc_offset: FixedOffset,
    pub schedule: CategorySchedule,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        build_config(|key| std::env::var(key))
    }
}

/// Parsing and validation, decoupled from the process environment.
fn build_config<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional = |var: &str| lookup(var).ok().filter(|s| !s.trim().is_empty());
    let or_default =
        |var: &str, default: &str| optional(var).unwrap_or_else(|| default.to_string());
    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let dry_run = match optional("DRY_RUN") {
        Some(raw) => parse_bool(&raw)
            .ok_or_else(|| invalid("DRY_RUN", format!("not a boolean: {raw}")))?,
        None => false,
    };

    let default_backend = if dry_run { "memory" } else { "dynamodb" };
    let dedup_backend = match or_default("DEDUP_BACKEND", default_backend)
        .to_ascii_lowercase()
        .as_str()
    {
        "dynamodb" => DedupBackend::DynamoDb,
        "memory" => DedupBackend::Memory,
        other => {
            return Err(invalid(
                "DEDUP_BACKEND",
                format!("expected dynamodb or memory, got {other}"),
            ));
        }
    };

    let dynamodb_table = optional("DYNAMODB_TABLE");
    if dedup_backend == DedupBackend::DynamoDb && dynamodb_table.is_none() {
        return Err(ConfigError::MissingEnvVar("DYNAMODB_TABLE".to_string()));
    }

    let secret = |var: &str| {
        optional(var).map(SecretSource::Plain).or_else(|| {
            optional(&format!("{var}_PARAMETER")).map(SecretSource::SsmParameter)
        })
    };
    let sources = CREDENTIAL_VARS.map(secret);
    let missing = CREDENTIAL_VARS
        .iter()
        .zip(&sources)
        .find(|(_, source)| source.is_none())
        .map(|(var, _)| *var);
    let twitter_credentials = match sources {
        [
            Some(consumer_key),
            Some(consumer_secret),
            Some(access_token),
            Some(access_token_secret),
        ] => Some(TwitterCredentialSources {
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        }),
        _ if dry_run => None,
        _ => {
            let var = missing.unwrap_or(CREDENTIAL_VARS[0]);
            return Err(ConfigError::MissingEnvVar(var.to_string()));
        }
    };

    let http_timeout_secs = or_default("HTTP_TIMEOUT_SECS", "30")
        .parse::<u64>()
        .map_err(|e| invalid("HTTP_TIMEOUT_SECS", e.to_string()))?;

    let offset_hours = or_default("RANKING_UTC_OFFSET_HOURS", "9")
        .parse::<i32>()
        .map_err(|e| invalid("RANKING_UTC_OFFSET_HOURS", e.to_string()))?;
    let utc_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
        invalid(
            "RANKING_UTC_OFFSET_HOURS",
            format!("{offset_hours} is out of range"),
        )
    })?;

    let categories = |var: &str| -> Result<Vec<Category>, ConfigError> {
        match optional(var) {
            Some(raw) => parse_categories(&raw).map_err(|e| invalid(var, e.to_string())),
            None => Ok(Category::defaults()),
        }
    };
    let schedule = CategorySchedule {
        daily: categories("DAILY_CATEGORIES")?,
        weekly: categories("WEEKLY_CATEGORIES")?,
        monthly: categories("MONTHLY_CATEGORIES")?,
    };

    Ok(Config {
        dry_run,
        dedup_backend,
        dynamodb_table,
        twitter_credentials,
        twitter_api_base_url: or_default("TWITTER_API_BASE_URL", DEFAULT_TWITTER_API_BASE_URL),
        ranking_base_url: or_default("RANKING_BASE_URL", DEFAULT_RANKING_BASE_URL),
        http_timeout_secs,
        utc_offset,
        schedule,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Comma-separated slugs; order is kept, duplicates are dropped.
fn parse_categories(raw: &str) -> anyhow::Result<Vec<Category>> {
    let mut categories = Vec::new();
    for part in raw.split(',').filter(|s| !s.trim().is_empty()) {
        let category = Category::from_str(part)?;
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    if categories.is_empty() {
        anyhow::bail!("no categories listed");
    }
    Ok(categories)
}
