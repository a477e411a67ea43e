//! Builds the production dispatcher from configuration.

use crate::config::{Config, DedupBackend, SecretSource};
use crate::dispatcher::Dispatcher;
use crate::oauth::OAuthCredentials;
use crate::publisher::{AnyPublisher, DryRunPublisher, TwitterPublisher};
use crate::ranking::HatebuRankingSource;
use crate::storage::{AnyDedupStore, DynamoDedupStore, InMemoryDedupStore};
use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use std::sync::Arc;
use tracing::{info, warn};

pub type AppDispatcher = Dispatcher<HatebuRankingSource, AnyDedupStore, AnyPublisher>;

pub async fn build_dispatcher(config: &Config) -> Result<AppDispatcher> {
    let secrets_in_ssm = !config.dry_run
        && config
            .twitter_credentials
            .as_ref()
            .is_some_and(|c| c.uses_ssm());
    let needs_aws = config.dedup_backend == DedupBackend::DynamoDb || secrets_in_ssm;
    let aws_config = if needs_aws {
        Some(aws_config::load_defaults(BehaviorVersion::latest()).await)
    } else {
        None
    };

    let ranking =
        HatebuRankingSource::with_base_url(&config.ranking_base_url, config.http_timeout_secs)
            .context("Failed to build ranking client")?;
    let store = build_store(config, aws_config.as_ref())?;
    let publisher = build_publisher(config, aws_config.as_ref()).await?;

    Ok(Dispatcher::new(
        Arc::new(ranking),
        Arc::new(store),
        Arc::new(publisher),
        config.utc_offset,
    ))
}

fn build_store(config: &Config, aws_config: Option<&SdkConfig>) -> Result<AnyDedupStore> {
    match config.dedup_backend {
        DedupBackend::Memory => {
            warn!("Using in-memory dedup store; published periods are forgotten on restart");
            Ok(AnyDedupStore::InMemory(InMemoryDedupStore::new()))
        }
        DedupBackend::DynamoDb => {
            let aws_config = aws_config.context("AWS configuration was not loaded")?;
            let table = config
                .dynamodb_table
                .clone()
                .context("DYNAMODB_TABLE must be set for the dynamodb backend")?;
            let client = aws_sdk_dynamodb::Client::new(aws_config);
            Ok(AnyDedupStore::Dynamo(DynamoDedupStore::new(client, table)))
        }
    }
}

async fn build_publisher(config: &Config, aws_config: Option<&SdkConfig>) -> Result<AnyPublisher> {
    if config.dry_run {
        info!("Dry run: messages are logged, not posted");
        return Ok(AnyPublisher::DryRun(DryRunPublisher));
    }

    let sources = config
        .twitter_credentials
        .as_ref()
        .context("Twitter OAuth credentials must be set")?;
    let ssm = aws_config.map(aws_sdk_ssm::Client::new);
    let credentials = OAuthCredentials {
        consumer_key: resolve_secret(&sources.consumer_key, ssm.as_ref()).await?,
        consumer_secret: resolve_secret(&sources.consumer_secret, ssm.as_ref()).await?,
        access_token: resolve_secret(&sources.access_token, ssm.as_ref()).await?,
        access_token_secret: resolve_secret(&sources.access_token_secret, ssm.as_ref()).await?,
    };

    let publisher = TwitterPublisher::with_base_url(
        &config.twitter_api_base_url,
        credentials,
        config.http_timeout_secs,
    )
    .context("Failed to build publishing client")?;
    Ok(AnyPublisher::Twitter(publisher))
}

async fn resolve_secret(
    source: &SecretSource,
    ssm: Option<&aws_sdk_ssm::Client>,
) -> Result<String> {
    match source {
        SecretSource::Plain(value) => Ok(value.clone()),
        SecretSource::SsmParameter(name) => {
            let ssm = ssm.context("AWS configuration was not loaded")?;
            fetch_parameter(ssm, name).await
        }
    }
}

/// Reads a SecureString parameter from SSM Parameter Store.
async fn fetch_parameter(client: &aws_sdk_ssm::Client, name: &str) -> Result<String> {
    let output = client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
        .with_context(|| format!("Failed to read SSM parameter {}", name))?;

    output
        .parameter
        .and_then(|p| p.value)
        .filter(|v| !v.is_empty())
        .with_context(|| format!("SSM parameter {} has no value", name))
}
