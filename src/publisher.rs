use crate::error::PublishError;
use crate::oauth::OAuthCredentials;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_TWITTER_API_BASE_URL: &str = "https://api.twitter.com";

/// Opaque token returned by the channel for a created post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub id: String,
}

// ============================================================================
// Publisher trait
// ============================================================================

/// Delivers a rendered message to the external channel. Implementations own
/// all transport concerns (endpoint, credentials, response parsing).
#[allow(async_fn_in_trait)]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<PublishReceipt, PublishError>;
}

// ============================================================================
// TwitterPublisher — X/Twitter API v2
// ============================================================================

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

/// Posts as the account that owns the access token; every request is
/// OAuth 1.0a signed.
pub struct TwitterPublisher {
    http_client: Client,
    base_url: String,
    credentials: OAuthCredentials,
}

impl TwitterPublisher {
    pub fn new(credentials: OAuthCredentials, timeout_secs: u64) -> Result<Self, PublishError> {
        Self::with_base_url(DEFAULT_TWITTER_API_BASE_URL, credentials, timeout_secs)
    }

    pub fn with_base_url(
        base_url: &str,
        credentials: OAuthCredentials,
        timeout_secs: u64,
    ) -> Result<Self, PublishError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

impl Publisher for TwitterPublisher {
    async fn publish(&self, text: &str) -> Result<PublishReceipt, PublishError> {
        let url = format!("{}/2/tweets", self.base_url);
        let authorization = self.credentials.authorization_header("POST", &url)?;
        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, authorization)
            .json(&CreateTweetRequest { text })
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(PublishError::Auth(status.as_u16()));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(PublishError::RateLimited),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(PublishError::Rejected {
                    status: s.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        let body = response.text().await?;
        let created: CreateTweetResponse = serde_json::from_str(&body)
            .map_err(|e| PublishError::InvalidResponse(format!("{}: {}", e, body)))?;

        info!(tweet_id = %created.data.id, "Tweet posted");
        Ok(PublishReceipt {
            id: created.data.id,
        })
    }
}

// ============================================================================
// DryRunPublisher — logs instead of posting
// ============================================================================

#[derive(Default)]
pub struct DryRunPublisher;

impl Publisher for DryRunPublisher {
    async fn publish(&self, text: &str) -> Result<PublishReceipt, PublishError> {
        info!(message = %text, "pseudo-tweet");
        Ok(PublishReceipt {
            id: "dry-run".to_string(),
        })
    }
}

// ============================================================================
// AnyPublisher — channel chosen at startup
// ============================================================================

pub enum AnyPublisher {
    Twitter(TwitterPublisher),
    DryRun(DryRunPublisher),
}

impl Publisher for AnyPublisher {
    async fn publish(&self, text: &str) -> Result<PublishReceipt, PublishError> {
        match self {
            Self::Twitter(p) => p.publish(text).await,
            Self::DryRun(p) => p.publish(text).await,
        }
    }
}

// ============================================================================
// Test utilities
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_always_succeeds() {
        let receipt = DryRunPublisher.publish("hello").await.unwrap();
        assert_eq!(receipt.id, "dry-run");
    }

    #[tokio::test]
    async fn any_publisher_delegates_to_dry_run() {
        let publisher = AnyPublisher::DryRun(DryRunPublisher);
        assert!(publisher.publish("hello").await.is_ok());
    }
}
