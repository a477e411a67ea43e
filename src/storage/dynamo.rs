use super::DedupStore;
use crate::error::StorageError;
use crate::types::DedupKey;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::{Client, types::AttributeValue};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const PUBLISHED_PARTITION_KEY_PREFIX: &str = "PUBLISHED";

/// A stored dedup record as read back for operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupRecord {
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
}

// ============================================================================
// DynamoDedupStore — DynamoDB-backed DedupStore implementation
// ============================================================================

/// Items live at PK=`PUBLISHED#{namespace}`, SK=`{canonical url}`.
pub struct DynamoDedupStore {
    client: Client,
    table_name: String,
}

impl DynamoDedupStore {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    /// Full record for `key`, if any.
    pub async fn fetch_record(&self, key: &DedupKey) -> Result<Option<DedupRecord>, StorageError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(published_pk(key)))
            .key("SK", AttributeValue::S(key.url.clone()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;

        output.item.map(record_from_item).transpose()
    }
}

impl DedupStore for DynamoDedupStore {
    async fn lookup(&self, key: &DedupKey) -> Result<bool, StorageError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(published_pk(key)))
            .key("SK", AttributeValue::S(key.url.clone()))
            .projection_expression("SK")
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;

        Ok(output.item.is_some())
    }

    async fn record(&self, key: &DedupKey, url: &str) -> Result<(), StorageError> {
        let item = HashMap::from([
            ("PK".to_string(), AttributeValue::S(published_pk(key))),
            ("SK".to_string(), AttributeValue::S(key.url.clone())),
            ("url".to_string(), AttributeValue::S(url.to_string())),
            (
                "published_at".to_string(),
                AttributeValue::S(Utc::now().to_rfc3339()),
            ),
        ]);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn published_pk(key: &DedupKey) -> String {
    format!("{}#{}", PUBLISHED_PARTITION_KEY_PREFIX, key.namespace)
}

pub(crate) fn record_from_item(
    item: HashMap<String, AttributeValue>,
) -> Result<DedupRecord, StorageError> {
    let url = item
        .get("url")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| StorageError::InvalidData("Missing url field".to_string()))?
        .clone();

    // Records written by hand may lack a timestamp.
    let published_at = item
        .get("published_at")
        .and_then(|v| v.as_s().ok())
        .map(|s| {
            s.parse::<DateTime<Utc>>().map_err(|e| {
                StorageError::InvalidData(format!("Invalid published_at timestamp: {}", e))
            })
        })
        .transpose()?;

    Ok(DedupRecord { url, published_at })
}

// ============================================================================
// Tests — DynamoDB item helpers (no network required)
// ============================================================================
