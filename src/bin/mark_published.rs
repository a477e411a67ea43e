//! Operator tool for reconciling dedup records by hand, e.g. after a message
//! was posted but its record failed to save.

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use hateburank::storage::{DedupStore, DynamoDedupStore};
use hateburank::types::{DedupKey, Granularity};
use std::env;
use std::str::FromStr;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let check_only = match args.iter().position(|a| a == "--check") {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    };

    if args.len() != 2 {
        eprintln!("Usage: cargo run --bin mark-published [--check] <daily|weekly|monthly> <url>");
        eprintln!(
            "Example: DYNAMODB_TABLE=hateburank-staging cargo run --bin mark-published weekly https://b.hatena.ne.jp/ranking/weekly/20240304/it"
        );
        std::process::exit(1);
    }

    let granularity = Granularity::from_str(&args[0]).context("Invalid granularity")?;
    let url = &args[1];
    let key = DedupKey::new(granularity, url);

    let dynamodb_table =
        env::var("DYNAMODB_TABLE").context("DYNAMODB_TABLE environment variable must be set")?;

    println!("Initializing DynamoDB client...");
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let store = DynamoDedupStore::new(aws_sdk_dynamodb::Client::new(&config), dynamodb_table);

    if check_only {
        match store.fetch_record(&key).await? {
            Some(record) => {
                println!("Already published: {}", key);
                match record.published_at {
                    Some(at) => println!("  Published at: {}", at.to_rfc3339()),
                    None => println!("  Published at: unknown"),
                }
            }
            None => println!("Not published: {}", key),
        }
        return Ok(());
    }

    store
        .record(&key, url)
        .await
        .with_context(|| format!("Failed to record {}", key))?;

    println!("Successfully marked as published:");
    println!("  Granularity: {}", granularity);
    println!("  URL: {}", url);

    Ok(())
}
