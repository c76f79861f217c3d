use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use price_store::db::{check_pool_health, create_pool_from_env, execute_with_retry, pool_stats};
use price_store::{AssetId, PgPriceStore, PriceStore, StoreConfig, UnixTime};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAX_ATTEMPTS: u32 = 3;

/// Per-asset coverage line in the boundary report
#[derive(Debug, Serialize)]
struct Coverage {
    earliest: UnixTime,
    latest: UnixTime,
    expected_points: u64,
    stored_points: usize,
    missing_points: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "boundaries".to_string());

    let config = StoreConfig::from_env();
    let pool = create_pool_from_env().await?;
    let store = PgPriceStore::new(pool, config);

    match command.as_str() {
        "migrate" => {
            execute_with_retry(|| store.migrate(), MAX_ATTEMPTS)
                .await
                .context("Failed to create price schema")?;
        }
        "boundaries" => print_boundaries(&store).await?,
        "health" => {
            execute_with_retry(|| check_pool_health(store.pool()), MAX_ATTEMPTS)
                .await
                .context("Database health check failed")?;
            let stats = pool_stats(store.pool());
            info!(
                "Database healthy: size={}, idle={}, active={}",
                stats.size,
                stats.idle,
                stats.active()
            );
        }
        other => bail!("Unknown command {:?} (expected migrate, boundaries or health)", other),
    }

    Ok(())
}

async fn print_boundaries(store: &PgPriceStore) -> Result<()> {
    let bucket = store.config().bucket;
    let boundaries = execute_with_retry(|| store.get_data_boundaries(), MAX_ATTEMPTS)
        .await
        .context("Failed to load data boundaries")?;

    let mut report: BTreeMap<AssetId, Coverage> = BTreeMap::new();
    for (asset, boundary) in boundaries {
        let stored_points = execute_with_retry(|| store.get_all_by_asset(&asset), MAX_ATTEMPTS)
            .await
            .with_context(|| format!("Failed to load prices for {}", asset))?
            .len();
        let expected_points = boundary.expected_points(bucket);

        report.insert(
            asset,
            Coverage {
                earliest: boundary.earliest,
                latest: boundary.latest,
                expected_points,
                stored_points,
                missing_points: expected_points.saturating_sub(stored_points as u64),
            },
        );
    }

    info!("Reporting coverage for {} assets", report.len());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
