//! PostgreSQL price store backend
//!
//! Rows live in the `asset_prices` table with a composite primary key on
//! (asset, unix_timestamp).

use async_trait::async_trait;
use sqlx::{Executor, PgPool};
use std::collections::BTreeMap;
use tracing::info;

use super::{prepare_batch, OperationHook, PriceStore, Reporter};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::types::{AssetId, DataBoundary, PriceRecord, UnixTime};

const SCHEMA: &str = include_str!("../../migrations/0001_asset_prices.sql");

/// Price store backed by a shared PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgPriceStore {
    pool: PgPool,
    config: StoreConfig,
    reporter: Reporter,
}

/// Stored row
#[derive(Debug, Clone, sqlx::FromRow)]
struct PriceRow {
    asset: String,
    unix_timestamp: i64,
    price_usd: f64,
}

impl PriceRow {
    fn into_record(self) -> Result<PriceRecord> {
        Ok(PriceRecord::new(
            AssetId::new(&self.asset)?,
            UnixTime::new(self.unix_timestamp),
            self.price_usd,
        ))
    }
}

/// Decode fetched rows, reporting the operation only once every row decoded
fn finish_read(
    reporter: &Reporter,
    method: &'static str,
    rows: Vec<PriceRow>,
) -> Result<Vec<PriceRecord>> {
    let records = rows
        .into_iter()
        .map(PriceRow::into_record)
        .collect::<Result<Vec<_>>>()?;
    reporter.report(method, records.len());
    Ok(records)
}

impl PgPriceStore {
    pub fn new(pool: PgPool, config: StoreConfig) -> Self {
        Self {
            pool,
            config,
            reporter: Reporter::default(),
        }
    }

    pub fn with_hook(mut self, hook: OperationHook) -> Self {
        self.reporter = Reporter::new(Some(hook));
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create the `asset_prices` table if it does not exist
    pub async fn migrate(&self) -> Result<()> {
        self.pool.execute(SCHEMA).await?;
        info!("asset_prices schema ready");
        Ok(())
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn get_all(&self) -> Result<Vec<PriceRecord>> {
        let rows = sqlx::query_as::<_, PriceRow>(
            "SELECT asset, unix_timestamp, price_usd FROM asset_prices",
        )
        .fetch_all(&self.pool)
        .await?;

        finish_read(&self.reporter, "get_all", rows)
    }

    async fn get_by_timestamp(&self, timestamp: UnixTime) -> Result<Vec<PriceRecord>> {
        let rows = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT asset, unix_timestamp, price_usd
            FROM asset_prices
            WHERE unix_timestamp = $1
            "#,
        )
        .bind(timestamp.as_secs())
        .fetch_all(&self.pool)
        .await?;

        finish_read(&self.reporter, "get_by_timestamp", rows)
    }

    async fn get_all_by_asset(&self, asset: &AssetId) -> Result<Vec<PriceRecord>> {
        let rows = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT asset, unix_timestamp, price_usd
            FROM asset_prices
            WHERE asset = $1
            "#,
        )
        .bind(asset.as_str())
        .fetch_all(&self.pool)
        .await?;

        finish_read(&self.reporter, "get_all_by_asset", rows)
    }

    async fn add_or_update(&self, records: &[PriceRecord]) -> Result<()> {
        let prepared = prepare_batch(records, self.config.bucket)?;
        if prepared.is_empty() {
            self.reporter.report("add_or_update", 0);
            return Ok(());
        }

        // Dropping the transaction without commit rolls it back
        let mut tx = self.pool.begin().await?;

        for chunk in prepared.chunks(self.config.upsert_chunk_size.max(1)) {
            let assets: Vec<&str> = chunk.iter().map(|r| r.asset.as_str()).collect();
            let timestamps: Vec<i64> = chunk.iter().map(|r| r.timestamp.as_secs()).collect();
            let prices: Vec<f64> = chunk.iter().map(|r| r.price).collect();

            sqlx::query(
                r#"
                INSERT INTO asset_prices (asset, unix_timestamp, price_usd)
                SELECT * FROM UNNEST($1::TEXT[], $2::BIGINT[], $3::DOUBLE PRECISION[])
                ON CONFLICT (asset, unix_timestamp) DO UPDATE SET
                    price_usd = EXCLUDED.price_usd
                "#,
            )
            .bind(assets)
            .bind(timestamps)
            .bind(prices)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.reporter.report("add_or_update", prepared.len());
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let result = sqlx::query("DELETE FROM asset_prices")
            .execute(&self.pool)
            .await?;

        self.reporter.report("delete_all", result.rows_affected() as usize);
        Ok(())
    }

    async fn get_data_boundaries(&self) -> Result<BTreeMap<AssetId, DataBoundary>> {
        let rows = sqlx::query_as::<_, (String, i64, i64)>(
            r#"
            SELECT asset, MIN(unix_timestamp), MAX(unix_timestamp)
            FROM asset_prices
            GROUP BY asset
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut boundaries = BTreeMap::new();
        for (asset, earliest, latest) in rows {
            boundaries.insert(
                AssetId::new(&asset)?,
                DataBoundary::new(UnixTime::new(earliest), UnixTime::new(latest)),
            );
        }

        self.reporter.report("get_data_boundaries", boundaries.len());
        Ok(boundaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::StoreOperation;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn row(asset: &str, ts: i64, price: f64) -> PriceRow {
        PriceRow {
            asset: asset.to_string(),
            unix_timestamp: ts,
            price_usd: price,
        }
    }

    fn recording_reporter() -> (Reporter, Arc<Mutex<Vec<StoreOperation>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = Reporter::new(Some(Arc::new(move |op: &StoreOperation| {
            sink.lock().push(*op);
        })));
        (reporter, seen)
    }

    #[test]
    fn test_finish_read_reports_decoded_rows() {
        let (reporter, seen) = recording_reporter();

        let records =
            finish_read(&reporter, "get_all", vec![row("btc", 0, 1.0), row("eth", 0, 2.0)]).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            *seen.lock(),
            vec![StoreOperation { method: "get_all", amount: 2 }]
        );
    }

    #[test]
    fn test_finish_read_does_not_report_failed_decode() {
        let (reporter, seen) = recording_reporter();

        let result = finish_read(
            &reporter,
            "get_by_timestamp",
            vec![row("btc", 0, 1.0), row("not an asset", 0, 2.0)],
        );

        assert!(matches!(result, Err(StoreError::InvalidAsset(_))));
        assert!(seen.lock().is_empty());
    }
}
