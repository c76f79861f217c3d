//! In-process price store backend.
//!
//! Records live in an ordered map keyed by (asset, timestamp). A batch is
//! validated before the write lock is taken and applied without any await
//! point, so readers see either none or all of it.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{prepare_batch, OperationHook, PriceStore, Reporter};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::types::{AssetId, DataBoundary, PriceRecord, UnixTime};

/// Price store held entirely in memory
#[derive(Debug)]
pub struct InMemoryPriceStore {
    rows: RwLock<BTreeMap<(AssetId, UnixTime), f64>>,
    config: StoreConfig,
    reporter: Reporter,
}

impl Default for InMemoryPriceStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl InMemoryPriceStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            config,
            reporter: Reporter::default(),
        }
    }

    pub fn with_hook(mut self, hook: OperationHook) -> Self {
        self.reporter = Reporter::new(Some(hook));
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

fn to_record((asset, timestamp): &(AssetId, UnixTime), price: &f64) -> PriceRecord {
    PriceRecord::new(asset.clone(), *timestamp, *price)
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn get_all(&self) -> Result<Vec<PriceRecord>> {
        let records: Vec<PriceRecord> = self
            .rows
            .read()
            .iter()
            .map(|(key, price)| to_record(key, price))
            .collect();

        self.reporter.report("get_all", records.len());
        Ok(records)
    }

    async fn get_by_timestamp(&self, timestamp: UnixTime) -> Result<Vec<PriceRecord>> {
        let records: Vec<PriceRecord> = self
            .rows
            .read()
            .iter()
            .filter(|((_, ts), _)| *ts == timestamp)
            .map(|(key, price)| to_record(key, price))
            .collect();

        self.reporter.report("get_by_timestamp", records.len());
        Ok(records)
    }

    async fn get_all_by_asset(&self, asset: &AssetId) -> Result<Vec<PriceRecord>> {
        let lower = (asset.clone(), UnixTime::new(i64::MIN));
        let upper = (asset.clone(), UnixTime::new(i64::MAX));

        let records: Vec<PriceRecord> = self
            .rows
            .read()
            .range(lower..=upper)
            .map(|(key, price)| to_record(key, price))
            .collect();

        self.reporter.report("get_all_by_asset", records.len());
        Ok(records)
    }

    async fn add_or_update(&self, records: &[PriceRecord]) -> Result<()> {
        let prepared = prepare_batch(records, self.config.bucket)?;
        let amount = prepared.len();

        {
            let mut rows = self.rows.write();
            for record in prepared {
                rows.insert((record.asset, record.timestamp), record.price);
            }
        }

        self.reporter.report("add_or_update", amount);
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let removed = {
            let mut rows = self.rows.write();
            let removed = rows.len();
            rows.clear();
            removed
        };

        self.reporter.report("delete_all", removed);
        Ok(())
    }

    async fn get_data_boundaries(&self) -> Result<BTreeMap<AssetId, DataBoundary>> {
        let mut boundaries: BTreeMap<AssetId, DataBoundary> = BTreeMap::new();

        for (asset, timestamp) in self.rows.read().keys() {
            match boundaries.get_mut(asset) {
                Some(boundary) => boundary.extend(*timestamp),
                None => {
                    boundaries.insert(asset.clone(), DataBoundary::new(*timestamp, *timestamp));
                }
            }
        }

        self.reporter.report("get_data_boundaries", boundaries.len());
        Ok(boundaries)
    }
}
