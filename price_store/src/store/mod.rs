//! Price store contract and the logic shared by its backends.
//!
//! This module provides:
//! - The `PriceStore` trait (six operations, identical across backends)
//! - Batch validation and last-write-wins normalization
//! - Per-operation reporting through `tracing` and an optional hook

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::types::{AssetId, DataBoundary, PriceRecord, TimeBucket, UnixTime};

pub use memory::InMemoryPriceStore;
pub use postgres::PgPriceStore;

/// Durable keyed storage for price records plus boundary reporting.
///
/// At most one record exists per (asset, timestamp). Queries that match
/// nothing return empty collections.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Every stored record, order unspecified
    async fn get_all(&self) -> Result<Vec<PriceRecord>>;

    /// All records at exactly `timestamp`, across assets
    async fn get_by_timestamp(&self, timestamp: UnixTime) -> Result<Vec<PriceRecord>>;

    /// All records for one asset, across timestamps
    async fn get_all_by_asset(&self, asset: &AssetId) -> Result<Vec<PriceRecord>>;

    /// Insert new keys and overwrite existing ones, atomically per call.
    ///
    /// The whole batch is validated first; a single invalid record fails the
    /// call with nothing written. Duplicate keys within the batch resolve to
    /// the last occurrence.
    async fn add_or_update(&self, records: &[PriceRecord]) -> Result<()>;

    /// Remove every stored record
    async fn delete_all(&self) -> Result<()>;

    /// Earliest and latest timestamp per asset, for assets with data only.
    ///
    /// Recomputed from the stored set on every call.
    async fn get_data_boundaries(&self) -> Result<BTreeMap<AssetId, DataBoundary>>;
}

/// A completed store operation, as seen by observers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreOperation {
    pub method: &'static str,
    /// Records returned, written or deleted; boundaries for `get_data_boundaries`
    pub amount: usize,
}

/// Callback invoked after every successful store operation
pub type OperationHook = Arc<dyn Fn(&StoreOperation) + Send + Sync>;

/// Reports completed operations to tracing and the optional hook
#[derive(Clone, Default)]
pub(crate) struct Reporter {
    hook: Option<OperationHook>,
}

impl Reporter {
    pub(crate) fn new(hook: Option<OperationHook>) -> Self {
        Self { hook }
    }

    pub(crate) fn report(&self, method: &'static str, amount: usize) {
        debug!(method, amount, "price store operation");
        if let Some(hook) = &self.hook {
            hook(&StoreOperation { method, amount });
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// Validate a write batch and collapse duplicate keys.
///
/// Validation runs in input order and stops at the first bad record, whose
/// input position is reported. Surviving rows keep the price of the last
/// occurrence of their key and come back sorted by (asset, timestamp).
pub fn prepare_batch(records: &[PriceRecord], bucket: TimeBucket) -> Result<Vec<PriceRecord>> {
    for (index, record) in records.iter().enumerate() {
        if !record.price.is_finite() {
            return Err(StoreError::InvalidRecord {
                index,
                reason: format!("price {} for {} is not finite", record.price, record.asset),
            });
        }
        if record.price < 0.0 {
            return Err(StoreError::InvalidRecord {
                index,
                reason: format!("price {} for {} is negative", record.price, record.asset),
            });
        }
        if !bucket.is_aligned(record.timestamp) {
            return Err(StoreError::InvalidRecord {
                index,
                reason: format!(
                    "timestamp {} for {} is not aligned to {}s buckets",
                    record.timestamp,
                    record.asset,
                    bucket.as_secs()
                ),
            });
        }
    }

    let mut latest: FxHashMap<(&AssetId, UnixTime), f64> =
        FxHashMap::with_capacity_and_hasher(records.len(), Default::default());
    for record in records {
        latest.insert(record.key(), record.price);
    }

    let mut rows: Vec<PriceRecord> = latest
        .into_iter()
        .map(|((asset, timestamp), price)| PriceRecord::new(asset.clone(), timestamp, price))
        .collect();
    rows.sort_by(|a, b| a.key().cmp(&b.key()));

    Ok(rows)
}
