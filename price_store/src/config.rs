//! Store-wide settings.

use std::env;

use crate::types::TimeBucket;

/// Price store configuration
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Granularity every stored timestamp must be aligned to
    pub bucket: TimeBucket,
    /// Maximum rows per upsert statement; larger batches are split
    /// across several statements inside one transaction
    pub upsert_chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: TimeBucket::HOUR,
            upsert_chunk_size: 1000,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bucket: env::var("PRICE_BUCKET_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .and_then(TimeBucket::from_secs)
                .unwrap_or(defaults.bucket),
            upsert_chunk_size: env::var("PRICE_UPSERT_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.upsert_chunk_size),
        }
    }

    pub fn with_bucket(mut self, bucket: TimeBucket) -> Self {
        self.bucket = bucket;
        self
    }

    pub fn with_upsert_chunk_size(mut self, size: usize) -> Self {
        self.upsert_chunk_size = size.max(1);
        self
    }
}
