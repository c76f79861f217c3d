//! Domain types for stored price observations.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StoreError;

/// Maximum length of a canonical asset identifier
const MAX_ASSET_ID_LEN: usize = 64;

/// Canonical identifier of a tracked asset (e.g. "bitcoin", "usd-coin").
///
/// Always trimmed, lowercase ASCII made of `[a-z0-9._-]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    /// Normalize and validate an identifier
    pub fn new(raw: &str) -> Result<Self, StoreError> {
        let normalized = raw.trim().to_ascii_lowercase();

        let valid = !normalized.is_empty()
            && normalized.len() <= MAX_ASSET_ID_LEN
            && normalized
                .bytes()
                .all(|b| {
                    b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_' | b'.')
                });

        if !valid {
            return Err(StoreError::InvalidAsset(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssetId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTime(i64);

impl UnixTime {
    pub const fn new(secs: i64) -> Self {
        Self(secs)
    }

    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    /// `None` when the value is outside chrono's representable range
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.0, 0).single()
    }

    pub const fn as_secs(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UnixTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-wide timestamp granularity, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeBucket(u32);

impl TimeBucket {
    pub const HOUR: TimeBucket = TimeBucket(3600);
    pub const DAY: TimeBucket = TimeBucket(86_400);

    /// `None` for a zero-length bucket
    pub const fn from_secs(secs: u32) -> Option<Self> {
        if secs == 0 {
            None
        } else {
            Some(Self(secs))
        }
    }

    pub const fn as_secs(self) -> u32 {
        self.0
    }

    pub fn is_aligned(self, t: UnixTime) -> bool {
        t.0.rem_euclid(self.0 as i64) == 0
    }

    /// Floor `t` to the start of its bucket, `None` below `i64::MIN`
    pub fn start_of(self, t: UnixTime) -> Option<UnixTime> {
        t.0.checked_sub(t.0.rem_euclid(self.0 as i64)).map(UnixTime)
    }

    /// Start of the bucket following the one containing `t`, `None` past `i64::MAX`
    pub fn next(self, t: UnixTime) -> Option<UnixTime> {
        let bucket = self.0 as i64;
        t.0.checked_add(bucket - t.0.rem_euclid(bucket)).map(UnixTime)
    }

    /// Number of bucket starts in the closed range `[from, to]`.
    ///
    /// Computed in `i128` so any pair of `i64` timestamps is safe; saturates
    /// at `u64::MAX` for a one-second bucket spanning the whole range.
    pub fn count_between(self, from: UnixTime, to: UnixTime) -> u64 {
        if to < from {
            return 0;
        }
        let bucket = self.0 as i128;
        let (from, to) = (from.0 as i128, to.0 as i128);
        let first = from + (bucket - from.rem_euclid(bucket)) % bucket;
        if first > to {
            return 0;
        }
        ((to - first) / bucket + 1).min(u64::MAX as i128) as u64
    }
}

impl TryFrom<u32> for TimeBucket {
    type Error = String;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        Self::from_secs(secs).ok_or_else(|| "time bucket must be positive".to_string())
    }
}

impl From<TimeBucket> for u32 {
    fn from(bucket: TimeBucket) -> Self {
        bucket.0
    }
}

/// One price observation keyed by (asset, timestamp).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub asset: AssetId,
    pub timestamp: UnixTime,
    /// Price in USD
    pub price: f64,
}

impl PriceRecord {
    pub fn new(asset: AssetId, timestamp: UnixTime, price: f64) -> Self {
        Self {
            asset,
            timestamp,
            price,
        }
    }

    pub fn key(&self) -> (&AssetId, UnixTime) {
        (&self.asset, self.timestamp)
    }
}

/// Earliest and latest stored timestamp for one asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBoundary {
    pub earliest: UnixTime,
    pub latest: UnixTime,
}

impl DataBoundary {
    pub fn new(earliest: UnixTime, latest: UnixTime) -> Self {
        Self { earliest, latest }
    }

    /// Widen the boundary to include `t`
    pub fn extend(&mut self, t: UnixTime) {
        if t < self.earliest {
            self.earliest = t;
        }
        if t > self.latest {
            self.latest = t;
        }
    }

    pub fn contains(&self, t: UnixTime) -> bool {
        self.earliest <= t && t <= self.latest
    }

    /// Number of buckets a gap-free series over this boundary would hold.
    ///
    /// Comparing against the actual record count tells a scheduler whether
    /// the range has holes.
    pub fn expected_points(&self, bucket: TimeBucket) -> u64 {
        bucket.count_between(self.earliest, self.latest)
    }
}
