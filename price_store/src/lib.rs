//! Price Store - Time-indexed historical price storage.
//!
//! This crate provides:
//! - Keyed storage of price observations by (asset, time bucket)
//! - Atomic batch upserts with last-write-wins for duplicate keys
//! - Point reads by timestamp and range reads by asset
//! - Per-asset data boundaries (earliest/latest stored timestamp) for
//!   backfill schedulers
//! - PostgreSQL and in-memory backends behind one `PriceStore` trait

pub mod config;
pub mod db;
pub mod error;
pub mod store;
mod types;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use store::{
    prepare_batch, InMemoryPriceStore, OperationHook, PgPriceStore, PriceStore, StoreOperation,
};
pub use types::*;
