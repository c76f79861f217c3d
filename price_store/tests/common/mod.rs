//! Behaviour every `PriceStore` backend must share.
//!
//! Each check starts from `delete_all` so the suite can run against a
//! database that already holds data.

#![allow(dead_code)]

use price_store::{AssetId, DataBoundary, PriceRecord, PriceStore, StoreError, UnixTime};
use std::collections::{BTreeMap, BTreeSet};

pub const HOUR: i64 = 3600;

pub fn asset(id: &str) -> AssetId {
    AssetId::new(id).unwrap()
}

pub fn record(id: &str, ts: i64, price: f64) -> PriceRecord {
    PriceRecord::new(asset(id), UnixTime::new(ts), price)
}

/// Records as a comparable (asset, timestamp) -> price map
pub fn as_map(records: &[PriceRecord]) -> BTreeMap<(String, i64), f64> {
    records
        .iter()
        .map(|r| ((r.asset.to_string(), r.timestamp.as_secs()), r.price))
        .collect()
}

pub async fn upsert_merges_by_key(store: &impl PriceStore) {
    store.delete_all().await.unwrap();

    store
        .add_or_update(&[record("BTC", 100 * HOUR, 50000.0), record("ETH", 100 * HOUR, 3000.0)])
        .await
        .unwrap();
    store
        .add_or_update(&[record("BTC", 100 * HOUR, 51000.0), record("BTC", 200 * HOUR, 52000.0)])
        .await
        .unwrap();

    let btc = store.get_all_by_asset(&asset("btc")).await.unwrap();
    assert_eq!(
        as_map(&btc),
        as_map(&[record("btc", 100 * HOUR, 51000.0), record("btc", 200 * HOUR, 52000.0)])
    );

    let boundaries = store.get_data_boundaries().await.unwrap();
    assert_eq!(boundaries.len(), 2);
    assert_eq!(
        boundaries[&asset("btc")],
        DataBoundary::new(UnixTime::new(100 * HOUR), UnixTime::new(200 * HOUR))
    );
    assert_eq!(
        boundaries[&asset("eth")],
        DataBoundary::new(UnixTime::new(100 * HOUR), UnixTime::new(100 * HOUR))
    );
}

pub async fn upsert_leaves_other_keys_untouched(store: &impl PriceStore) {
    store.delete_all().await.unwrap();

    let before = vec![
        record("btc", 0, 1.0),
        record("eth", 0, 2.0),
        record("sol", HOUR, 3.0),
    ];
    store.add_or_update(&before).await.unwrap();

    let batch = vec![
        record("eth", 0, 20.0),
        record("eth", HOUR, 21.0),
        record("eth", 0, 22.0),
    ];
    store.add_or_update(&batch).await.unwrap();

    let mut expected = as_map(&before);
    expected.extend(as_map(&batch));
    assert_eq!(expected[&("eth".to_string(), 0)], 22.0);

    assert_eq!(as_map(&store.get_all().await.unwrap()), expected);
}

pub async fn upsert_is_idempotent(store: &impl PriceStore) {
    store.delete_all().await.unwrap();

    let batch = vec![
        record("btc", 0, 1.0),
        record("btc", HOUR, 2.0),
        record("btc", HOUR, 2.5),
        record("dai", 0, 1.0),
    ];
    store.add_or_update(&batch).await.unwrap();
    let once = as_map(&store.get_all().await.unwrap());

    store.add_or_update(&batch).await.unwrap();
    let twice = as_map(&store.get_all().await.unwrap());

    assert_eq!(once, twice);
    assert_eq!(twice.len(), 3);
}

pub async fn empty_batch_is_a_no_op(store: &impl PriceStore) {
    store.delete_all().await.unwrap();
    store.add_or_update(&[record("btc", 0, 1.0)]).await.unwrap();

    store.add_or_update(&[]).await.unwrap();

    assert_eq!(store.get_all().await.unwrap().len(), 1);
}

pub async fn invalid_batch_is_rejected_whole(store: &impl PriceStore) {
    store.delete_all().await.unwrap();
    store.add_or_update(&[record("btc", 0, 1.0)]).await.unwrap();

    let unaligned = store
        .add_or_update(&[record("btc", 0, 9.0), record("eth", HOUR + 1, 1.0)])
        .await;
    assert!(matches!(unaligned, Err(StoreError::InvalidRecord { index: 1, .. })));

    let negative = store
        .add_or_update(&[record("eth", 0, -1.0), record("btc", 0, 9.0)])
        .await;
    assert!(matches!(negative, Err(StoreError::InvalidRecord { index: 0, .. })));

    assert_eq!(
        as_map(&store.get_all().await.unwrap()),
        as_map(&[record("btc", 0, 1.0)])
    );
}

pub async fn by_timestamp_matches_filtered_get_all(store: &impl PriceStore) {
    store.delete_all().await.unwrap();
    store
        .add_or_update(&[
            record("btc", 0, 1.0),
            record("btc", HOUR, 2.0),
            record("eth", HOUR, 3.0),
            record("sol", 2 * HOUR, 4.0),
        ])
        .await
        .unwrap();

    let all = store.get_all().await.unwrap();
    for ts in [0, HOUR, 2 * HOUR, 99 * HOUR] {
        let expected: Vec<PriceRecord> = all
            .iter()
            .filter(|r| r.timestamp == UnixTime::new(ts))
            .cloned()
            .collect();
        let found = store.get_by_timestamp(UnixTime::new(ts)).await.unwrap();
        assert_eq!(as_map(&found), as_map(&expected), "timestamp {}", ts);
    }

    assert!(store
        .get_by_timestamp(UnixTime::new(99 * HOUR))
        .await
        .unwrap()
        .is_empty());
}

pub async fn unknown_asset_is_empty(store: &impl PriceStore) {
    store.delete_all().await.unwrap();
    store.add_or_update(&[record("btc", 0, 1.0)]).await.unwrap();

    let found = store.get_all_by_asset(&asset("never-written")).await.unwrap();
    assert!(found.is_empty());
}

pub async fn boundaries_agree_with_asset_reads(store: &impl PriceStore) {
    store.delete_all().await.unwrap();
    store
        .add_or_update(&[
            record("btc", 5 * HOUR, 1.0),
            record("btc", -HOUR, 1.0),
            record("btc", 2 * HOUR, 1.0),
            record("eth", 7 * HOUR, 1.0),
        ])
        .await
        .unwrap();

    let boundaries = store.get_data_boundaries().await.unwrap();
    for id in ["btc", "eth", "sol"] {
        let records = store.get_all_by_asset(&asset(id)).await.unwrap();
        match boundaries.get(&asset(id)) {
            Some(boundary) => {
                let timestamps: BTreeSet<UnixTime> = records.iter().map(|r| r.timestamp).collect();
                assert_eq!(boundary.earliest, *timestamps.iter().next().unwrap());
                assert_eq!(boundary.latest, *timestamps.iter().next_back().unwrap());
            }
            None => assert!(records.is_empty(), "{} has data but no boundary", id),
        }
    }
    assert!(!boundaries.contains_key(&asset("sol")));
}

pub async fn delete_all_clears_everything(store: &impl PriceStore) {
    store
        .add_or_update(&[record("btc", 0, 1.0), record("eth", HOUR, 2.0)])
        .await
        .unwrap();

    store.delete_all().await.unwrap();

    assert!(store.get_all().await.unwrap().is_empty());
    assert!(store.get_data_boundaries().await.unwrap().is_empty());
}

pub async fn run_contract(store: &impl PriceStore) {
    upsert_merges_by_key(store).await;
    upsert_leaves_other_keys_untouched(store).await;
    upsert_is_idempotent(store).await;
    empty_batch_is_a_no_op(store).await;
    invalid_batch_is_rejected_whole(store).await;
    by_timestamp_matches_filtered_get_all(store).await;
    unknown_asset_is_empty(store).await;
    boundaries_agree_with_asset_reads(store).await;
    delete_all_clears_everything(store).await;
}
