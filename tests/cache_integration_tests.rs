use chromacache::core::clock::ManualClock;
use chromacache::persistence::{PersistenceConfig, RECORD_PREFIX, RecordStore};
use chromacache::{AppCache, Clock, L1Config, OperationKind};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn build_cache(dir: &TempDir, clock: Arc<ManualClock>, config: L1Config) -> AppCache {
    let mirror = RecordStore::new(PersistenceConfig {
        directory: dir.path().to_path_buf(),
    });
    AppCache::new(config, mirror, clock)
}

#[tokio::test]
async fn test_set_get_round_trip() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(1_000_000);
    let cache = build_cache(&dir, clock, L1Config::default());

    cache
        .set("palette:sunset", b"#ff7f50,#ff6347".to_vec(), Duration::from_secs(300))
        .await
        .unwrap();

    assert_eq!(
        cache.get("palette:sunset").await,
        Some(b"#ff7f50,#ff6347".to_vec())
    );
}

#[tokio::test]
async fn test_expiry_removes_entry_from_both_tiers() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(1_000_000);
    let mirror = RecordStore::new(PersistenceConfig {
        directory: dir.path().to_path_buf(),
    });
    mirror.init().await.unwrap();
    let cache = AppCache::new(L1Config::default(), mirror.clone(), clock.clone());

    cache
        .set("ephemeral", b"x".to_vec(), Duration::from_secs(10))
        .await
        .unwrap();

    clock.advance(10_001);
    assert_eq!(cache.get("ephemeral").await, None);

    // Mirror no longer holds the record either
    let report = mirror.load_all(clock.now_ms()).await.unwrap();
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn test_warm_start_survives_restart() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(1_000_000);
    let mirror = RecordStore::new(PersistenceConfig {
        directory: dir.path().to_path_buf(),
    });
    mirror.init().await.unwrap();

    {
        let cache = AppCache::new(L1Config::default(), mirror.clone(), clock.clone());
        cache
            .set("palette:warm", b"#ff7f50".to_vec(), Duration::from_secs(3_600))
            .await
            .unwrap();
        cache
            .set("palette:cool", b"#4682b4".to_vec(), Duration::from_secs(3_600))
            .await
            .unwrap();
    }

    // Simulated restart: fresh service over the same directory
    let restarted = AppCache::new(L1Config::default(), mirror, clock.clone());
    let loaded = restarted.load_persisted().await.unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(restarted.get("palette:warm").await, Some(b"#ff7f50".to_vec()));
    assert_eq!(restarted.get("palette:cool").await, Some(b"#4682b4".to_vec()));
}

#[tokio::test]
async fn test_warm_start_tolerates_corrupt_and_expired_records() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(1_000_000);
    let mirror = RecordStore::new(PersistenceConfig {
        directory: dir.path().to_path_buf(),
    });
    mirror.init().await.unwrap();

    let cache = AppCache::new(L1Config::default(), mirror.clone(), clock.clone());
    cache
        .set("live", b"ok".to_vec(), Duration::from_secs(3_600))
        .await
        .unwrap();
    cache
        .set("stale", b"old".to_vec(), Duration::from_secs(10))
        .await
        .unwrap();

    // Hand-corrupt a record file alongside the good ones
    let corrupt = dir.path().join(format!("{RECORD_PREFIX}ffff.json"));
    tokio::fs::write(&corrupt, b"<<<not json>>>").await.unwrap();

    clock.advance(60_000);
    let restarted = AppCache::new(L1Config::default(), mirror, clock.clone());
    let loaded = restarted.load_persisted().await.unwrap();

    assert_eq!(loaded, 1);
    assert_eq!(restarted.get("live").await, Some(b"ok".to_vec()));
    assert_eq!(restarted.get("stale").await, None);
}

#[tokio::test]
async fn test_eviction_bound_under_churn() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(1_000_000);
    let cache = build_cache(
        &dir,
        clock,
        L1Config {
            initial_capacity: 20,
            min_capacity: 5,
            max_capacity: 100,
            ..Default::default()
        },
    );

    for i in 0..100 {
        cache
            .set(&format!("swatch-{i}"), vec![i as u8], Duration::from_secs(600))
            .await
            .unwrap();
    }

    let stats = cache.stats().await;
    assert!(stats.size <= 20, "resident {} exceeds capacity", stats.size);
    assert!(stats.evictions > 0);
}

#[tokio::test]
async fn test_post_operation_cleanup_matrix() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(1_000_000);
    let cache = build_cache(
        &dir,
        clock.clone(),
        L1Config {
            essential_prefixes: vec!["palette:".to_string()],
            frequency_floor: 2,
            ..Default::default()
        },
    );

    cache
        .set("palette:main", b"a".to_vec(), Duration::from_secs(3_600))
        .await
        .unwrap();
    cache
        .set("export:preview", b"b".to_vec(), Duration::from_secs(3_600))
        .await
        .unwrap();
    cache
        .set("tmp", b"c".to_vec(), Duration::from_secs(5))
        .await
        .unwrap();

    // Keep palette:main hot so the pressure purge spares it
    cache.get("palette:main").await;
    cache.get("palette:main").await;

    clock.advance(6_000);
    assert_eq!(cache.post_operation_cleanup(OperationKind::Light).await, 1);
    assert!(cache.has("export:preview").await);

    assert_eq!(cache.post_operation_cleanup(OperationKind::Heavy).await, 1);
    assert!(cache.has("palette:main").await);
    assert!(!cache.has("export:preview").await);

    assert_eq!(cache.post_operation_cleanup(OperationKind::Pressure).await, 0);
    assert!(cache.has("palette:main").await);

    assert_eq!(cache.post_operation_cleanup(OperationKind::UserAction).await, 1);
    assert_eq!(cache.stats().await.size, 0);
}

#[tokio::test]
async fn test_delete_and_clear_idempotent() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(1_000_000);
    let cache = build_cache(&dir, clock, L1Config::default());

    cache
        .set("k", b"v".to_vec(), Duration::from_secs(60))
        .await
        .unwrap();

    assert!(cache.delete("k").await);
    assert!(!cache.delete("k").await);

    cache.clear().await;
    cache.clear().await;
    assert_eq!(cache.stats().await.size, 0);
}
