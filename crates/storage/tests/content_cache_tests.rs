//! Tests for the disk-backed content cache.

use std::collections::HashMap;
use std::time::Duration;

use poster_common::{LatLon, PosterError};
use serde::{Deserialize, Serialize};
use storage::{CacheKey, ContentCache};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    name: String,
    points: Vec<(f64, f64)>,
    tags: HashMap<String, String>,
}

fn payload(name: &str) -> Payload {
    let mut tags = HashMap::new();
    tags.insert("natural".to_string(), "water".to_string());
    Payload {
        name: name.to_string(),
        points: vec![(43.78, 5.31), (43.79, 5.32)],
        tags,
    }
}

// ============================================================================
// get / set
// ============================================================================

#[tokio::test]
async fn test_round_trip() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path().join("nested/cache"));

    let value = payload("water");
    cache.set("water_43.78_5.31_4000_natural=water", &value).await.unwrap();

    let loaded: Option<Payload> = cache.get("water_43.78_5.31_4000_natural=water").await.unwrap();
    assert_eq!(loaded, Some(value));
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().writes, 1);
}

#[tokio::test]
async fn test_coordinate_pair_round_trip() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());
    let key = CacheKey::coordinates("Lauris", "France").to_string();

    cache.set(&key, &LatLon::new(43.7833, 5.3167)).await.unwrap();
    let loaded: Option<LatLon> = cache.get(&key).await.unwrap();
    assert_eq!(loaded, Some(LatLon::new(43.7833, 5.3167)));
}

#[tokio::test]
async fn test_miss_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());

    let loaded: Option<Payload> = cache.get("never_set").await.unwrap();
    assert!(loaded.is_none());
    assert_eq!(cache.stats().misses, 1);
}

#[tokio::test]
async fn test_missing_directory_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path().join("does/not/exist"));
    let loaded: Option<Payload> = cache.get("anything").await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_key_separators_are_sanitized() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());

    cache.set("coords_a/b_c", &1u32).await.unwrap();
    assert!(dir.path().join("coords_a%2Fb_c.json").is_file());
    let loaded: Option<u32> = cache.get("coords_a/b_c").await.unwrap();
    assert_eq!(loaded, Some(1));

    cache.set("coords_a_b_c", &2u32).await.unwrap();
    let other: Option<u32> = cache.get("coords_a_b_c").await.unwrap();
    assert_eq!(other, Some(2));
    let first: Option<u32> = cache.get("coords_a/b_c").await.unwrap();
    assert_eq!(first, Some(1));
}

// ============================================================================
// Read failures
// ============================================================================

#[tokio::test]
async fn test_corrupt_entry_is_an_error() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());
    std::fs::write(cache.path_for("graph_1_2_3"), b"{ truncated").unwrap();

    let err = cache.get::<Payload>("graph_1_2_3").await.unwrap_err();
    assert!(matches!(err, PosterError::CacheRead { .. }));
}

#[tokio::test]
async fn test_wrong_shape_is_an_error() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());
    cache.set("k", &"just a string").await.unwrap();

    let err = cache.get::<Payload>("k").await.unwrap_err();
    assert!(matches!(err, PosterError::CacheRead { .. }));
}

#[tokio::test]
async fn test_unreadable_entry_is_an_error() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());
    std::fs::create_dir_all(cache.path_for("k")).unwrap();

    let err = cache.get::<u32>("k").await.unwrap_err();
    assert!(matches!(err, PosterError::CacheRead { .. }));
}

// ============================================================================
// Write failures
// ============================================================================

#[tokio::test]
async fn test_write_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("cache");
    std::fs::write(&blocker, b"a file where the directory should be").unwrap();
    let cache = ContentCache::new(&blocker);

    let err = cache.set("k", &1u32).await.unwrap_err();
    assert!(matches!(err, PosterError::CacheWrite { .. }));
    assert_eq!(cache.stats().write_failures, 1);
}

// ============================================================================
// Invalidation
// ============================================================================

#[tokio::test]
async fn test_expired_entry_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path()).with_ttl(Some(Duration::from_secs(3600)));
    std::fs::write(
        cache.path_for("old"),
        br#"{"version": 1, "stored_at": "2001-01-01T00:00:00Z", "key": "old", "value": 7}"#,
    )
    .unwrap();

    let loaded: Option<u32> = cache.get("old").await.unwrap();
    assert!(loaded.is_none());

    let forever = ContentCache::new(dir.path());
    let loaded: Option<u32> = forever.get("old").await.unwrap();
    assert_eq!(loaded, Some(7));
}

#[tokio::test]
async fn test_other_format_version_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());
    std::fs::write(
        cache.path_for("v0"),
        br#"{"version": 0, "stored_at": "2024-01-01T00:00:00Z", "value": {"old": "shape"}}"#,
    )
    .unwrap();

    let loaded: Option<Payload> = cache.get("v0").await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_invalidate_and_clear() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());
    cache.set("a", &1u32).await.unwrap();
    cache.set("b", &2u32).await.unwrap();
    cache.set("c", &3u32).await.unwrap();

    assert!(cache.invalidate("a").await.unwrap());
    assert!(!cache.invalidate("a").await.unwrap());
    assert!(cache.get::<u32>("a").await.unwrap().is_none());

    assert_eq!(cache.clear().await.unwrap(), 2);
    assert!(cache.get::<u32>("b").await.unwrap().is_none());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_same_key_never_corrupt() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());

    let mut handles = Vec::new();
    for i in 0..32 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache.set("shared", &payload(&format!("writer-{}", i))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let loaded: Payload = cache.get("shared").await.unwrap().unwrap();
    assert!(loaded.name.starts_with("writer-"));

    // no temporary files left behind
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_distinct_keys() {
    let dir = TempDir::new().unwrap();
    let cache = ContentCache::new(dir.path());

    let mut handles = Vec::new();
    for i in 0..16u32 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache.set(&format!("key_{}", i), &i).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for i in 0..16u32 {
        let loaded: Option<u32> = cache.get(&format!("key_{}", i)).await.unwrap();
        assert_eq!(loaded, Some(i));
    }
}
