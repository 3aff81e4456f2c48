//! Disk-backed content cache.
//!
//! One JSON file per key under the cache directory. Each file wraps the
//! cached value in an envelope carrying a format version and the time it
//! was stored:
//!
//! ```json
//! {"version": 1, "stored_at": "2024-03-05T14:07:09Z", "value": ...}
//! ```
//!
//! Reads distinguish "absent" (`Ok(None)`) from "present but unreadable"
//! (`Err(CacheRead)`). Entries written by another format version, or older
//! than the configured TTL, read as absent. Writes land in a unique temporary
//! file that is renamed into place, so concurrent writers to the same key
//! never leave a partial file behind; the last rename wins.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, instrument};
use uuid::Uuid;

use poster_common::{PosterError, PosterResult};

/// Bumped whenever a cached payload changes shape.
pub const CACHE_FORMAT_VERSION: u32 = 1;

const CACHE_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

#[derive(Serialize)]
struct EnvelopeOut<'a, T: ?Sized> {
    version: u32,
    stored_at: DateTime<Utc>,
    key: &'a str,
    value: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn<T> {
    version: u32,
    stored_at: DateTime<Utc>,
    value: T,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    version: u32,
}

/// Cache statistics for this process.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
}

/// Key-addressed persistent store. Cheap to clone; clones share statistics.
#[derive(Debug, Clone)]
pub struct ContentCache {
    dir: PathBuf,
    ttl: Option<Duration>,
    counters: Arc<Counters>,
}

impl ContentCache {
    /// Cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Treat entries older than `ttl` as absent. `None` keeps entries forever.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`: `%` and characters that are unsafe in file names
    /// are percent-escaped, so distinct keys never share a file.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_key(key), CACHE_EXTENSION))
    }

    /// Look up a stored value.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> PosterResult<Option<T>> {
        let path = self.path_for(key);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.record_miss();
                return Ok(None);
            }
            Err(e) => return Err(read_error(key, format!("{}: {}", path.display(), e))),
        };

        let envelope: EnvelopeIn<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                // A different format version is stale, not corrupt.
                if let Ok(header) = serde_json::from_slice::<EnvelopeHeader>(&bytes) {
                    if header.version != CACHE_FORMAT_VERSION {
                        debug!(key, version = header.version, "Ignoring cache entry from other format version");
                        self.record_miss();
                        return Ok(None);
                    }
                }
                return Err(read_error(key, format!("corrupt entry {}: {}", path.display(), e)));
            }
        };

        if envelope.version != CACHE_FORMAT_VERSION {
            debug!(key, version = envelope.version, "Ignoring cache entry from other format version");
            self.record_miss();
            return Ok(None);
        }

        if let Some(ttl) = self.ttl {
            let age = Utc::now().signed_duration_since(envelope.stored_at);
            if age.to_std().map(|age| age > ttl).unwrap_or(false) {
                debug!(key, age_secs = age.num_seconds(), "Cache entry expired");
                self.record_miss();
                return Ok(None);
            }
        }

        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        counter!("poster_cache_hits_total").increment(1);
        Ok(Some(envelope.value))
    }

    /// Persist a value, creating the cache directory if needed.
    #[instrument(skip(self, value), fields(dir = %self.dir.display()))]
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PosterResult<()> {
        let result = self.write_entry(key, value).await;
        match &result {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
                counter!("poster_cache_write_failures_total").increment(1);
            }
        }
        result
    }

    async fn write_entry<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PosterResult<()> {
        let envelope = EnvelopeOut {
            version: CACHE_FORMAT_VERSION,
            stored_at: Utc::now(),
            key,
            value,
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| write_error(key, format!("serialization failed: {}", e)))?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| write_error(key, format!("{}: {}", self.dir.display(), e)))?;

        let path = self.path_for(key);
        let temp = self.dir.join(format!(
            ".{}.{}.{}",
            sanitize_key(key),
            Uuid::new_v4().simple(),
            TEMP_EXTENSION
        ));

        if let Err(e) = fs::write(&temp, &bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(write_error(key, format!("{}: {}", temp.display(), e)));
        }
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(write_error(key, format!("{}: {}", path.display(), e)));
        }

        debug!(key, bytes = bytes.len(), "Cached entry");
        Ok(())
    }

    /// Remove one entry. Returns whether it existed.
    pub async fn invalidate(&self, key: &str) -> PosterResult<bool> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(write_error(key, e.to_string())),
        }
    }

    /// Remove every entry and leftover temporary file. Returns the number of
    /// entries removed.
    pub async fn clear(&self) -> PosterResult<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(write_error("*", e.to_string())),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| write_error("*", e.to_string()))?
        {
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if ext == Some(CACHE_EXTENSION) || ext == Some(TEMP_EXTENSION) {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| write_error("*", format!("{}: {}", path.display(), e)))?;
                if ext == Some(CACHE_EXTENSION) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        }
    }

    fn record_miss(&self) {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        counter!("poster_cache_misses_total").increment(1);
    }
}

fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => {
                out.push_str(&format!("%{:02X}", c as u32))
            }
            c if c.is_control() => {
                for b in c.to_string().bytes() {
                    out.push_str(&format!("%{:02X}", b));
                }
            }
            c => out.push(c),
        }
    }
    out
}

fn read_error(key: &str, message: String) -> PosterError {
    PosterError::CacheRead {
        key: key.to_string(),
        message,
    }
}

fn write_error(key: &str, message: String) -> PosterError {
    PosterError::CacheWrite {
        key: key.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_separators() {
        assert_eq!(sanitize_key("coords_a/b_c\\d"), "coords_a%2Fb_c%5Cd");
        assert_ne!(sanitize_key("coords_a/b"), sanitize_key("coords_a:b"));
        assert_ne!(sanitize_key("coords_a/b"), sanitize_key("coords_a_b"));
        assert_eq!(sanitize_key("a%2Fb"), "a%252Fb");
        assert_eq!(sanitize_key("water_1.5_2.5_100_natural=water"), "water_1.5_2.5_100_natural=water");
    }

    #[test]
    fn test_path_for_appends_extension() {
        let cache = ContentCache::new("/tmp/poster-cache");
        assert_eq!(
            cache.path_for("graph_1_2_3"),
            PathBuf::from("/tmp/poster-cache/graph_1_2_3.json")
        );
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
