//! Cache storage implementations

use super::types::{CacheEntry, CacheTier, StorageStatistics, key_digest};
use crate::error::{BuddyError, BuddyResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Cache storage interface
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Get an unexpired entry; expired entries are removed on the way
    async fn get(&self, key: &str) -> BuddyResult<Option<CacheEntry>>;

    /// Insert or replace an entry
    async fn set(&self, entry: CacheEntry) -> BuddyResult<()>;

    /// Remove an entry
    async fn remove(&self, key: &str) -> BuddyResult<()>;

    /// Clear all entries
    async fn clear(&self) -> BuddyResult<()>;

    /// Get storage statistics
    async fn statistics(&self) -> StorageStatistics;

    /// Tier this storage implements
    fn tier(&self) -> CacheTier;
}

struct MemoryInner {
    cache: LruCache<String, CacheEntry>,
    stats: StorageStatistics,
}

/// In-memory LRU tier
pub struct MemoryStorage {
    inner: Mutex<MemoryInner>,
}

impl MemoryStorage {
    /// Create a new memory storage holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(MemoryInner {
                cache: LruCache::new(capacity),
                stats: StorageStatistics::default(),
            }),
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn get(&self, key: &str) -> BuddyResult<Option<CacheEntry>> {
        let mut inner = self.inner.lock().await;
        let MemoryInner { cache, stats } = &mut *inner;

        match cache.get(key).cloned() {
            Some(entry) if entry.is_expired() => {
                cache.pop(key);
                stats.expired += 1;
                stats.misses += 1;
                stats.entry_count = cache.len();
                Ok(None)
            }
            Some(entry) => {
                stats.hits += 1;
                Ok(Some(entry.served_from(CacheTier::Memory)))
            }
            None => {
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, entry: CacheEntry) -> BuddyResult<()> {
        let mut inner = self.inner.lock().await;
        let MemoryInner { cache, stats } = &mut *inner;

        if let Some((evicted_key, _)) = cache.push(entry.key.clone(), entry) {
            // push returns the replaced entry for an existing key too
            if !cache.contains(&evicted_key) {
                stats.evictions += 1;
            }
        }
        stats.entry_count = cache.len();
        Ok(())
    }

    async fn remove(&self, key: &str) -> BuddyResult<()> {
        let mut inner = self.inner.lock().await;
        inner.cache.pop(key);
        inner.stats.entry_count = inner.cache.len();
        Ok(())
    }

    async fn clear(&self) -> BuddyResult<()> {
        let mut inner = self.inner.lock().await;
        inner.cache.clear();
        inner.stats = StorageStatistics::default();
        Ok(())
    }

    async fn statistics(&self) -> StorageStatistics {
        self.inner.lock().await.stats.clone()
    }

    fn tier(&self) -> CacheTier {
        CacheTier::Memory
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    path: PathBuf,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct DiskIndex {
    /// Keyed by digest of the normalized key
    entries: HashMap<String, IndexEntry>,
    stats: StorageStatistics,
}

impl DiskIndex {
    fn oldest(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.created_at)
            .map(|(digest, _)| digest.clone())
    }
}

/// Durable JSON-file tier with oldest-first eviction
///
/// Every entry lives in `<dir>/<sha256(key)>.json`. The index lock is held
/// across file operations so a single `set` or `get` is atomic with respect
/// to other calls on the same tier.
pub struct DiskStorage {
    base_dir: PathBuf,
    max_entries: usize,
    index: Mutex<DiskIndex>,
}

impl DiskStorage {
    /// Create a disk storage rooted at `base_dir`; call [`initialize`](Self::initialize)
    /// before use to pick up entries from a previous run
    pub fn new(base_dir: impl AsRef<Path>, max_entries: usize) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            max_entries: max_entries.max(1),
            index: Mutex::new(DiskIndex::default()),
        }
    }

    /// Create the directory and rebuild the index from the files present
    ///
    /// Expired and unreadable files are deleted. Returns the number of live
    /// entries found.
    pub async fn initialize(&self) -> BuddyResult<usize> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            BuddyError::io_with_path(
                format!("Failed to create cache directory: {}", e),
                self.base_dir.display().to_string(),
            )
        })?;

        let mut index = self.index.lock().await;
        index.entries.clear();

        let mut dir = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| BuddyError::io(format!("Failed to read cache directory: {}", e)))?;

        while let Some(file) = dir
            .next_entry()
            .await
            .map_err(|e| BuddyError::io(format!("Failed to read directory entry: {}", e)))?
        {
            let path = file.path();
            let Some(digest) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(".json"))
                .map(str::to_string)
            else {
                continue;
            };

            match read_entry(&path).await {
                Some(entry) if !entry.is_expired() && key_digest(&entry.key) == digest => {
                    index.entries.insert(
                        digest,
                        IndexEntry {
                            path,
                            created_at: entry.created_at,
                        },
                    );
                }
                _ => {
                    debug!("Discarding stale cache file {}", path.display());
                    let _ = fs::remove_file(&path).await;
                }
            }
        }

        while index.entries.len() > self.max_entries {
            self.evict_oldest(&mut index).await;
        }
        index.stats.entry_count = index.entries.len();
        Ok(index.entries.len())
    }

    fn file_path(&self, digest: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", digest))
    }

    async fn evict_oldest(&self, index: &mut DiskIndex) {
        if let Some(digest) = index.oldest() {
            if let Some(entry) = index.entries.remove(&digest) {
                if let Err(e) = fs::remove_file(&entry.path).await {
                    warn!("Failed to remove evicted cache file: {}", e);
                }
                index.stats.evictions += 1;
            }
        }
    }
}

async fn read_entry(path: &Path) -> Option<CacheEntry> {
    let content = fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&content).ok()
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn get(&self, key: &str) -> BuddyResult<Option<CacheEntry>> {
        let digest = key_digest(key);
        let mut index = self.index.lock().await;

        let Some(path) = index.entries.get(&digest).map(|e| e.path.clone()) else {
            index.stats.misses += 1;
            return Ok(None);
        };

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                index.entries.remove(&digest);
                index.stats.misses += 1;
                index.stats.entry_count = index.entries.len();
                return Ok(None);
            }
            Err(e) => {
                return Err(BuddyError::io_with_path(
                    format!("Failed to read cache file: {}", e),
                    path.display().to_string(),
                ));
            }
        };

        let entry = match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) if entry.key == key => entry,
            _ => {
                // Corrupted or colliding entry
                index.entries.remove(&digest);
                let _ = fs::remove_file(&path).await;
                index.stats.misses += 1;
                index.stats.entry_count = index.entries.len();
                return Ok(None);
            }
        };

        if entry.is_expired() {
            index.entries.remove(&digest);
            let _ = fs::remove_file(&path).await;
            index.stats.expired += 1;
            index.stats.misses += 1;
            index.stats.entry_count = index.entries.len();
            return Ok(None);
        }

        index.stats.hits += 1;
        Ok(Some(entry.served_from(CacheTier::Disk)))
    }

    async fn set(&self, entry: CacheEntry) -> BuddyResult<()> {
        let digest = key_digest(&entry.key);
        let path = self.file_path(&digest);
        let content = serde_json::to_string_pretty(&entry)?;

        let mut index = self.index.lock().await;

        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            BuddyError::io_with_path(
                format!("Failed to create cache directory: {}", e),
                self.base_dir.display().to_string(),
            )
        })?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await.map_err(|e| {
            BuddyError::io_with_path(
                format!("Failed to write cache file: {}", e),
                tmp_path.display().to_string(),
            )
        })?;
        fs::rename(&tmp_path, &path).await.map_err(|e| {
            BuddyError::io_with_path(
                format!("Failed to move cache file into place: {}", e),
                path.display().to_string(),
            )
        })?;

        index.entries.insert(
            digest.clone(),
            IndexEntry {
                path,
                created_at: entry.created_at,
            },
        );
        while index.entries.len() > self.max_entries {
            self.evict_oldest(&mut index).await;
        }
        index.stats.entry_count = index.entries.len();
        Ok(())
    }

    async fn remove(&self, key: &str) -> BuddyResult<()> {
        let digest = key_digest(key);
        let mut index = self.index.lock().await;
        if let Some(entry) = index.entries.remove(&digest) {
            match fs::remove_file(&entry.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        index.stats.entry_count = index.entries.len();
        Ok(())
    }

    async fn clear(&self) -> BuddyResult<()> {
        let mut index = self.index.lock().await;
        for (_, entry) in index.entries.drain() {
            let _ = fs::remove_file(&entry.path).await;
        }
        index.stats = StorageStatistics::default();
        Ok(())
    }

    async fn statistics(&self) -> StorageStatistics {
        self.index.lock().await.stats.clone()
    }

    fn tier(&self) -> CacheTier {
        CacheTier::Disk
    }
}
