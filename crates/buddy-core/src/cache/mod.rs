//! Two-tier response cache for Q&A answers
//!
//! The memory tier is a bounded LRU holding a hot subset of the disk tier.
//! The disk tier is authoritative and survives restarts. Lookups go memory
//! first, then disk, promoting unexpired disk hits into memory. Writes go to
//! disk first, then memory.
//!
//! A disk failure never fails the caller: the cache logs a warning, flips to
//! memory-only mode and keeps serving from memory until the process restarts.

pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;

pub use storage::{CacheStorage, DiskStorage, MemoryStorage};
pub use types::{
    CacheConfig, CacheEntry, CacheStatistics, CacheTier, PutOutcome, StorageStatistics,
    key_digest, normalize_key, qa_key,
};

use crate::error::{BuddyError, BuddyResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache manager coordinating the memory and disk tiers
pub struct ResponseCache {
    memory: MemoryStorage,
    disk: Option<Box<dyn CacheStorage>>,
    default_ttl: Option<Duration>,
    degraded: AtomicBool,
}

impl ResponseCache {
    /// Open the cache described by `config`, loading surviving disk entries
    ///
    /// A disk tier that cannot be initialized puts the cache in degraded
    /// (memory-only) mode instead of failing.
    pub async fn open(config: &CacheConfig) -> Self {
        if !config.enable_disk_cache {
            return Self::memory_only(config.memory_capacity, config.default_ttl);
        }

        let disk = DiskStorage::new(&config.disk_cache_dir, config.disk_max_entries);
        let degraded = match disk.initialize().await {
            Ok(count) => {
                info!(
                    "Response cache opened at {} with {} entries",
                    config.disk_cache_dir.display(),
                    count
                );
                false
            }
            Err(e) => {
                warn!("Disk cache unavailable, continuing memory-only: {}", e);
                true
            }
        };

        let memory = MemoryStorage::new(config.memory_capacity);
        let cache = Self::with_storage(memory, Box::new(disk), config.default_ttl);
        cache.degraded.store(degraded, Ordering::Release);
        cache
    }

    /// Cache without a disk tier
    pub fn memory_only(memory_capacity: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            memory: MemoryStorage::new(memory_capacity),
            disk: None,
            default_ttl,
            degraded: AtomicBool::new(false),
        }
    }

    /// Cache over explicit tiers
    pub fn with_storage(
        memory: MemoryStorage,
        disk: Box<dyn CacheStorage>,
        default_ttl: Option<Duration>,
    ) -> Self {
        Self {
            memory,
            disk: Some(disk),
            default_ttl,
            degraded: AtomicBool::new(false),
        }
    }

    /// True once a disk failure switched the cache to memory-only
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn active_disk(&self) -> Option<&dyn CacheStorage> {
        if self.is_degraded() {
            None
        } else {
            self.disk.as_deref()
        }
    }

    fn degrade(&self, operation: &str, error: &BuddyError) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!(
                "Disk cache {} failed, switching to memory-only: {}",
                operation, error
            );
        }
    }

    /// Look up an unexpired entry for `key` (normalized before lookup)
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let key = normalize_key(key);

        match self.memory.get(&key).await {
            Ok(Some(entry)) => {
                debug!("Cache hit (memory)");
                return Some(entry);
            }
            Ok(None) => {}
            Err(e) => warn!("Memory cache lookup failed: {}", e),
        }

        let disk = self.active_disk()?;
        match disk.get(&key).await {
            Ok(Some(entry)) => {
                debug!("Cache hit (disk), promoting to memory");
                if let Err(e) = self.memory.set(entry.clone()).await {
                    warn!("Failed to promote cache entry: {}", e);
                }
                Some(entry)
            }
            Ok(None) => {
                debug!("Cache miss");
                None
            }
            Err(e) => {
                self.degrade("read", &e);
                None
            }
        }
    }

    /// Store `value` under `key`, using the default TTL when `ttl` is None
    pub async fn put(
        &self,
        key: &str,
        value: impl Into<String>,
        ttl: Option<Duration>,
    ) -> PutOutcome {
        let key = normalize_key(key);
        let entry = CacheEntry::new(key, value, ttl.or(self.default_ttl));

        let mut outcome = PutOutcome::MemoryOnly;
        if let Some(disk) = self.active_disk() {
            match disk.set(entry.clone()).await {
                Ok(()) => outcome = PutOutcome::Durable,
                Err(e) => self.degrade("write", &e),
            }
        }

        if let Err(e) = self.memory.set(entry).await {
            warn!("Memory cache insert failed: {}", e);
        }
        outcome
    }

    /// Remove `key` from both tiers
    pub async fn remove(&self, key: &str) -> BuddyResult<()> {
        let key = normalize_key(key);
        self.memory.remove(&key).await?;
        if let Some(disk) = self.active_disk() {
            if let Err(e) = disk.remove(&key).await {
                self.degrade("remove", &e);
            }
        }
        Ok(())
    }

    /// Clear both tiers
    pub async fn clear(&self) -> BuddyResult<()> {
        self.memory.clear().await?;
        if let Some(disk) = self.active_disk() {
            disk.clear().await?;
        }
        Ok(())
    }

    /// Per-tier statistics
    pub async fn statistics(&self) -> CacheStatistics {
        let disk = match &self.disk {
            Some(disk) => Some(disk.statistics().await),
            None => None,
        };
        CacheStatistics {
            memory: self.memory.statistics().await,
            disk,
            degraded: self.is_degraded(),
        }
    }
}
