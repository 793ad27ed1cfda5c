//! Cache system tests

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::error::{BuddyError, BuddyResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn disk_config(dir: &TempDir) -> CacheConfig {
        CacheConfig {
            memory_capacity: 16,
            enable_disk_cache: true,
            disk_cache_dir: dir.path().join("qa"),
            disk_max_entries: 16,
            default_ttl: Some(Duration::from_secs(3600)),
        }
    }

    /// Disk tier that fails every call
    struct BrokenDisk {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CacheStorage for BrokenDisk {
        async fn get(&self, _key: &str) -> BuddyResult<Option<CacheEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BuddyError::io("disk unplugged"))
        }

        async fn set(&self, _entry: CacheEntry) -> BuddyResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BuddyError::io("disk unplugged"))
        }

        async fn remove(&self, _key: &str) -> BuddyResult<()> {
            Err(BuddyError::io("disk unplugged"))
        }

        async fn clear(&self) -> BuddyResult<()> {
            Err(BuddyError::io("disk unplugged"))
        }

        async fn statistics(&self) -> StorageStatistics {
            StorageStatistics::default()
        }

        fn tier(&self) -> CacheTier {
            CacheTier::Disk
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  What   is\tPython? \n"), "what is python?");
        assert_eq!(normalize_key("what is python?"), "what is python?");
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn test_qa_key_folds_context() {
        let plain = qa_key("What is Rust?", None);
        assert_eq!(plain, qa_key("what  is rust?", Some("   ")));
        let with_context = qa_key("What is Rust?", Some("systems programming"));
        assert_ne!(plain, with_context);
        assert_eq!(
            with_context,
            qa_key(" WHAT is Rust? ", Some("Systems   Programming"))
        );
        assert_eq!(normalize_key(&with_context), with_context);
    }

    #[tokio::test]
    async fn test_memory_storage_basic_operations() {
        let storage = MemoryStorage::new(10);
        let entry = CacheEntry::new("key1", "value", Some(Duration::from_secs(60)));

        storage.set(entry).await.unwrap();
        let retrieved = storage.get("key1").await.unwrap().unwrap();
        assert_eq!(retrieved.value, "value");
        assert_eq!(retrieved.tier, CacheTier::Memory);

        storage.remove("key1").await.unwrap();
        assert!(storage.get("key1").await.unwrap().is_none());

        let stats = storage.statistics().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_memory_storage_lru_eviction() {
        let storage = MemoryStorage::new(2);
        storage.set(CacheEntry::new("a", "1", None)).await.unwrap();
        storage.set(CacheEntry::new("b", "2", None)).await.unwrap();
        // touch a so b becomes least recently used
        storage.get("a").await.unwrap();
        storage.set(CacheEntry::new("c", "3", None)).await.unwrap();

        assert!(storage.get("a").await.unwrap().is_some());
        assert!(storage.get("b").await.unwrap().is_none());
        assert!(storage.get("c").await.unwrap().is_some());

        let stats = storage.statistics().await;
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entry_count, 2);
    }

    #[tokio::test]
    async fn test_replacing_key_is_not_an_eviction() {
        let storage = MemoryStorage::new(2);
        storage.set(CacheEntry::new("a", "1", None)).await.unwrap();
        storage.set(CacheEntry::new("a", "2", None)).await.unwrap();
        assert_eq!(storage.statistics().await.evictions, 0);
        assert_eq!(storage.get("a").await.unwrap().unwrap().value, "2");
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(&disk_config(&dir)).await;

        let outcome = cache.put("What is Python?", "A language.", None).await;
        assert_eq!(outcome, PutOutcome::Durable);

        let entry = cache.get("what is python?").await.unwrap();
        assert_eq!(entry.value, "A language.");
        assert_eq!(entry.key, "what is python?");
        assert!(entry.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(&disk_config(&dir)).await;

        cache
            .put("short lived", "gone soon", Some(Duration::from_millis(30)))
            .await;
        assert!(cache.get("short lived").await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("short lived").await.is_none());

        let stats = cache.statistics().await;
        assert_eq!(stats.memory.expired, 1);
    }

    #[tokio::test]
    async fn test_disk_tier_survives_restart_and_promotes() {
        let dir = TempDir::new().unwrap();
        let config = disk_config(&dir);
        {
            let cache = ResponseCache::open(&config).await;
            cache.put("durable question", "durable answer", None).await;
        }

        let reopened = ResponseCache::open(&config).await;
        let first = reopened.get("durable question").await.unwrap();
        assert_eq!(first.tier, CacheTier::Disk);
        assert_eq!(first.value, "durable answer");

        let second = reopened.get("durable question").await.unwrap();
        assert_eq!(second.tier, CacheTier::Memory);

        let stats = reopened.statistics().await;
        assert_eq!(stats.total_hits(), 2);
        assert_eq!(stats.disk.unwrap().hits, 1);
    }

    #[tokio::test]
    async fn test_disk_eviction_is_oldest_first() {
        let dir = TempDir::new().unwrap();
        let disk = DiskStorage::new(dir.path(), 2);
        disk.initialize().await.unwrap();

        for key in ["first", "second", "third"] {
            disk.set(CacheEntry::new(key, key, None)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(disk.get("first").await.unwrap().is_none());
        assert!(disk.get("second").await.unwrap().is_some());
        assert!(disk.get("third").await.unwrap().is_some());
        assert_eq!(disk.statistics().await.evictions, 1);

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 2);
    }

    #[tokio::test]
    async fn test_initialize_discards_corrupt_and_expired_files() {
        let dir = TempDir::new().unwrap();
        let disk = DiskStorage::new(dir.path(), 10);
        disk.initialize().await.unwrap();
        disk.set(CacheEntry::new("keep", "v", None)).await.unwrap();
        disk.set(CacheEntry::new("expire", "v", Some(Duration::from_millis(1))))
            .await
            .unwrap();
        std::fs::write(dir.path().join("garbage.json"), "{not json").unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let reopened = DiskStorage::new(dir.path(), 10);
        assert_eq!(reopened.initialize().await.unwrap(), 1);
        assert!(!dir.path().join("garbage.json").exists());
        assert!(reopened.get("keep").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_disk_failure_degrades_to_memory_only() {
        let broken = BrokenDisk {
            calls: AtomicUsize::new(0),
        };
        let cache = ResponseCache::with_storage(
            MemoryStorage::new(8),
            Box::new(broken),
            Some(Duration::from_secs(60)),
        );

        let outcome = cache.put("question", "answer", None).await;
        assert_eq!(outcome, PutOutcome::MemoryOnly);
        assert!(cache.is_degraded());

        // memory keeps serving
        assert_eq!(cache.get("question").await.unwrap().value, "answer");
        assert!(cache.get("unknown").await.is_none());
        assert!(cache.statistics().await.degraded);
    }

    #[tokio::test]
    async fn test_unusable_directory_degrades_on_open() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let config = CacheConfig {
            disk_cache_dir: blocker.join("qa"),
            ..disk_config(&dir)
        };
        let cache = ResponseCache::open(&config).await;
        assert!(cache.is_degraded());
        assert_eq!(cache.put("k", "v", None).await, PutOutcome::MemoryOnly);
        assert_eq!(cache.get("k").await.unwrap().value, "v");
    }

    #[tokio::test]
    async fn test_memory_only_cache() {
        let cache = ResponseCache::memory_only(4, None);
        assert_eq!(cache.put("k", "v", None).await, PutOutcome::MemoryOnly);
        assert!(!cache.is_degraded());
        assert!(cache.get("K").await.unwrap().expires_at.is_none());
        assert!(cache.statistics().await.disk.is_none());
    }

    #[tokio::test]
    async fn test_clear_empties_both_tiers() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(&disk_config(&dir)).await;
        cache.put("a", "1", None).await;
        cache.put("b", "2", None).await;

        cache.clear().await.unwrap();
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.statistics().await.disk.unwrap().entry_count, 0);
    }
}
