//! Cache types and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;

/// Separates the question from caller context inside a composite key
const CONTEXT_SEPARATOR: char = '\u{1f}';

/// Normalize free text into a cache key: trimmed, whitespace-collapsed,
/// case-folded
pub fn normalize_key(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Build the key for a question answered with optional caller context
pub fn qa_key(question: &str, context: Option<&str>) -> String {
    let question = normalize_key(question);
    match context.map(normalize_key) {
        Some(context) if !context.is_empty() => {
            format!("{}{}{}", question, CONTEXT_SEPARATOR, context)
        }
        _ => question,
    }
}

/// Stable file-name-safe digest of a normalized key
pub fn key_digest(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Tier an entry was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    #[default]
    Memory,
    Disk,
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheTier::Memory => write!(f, "memory"),
            CacheTier::Disk => write!(f, "disk"),
        }
    }
}

/// Cached answer plus metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized key
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    /// When the entry expires (None means no expiration)
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub tier: CacheTier,
}

impl CacheEntry {
    /// Create a new cache entry
    pub fn new(key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) -> Self {
        let now = Utc::now();
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl));

        Self {
            key: key.into(),
            value: value.into(),
            created_at: now,
            expires_at,
            tier: CacheTier::Memory,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() >= expires_at)
    }

    pub(crate) fn served_from(mut self, tier: CacheTier) -> Self {
        self.tier = tier;
        self
    }
}

/// Response cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memory tier capacity (number of entries)
    pub memory_capacity: usize,
    /// Enable the durable disk tier
    pub enable_disk_cache: bool,
    /// Disk tier directory
    pub disk_cache_dir: PathBuf,
    /// Disk tier capacity (number of entries)
    pub disk_max_entries: usize,
    /// Default TTL for answers
    #[serde(with = "humantime_serde")]
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: 1000,
            enable_disk_cache: true,
            disk_cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("coder-buddy")
                .join("qa"),
            disk_max_entries: 10_000,
            default_ttl: Some(Duration::from_secs(24 * 60 * 60)),
        }
    }
}

/// Counters kept by a single tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStatistics {
    pub hits: u64,
    pub misses: u64,
    /// Entries removed for capacity
    pub evictions: u64,
    /// Entries removed because their TTL passed
    pub expired: u64,
    pub entry_count: usize,
}

/// Statistics for the whole two-tier cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub memory: StorageStatistics,
    /// Disk tier statistics (if enabled)
    pub disk: Option<StorageStatistics>,
    /// True once a disk failure switched the cache to memory-only
    pub degraded: bool,
}

impl CacheStatistics {
    /// Hits served by either tier
    pub fn total_hits(&self) -> u64 {
        self.memory.hits + self.disk.as_ref().map_or(0, |d| d.hits)
    }

    /// Lookups that found nothing in any tier
    pub fn total_misses(&self) -> u64 {
        match &self.disk {
            Some(disk) if !self.degraded => disk.misses,
            _ => self.memory.misses,
        }
    }

    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_hits() + self.total_misses();
        if total == 0 {
            0.0
        } else {
            self.total_hits() as f64 / total as f64
        }
    }
}

/// Where a `put` ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PutOutcome {
    /// Written to disk and memory
    Durable,
    /// Held in memory only (disk disabled or degraded)
    MemoryOnly,
}
