//! Token revocation stores.
//!
//! A [`Blacklist`] remembers revoked raw tokens until their TTL runs out.
//! Implementations must be safe for concurrent use; the service calls
//! them without additional locking.
//!
//! - [`NullBlacklist`]: revocation disabled, nothing is ever revoked.
//! - [`MapBlacklist`]: one map behind one `RwLock`. Every `set` sweeps
//!   expired entries, so no background task is needed. All writers share
//!   one lock, which limits throughput under heavy logout traffic.
//! - [`ShardedBlacklist`]: `N` independent [`MapBlacklist`]s, the shard
//!   picked by a `blake3` hash of the token.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::Result;

/// Longest TTL a store accepts; longer values are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Records revoked tokens.
pub trait Blacklist: Send + Sync {
    /// Mark `token` as revoked for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn set(&self, token: &str, ttl: Duration) -> Result<()>;

    /// Returns `true` while `token` is revoked.
    fn has(&self, token: &str) -> bool;
}

/// A store that never revokes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBlacklist;

impl Blacklist for NullBlacklist {
    fn set(&self, _token: &str, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn has(&self, _token: &str) -> bool {
        false
    }
}

/// An in-memory store behind a single read/write lock.
#[derive(Debug, Default)]
pub struct MapBlacklist {
    entries: RwLock<HashMap<String, Instant>>,
}

impl MapBlacklist {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until they are purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Blacklist for MapBlacklist {
    fn set(&self, token: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let expires = now
            .checked_add(ttl.min(MAX_TTL))
            .unwrap_or(now + Duration::from_secs(60));

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, exp| *exp > now);
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!(purged, "Purged expired revocation entries");
        }
        entries.insert(token.to_string(), expires);
        Ok(())
    }

    fn has(&self, token: &str) -> bool {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(token) {
                None => return false,
                Some(exp) if *exp > now => return true,
                Some(_) => {}
            }
        }

        // Expired: purge unless a concurrent set refreshed it meanwhile.
        let mut entries = self.entries.write();
        if entries.get(token).is_some_and(|exp| *exp <= now) {
            entries.remove(token);
        }
        false
    }
}

/// An in-memory store split into independently locked shards.
#[derive(Debug)]
pub struct ShardedBlacklist {
    shards: Box<[MapBlacklist]>,
}

impl ShardedBlacklist {
    /// Default shard count.
    pub const DEFAULT_SHARDS: usize = 16;

    /// Create a store with `shards` shards, rounded up to a power of two.
    #[must_use]
    pub fn new(shards: usize) -> Self {
        let count = shards.max(1).next_power_of_two();
        Self {
            shards: (0..count).map(|_| MapBlacklist::new()).collect(),
        }
    }

    /// Number of shards.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Total stored entries across shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(MapBlacklist::len).sum()
    }

    /// Returns `true` if no shard stores an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(MapBlacklist::is_empty)
    }

    fn shard(&self, token: &str) -> &MapBlacklist {
        let hash = blake3::hash(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        // shard count is a power of two
        let index = (u64::from_le_bytes(prefix) as usize) & (self.shards.len() - 1);
        &self.shards[index]
    }
}

impl Default for ShardedBlacklist {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SHARDS)
    }
}

impl Blacklist for ShardedBlacklist {
    fn set(&self, token: &str, ttl: Duration) -> Result<()> {
        self.shard(token).set(token, ttl)
    }

    fn has(&self, token: &str) -> bool {
        self.shard(token).has(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_store_never_revokes() {
        let store = NullBlacklist;
        store.set("t", Duration::from_secs(60)).unwrap();
        assert!(!store.has("t"));
    }

    #[test]
    fn expired_read_purges_entry() {
        let store = MapBlacklist::new();
        store.set("t", Duration::ZERO).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.has("t"));
        assert!(store.is_empty());
    }

    #[test]
    fn set_sweeps_expired_entries() {
        let store = MapBlacklist::new();
        store.set("old-1", Duration::ZERO).unwrap();
        store.set("old-2", Duration::ZERO).unwrap();
        store.set("live", Duration::from_secs(60)).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.has("live"));
    }

    #[test]
    fn set_overwrites_expiry() {
        let store = MapBlacklist::new();
        store.set("t", Duration::ZERO).unwrap();
        store.set("t", Duration::from_secs(60)).unwrap();
        assert!(store.has("t"));
    }

    #[test]
    fn huge_ttl_is_clamped() {
        let store = MapBlacklist::new();
        store.set("t", Duration::MAX).unwrap();
        assert!(store.has("t"));
    }

    #[test]
    fn shard_count_is_power_of_two() {
        assert_eq!(ShardedBlacklist::new(0).shard_count(), 1);
        assert_eq!(ShardedBlacklist::new(5).shard_count(), 8);
        assert_eq!(ShardedBlacklist::default().shard_count(), 16);
    }

    #[test]
    fn shards_spread_tokens() {
        let store = ShardedBlacklist::new(4);
        for i in 0..64 {
            store.set(&format!("token-{i}"), Duration::from_secs(60)).unwrap();
        }
        assert_eq!(store.len(), 64);
        assert!(store.shards.iter().filter(|s| !s.is_empty()).count() > 1);
    }
}
