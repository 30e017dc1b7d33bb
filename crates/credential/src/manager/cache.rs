//! Expiry-aware credential cache with hit/miss tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

use crate::core::CredentialScope;
use crate::credential::Credential;
use crate::utils::time::duration_millis;

/// Identity of a cached credential: who issued it and for what.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Catalog name
    pub catalog: String,
    /// Provider name within the catalog
    pub provider: String,
    /// Requested scope
    pub scope: CredentialScope,
}

impl CacheKey {
    /// Build a key
    pub fn new(
        catalog: impl Into<String>,
        provider: impl Into<String>,
        scope: CredentialScope,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            provider: provider.into(),
            scope,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.catalog, self.provider, self.scope)
    }
}

/// Last credential issued for a key plus issuance metadata
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub(crate) credential: Credential,
    pub(crate) issued_at_ms: i64,
    /// `None` for credentials that never expire
    pub(crate) refresh_at_ms: Option<i64>,
    pub(crate) generation: u64,
}

impl CacheEntry {
    pub(crate) fn new(
        credential: Credential,
        issued_at_ms: i64,
        safety_margin: Duration,
        generation: u64,
    ) -> Self {
        let refresh_at_ms = refresh_point(&credential, issued_at_ms, safety_margin);
        Self {
            credential,
            issued_at_ms,
            refresh_at_ms,
            generation,
        }
    }

    /// Usable without a refresh at `now_ms`
    pub(crate) fn is_fresh(&self, now_ms: i64) -> bool {
        self.refresh_at_ms.is_none_or(|refresh_at| now_ms < refresh_at)
    }

    pub(crate) fn is_expired(&self, now_ms: i64) -> bool {
        self.credential.is_expired_at(now_ms)
    }
}

/// Instant at which a credential should be replaced.
///
/// `expire - margin`, with the margin capped at half the lifetime the
/// credential had when issued so short-lived credentials are still cached.
pub(crate) fn refresh_point(
    credential: &Credential,
    issued_at_ms: i64,
    safety_margin: Duration,
) -> Option<i64> {
    if !credential.expires() {
        return None;
    }
    let expire = credential.expire_time_ms();
    let lifetime = expire.saturating_sub(issued_at_ms).max(0);
    let margin = duration_millis(safety_margin).min(lifetime / 2);
    Some(expire - margin)
}

/// Concurrent cache keyed by [`CacheKey`].
///
/// Sharded, so lookups for unrelated keys never contend on one lock.
pub(crate) struct CredentialCache {
    entries: DashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    generations: AtomicU64,
    generation_failures: AtomicU64,
    evictions: AtomicU64,
}

impl CredentialCache {
    pub(crate) fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            generations: AtomicU64::new(0),
            generation_failures: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Fresh credential for `key`, counting a hit or a miss
    pub(crate) fn lookup(&self, key: &CacheKey, now_ms: i64) -> Option<Credential> {
        match self.peek_fresh(key, now_ms) {
            Some(credential) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(credential)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Fresh credential for `key`, without touching the counters
    pub(crate) fn peek_fresh(&self, key: &CacheKey, now_ms: i64) -> Option<Credential> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now_ms))
            .map(|entry| entry.credential.clone())
    }

    /// Store a newly issued credential, replacing the previous one.
    ///
    /// Returns the entry's generation: 1 for the first credential of a key.
    pub(crate) fn insert(
        &self,
        key: CacheKey,
        credential: Credential,
        now_ms: i64,
        safety_margin: Duration,
    ) -> u64 {
        let previous = self.entries.get(&key).map(|entry| entry.generation);
        if previous.is_none() && self.entries.len() >= self.max_entries {
            self.make_room(now_ms);
        }
        let generation = previous.unwrap_or(0) + 1;
        self.entries.insert(
            key,
            CacheEntry::new(credential, now_ms, safety_margin, generation),
        );
        generation
    }

    /// Drop the entry for `key` if its credential has expired
    pub(crate) fn evict_if_expired(&self, key: &CacheKey, now_ms: i64) -> bool {
        let removed = self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now_ms))
            .is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Drop every entry of `catalog`, returning how many were removed
    pub(crate) fn purge_catalog(&self, catalog: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.catalog != catalog);
        before.saturating_sub(self.entries.len())
    }

    pub(crate) fn record_generation(&self) {
        self.generations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            generations: self.generations.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.entries.len(),
            max_entries: self.max_entries,
        }
    }

    /// Expired entries go first; if the cache is still full the entry issued
    /// longest ago is dropped.
    fn make_room(&self, now_ms: i64) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now_ms));
        let mut evicted = before.saturating_sub(self.entries.len()) as u64;

        if self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.issued_at_ms)
                .map(|entry| entry.key().clone());
            if let Some(key) = oldest {
                if self.entries.remove(&key).is_some() {
                    evicted += 1;
                }
            }
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            tracing::debug!(evicted, "Evicted credentials to make room");
        }
    }
}

/// Cache performance statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,

    /// Lookups that needed a refresh
    pub misses: u64,

    /// Credentials successfully generated by providers
    pub generations: u64,

    /// Provider calls that failed
    pub generation_failures: u64,

    /// Entries removed because they expired or to make room
    pub evictions: u64,

    /// Current number of cached credentials
    pub size: usize,

    /// Maximum cache capacity
    pub max_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate as percentage (0.0 - 1.0)
    ///
    /// Returns 0.0 if no requests yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Check if cache is at maximum capacity
    pub fn is_full(&self) -> bool {
        self.size >= self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::credential::builtin::{S3SecretKey, S3Token};

    fn token(expire_time_ms: i64) -> Credential {
        S3Token::credential("id", "secret", "session", expire_time_ms).unwrap()
    }

    fn key(catalog: &str) -> CacheKey {
        CacheKey::new(catalog, "s3-token", CredentialScope::Catalog)
    }

    #[rstest]
    // one hour token, five minute margin
    #[case::margin_applies(0, 3_600_000, 300, Some(3_300_000))]
    // ten second token: margin capped at half the lifetime
    #[case::margin_capped(0, 10_000, 300, Some(5_000))]
    // already expired when issued
    #[case::expired(5_000, 1_000, 300, Some(1_000))]
    fn refresh_points(
        #[case] issued_at_ms: i64,
        #[case] expire_time_ms: i64,
        #[case] margin_secs: u64,
        #[case] expected: Option<i64>,
    ) {
        assert_eq!(
            refresh_point(
                &token(expire_time_ms),
                issued_at_ms,
                Duration::from_secs(margin_secs)
            ),
            expected
        );
    }

    #[test]
    fn fixed_credentials_never_refresh() {
        let credential = S3SecretKey::credential("id", "secret").unwrap();
        let entry = CacheEntry::new(credential, 0, Duration::from_secs(300), 1);
        assert_eq!(entry.refresh_at_ms, None);
        assert!(entry.is_fresh(i64::MAX));
    }

    #[test]
    fn lookup_counts_hits_and_misses() {
        let cache = CredentialCache::new(10);
        assert!(cache.lookup(&key("a"), 0).is_none());

        cache.insert(key("a"), token(10_000), 0, Duration::from_secs(1));
        assert!(cache.lookup(&key("a"), 1_000).is_some());
        // inside the margin: stale
        assert!(cache.lookup(&key("a"), 9_500).is_none());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 2, 1));
    }

    #[test]
    fn generations_increase_per_key() {
        let cache = CredentialCache::new(10);
        assert_eq!(cache.insert(key("a"), token(10_000), 0, Duration::ZERO), 1);
        assert_eq!(cache.insert(key("a"), token(20_000), 0, Duration::ZERO), 2);
        assert_eq!(cache.insert(key("b"), token(20_000), 0, Duration::ZERO), 1);
        assert_eq!(cache.entry(&key("a")).unwrap().generation, 2);
    }

    #[test]
    fn evicts_only_expired() {
        let cache = CredentialCache::new(10);
        cache.insert(key("a"), token(10_000), 0, Duration::ZERO);

        assert!(!cache.evict_if_expired(&key("a"), 9_999));
        assert!(cache.evict_if_expired(&key("a"), 10_000));
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.entry(&key("a")).is_none());
    }

    #[test]
    fn capacity_prefers_expired_then_oldest() {
        let cache = CredentialCache::new(2);
        cache.insert(key("old"), token(100_000), 0, Duration::ZERO);
        cache.insert(key("short"), token(1_000), 10, Duration::ZERO);

        // "short" has expired by now and goes first
        cache.insert(key("new"), token(100_000), 2_000, Duration::ZERO);
        assert!(cache.entry(&key("short")).is_none());
        assert!(cache.entry(&key("old")).is_some());

        // nothing expired: the oldest issued goes
        cache.insert(key("newer"), token(100_000), 3_000, Duration::ZERO);
        assert!(cache.entry(&key("old")).is_none());
        assert_eq!(cache.stats().size, 2);
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn purge_catalog_leaves_others() {
        let cache = CredentialCache::new(10);
        cache.insert(key("a"), token(10_000), 0, Duration::ZERO);
        cache.insert(
            CacheKey::new("a", "s3-token", CredentialScope::read_only(["s3://b/x"])),
            token(10_000),
            0,
            Duration::ZERO,
        );
        cache.insert(key("b"), token(10_000), 0, Duration::ZERO);

        assert_eq!(cache.purge_catalog("a"), 2);
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn hit_rate_zero_requests() {
        assert_eq!(CredentialCache::new(1).stats().hit_rate(), 0.0);
    }
}
