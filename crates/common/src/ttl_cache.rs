//! Expiring key/value store shared by request handlers.
//!
//! Entries carry an absolute expiry computed at insertion time. Expiry is
//! lazy: [`TtlCache::get`] treats an expired entry as absent, but the entry
//! keeps occupying storage until it is overwritten, flushed, or removed by
//! [`TtlCache::delete_expired`].
//!
//! The whole table sits behind a single `tokio::sync::RwLock`, so lookups
//! run concurrently with each other while every mutation is exclusive.
//!
//! Time is read from `tokio::time::Instant`, which lets tests drive expiry
//! with a paused runtime clock.
//!
//! # Example
//!
//! ```rust,ignore
//! use common::ttl_cache::{Expiration, TtlCache};
//! use std::time::Duration;
//!
//! let cache = TtlCache::new(Expiration::After(Duration::from_secs(60)));
//! cache.set("kid-1".to_string(), pem, Expiration::Default).await;
//! let hit = cache.get("kid-1").await;
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Lifetime requested for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Use the lifetime the cache was constructed with.
    Default,

    /// The entry never expires.
    Never,

    /// The entry expires once this much time has elapsed.
    /// A zero duration is the same as [`Expiration::Default`].
    After(Duration),
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Expiration::Default
        } else {
            Expiration::After(ttl)
        }
    }
}

struct Entry<V> {
    value: V,

    /// `None` means the entry never expires.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Concurrent map whose entries disappear after a time-to-live.
pub struct TtlCache<K, V> {
    /// Lifetime applied for [`Expiration::Default`]; `None` keeps entries forever.
    default_ttl: Option<Duration>,

    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache.
    ///
    /// `default` sets the lifetime used when an entry is stored with
    /// [`Expiration::Default`]. Passing `Expiration::Default` or
    /// `Expiration::Never` here makes such entries permanent.
    #[must_use]
    pub fn new(default: Expiration) -> Self {
        let default_ttl = match default {
            Expiration::After(ttl) if !ttl.is_zero() => Some(ttl),
            _ => None,
        };

        Self {
            default_ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite `key`.
    pub async fn set(&self, key: K, value: V, ttl: impl Into<Expiration>) {
        let expires_at = self.expires_at(ttl.into(), Instant::now());
        let mut entries = self.entries.write().await;
        entries.insert(key, Entry { value, expires_at });
    }

    /// Look up `key`, returning `None` when it is absent or expired.
    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    /// Remove `key`. Returns whether an entry was stored, expired or not.
    pub async fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    /// Remove every entry.
    pub async fn flush(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Flush the cache and insert `items`, all under one write lock.
    ///
    /// Readers observe either the previous contents or the new ones, never
    /// an empty table in between.
    pub async fn replace_all<I>(&self, items: I, ttl: impl Into<Expiration>)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let expires_at = self.expires_at(ttl.into(), Instant::now());
        let mut entries = self.entries.write().await;
        entries.clear();
        entries.extend(
            items
                .into_iter()
                .map(|(key, value)| (key, Entry { value, expires_at })),
        );
    }

    /// Sweep expired entries out of storage. Returns how many were removed.
    pub async fn delete_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn expires_at(&self, ttl: Expiration, now: Instant) -> Option<Instant> {
        let lifetime = match ttl {
            Expiration::Never => None,
            Expiration::After(ttl) if !ttl.is_zero() => Some(ttl),
            Expiration::After(_) | Expiration::Default => self.default_ttl,
        };
        // An unrepresentable deadline is as good as never.
        lifetime.and_then(|ttl| now.checked_add(ttl))
    }
}
