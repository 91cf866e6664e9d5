//! The tier cache, per §4.2.
//!
//! A single-process map keyed by either `sub` or API-key material,
//! authoritative only for the `/user/limits[/skylink]` fast path — every
//! other handler re-reads the user from the database. Implemented as
//! `Arc<std::sync::Mutex<HashMap<..>>>` rather than an external cache
//! crate: the working set and lock hold time are both small, so plain
//! std-lib state is enough.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use meridian_auth::Tier;
use uuid::Uuid;

const ENTRY_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Sub(String),
    ApiKey(String),
    UserId(Uuid),
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    tier: Tier,
    quota_exceeded: bool,
    expires_at: Instant,
}

/// Lookup result: the effective tier, whether the user is over quota, and
/// whether the lookup was a cache hit at all (a miss means the caller
/// must fall back to a database read).
#[derive(Debug, Clone, Copy)]
pub struct CacheLookup {
    pub tier: Tier,
    pub quota_exceeded: bool,
}

#[derive(Clone, Default)]
pub struct TierCache {
    inner: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
    /// Secondary index so `invalidate_user` can drop every key an
    /// evaluation might have written under (a user may be cached by
    /// `sub`, by `UserId`, and by any API key material it owns).
    by_user: Arc<Mutex<HashMap<Uuid, Vec<CacheKey>>>>,
}

impl TierCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(1) lookup. Entries are lazily dropped on next write collision
    /// (§4.2/§5: "no background eviction task") — a stale-but-unwritten
    /// entry is simply treated as a miss here.
    pub fn get(&self, key: &CacheKey) -> Option<CacheLookup> {
        let guard = self.inner.lock().unwrap();
        let entry = guard.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(CacheLookup {
            tier: entry.tier,
            quota_exceeded: entry.quota_exceeded,
        })
    }

    /// Write-serialized insert/refresh, per §4.2 "writes are
    /// lock-serialized." `user_id` is recorded against the key so a
    /// later quota transition or tier change can invalidate it without
    /// knowing the original lookup key.
    pub fn put(&self, key: CacheKey, user_id: Uuid, tier: Tier, quota_exceeded: bool) {
        let entry = CacheEntry {
            tier,
            quota_exceeded,
            expires_at: Instant::now() + ENTRY_TTL,
        };
        self.inner.lock().unwrap().insert(key.clone(), entry);
        self.by_user.lock().unwrap().entry(user_id).or_default().push(key);
    }

    /// Invalidated by: subscription-reconciler updates, explicit tier
    /// changes, quota transitions (§4.2).
    pub fn invalidate_user(&self, user_id: Uuid) {
        let keys = self.by_user.lock().unwrap().remove(&user_id).unwrap_or_default();
        if keys.is_empty() {
            return;
        }
        let mut guard = self.inner.lock().unwrap();
        for key in keys {
            guard.remove(&key);
        }
    }
}
