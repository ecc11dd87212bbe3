use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use time::OffsetDateTime;
use tracing::{debug, info};

use super::types::RevocationList;

/// Result of looking a distribution point up in the cache
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Present and before its next update
    Fresh(Arc<RevocationList>),
    /// Present but due for a refetch
    Stale(Arc<RevocationList>),
    Miss,
}

/// CRLs indexed by distribution point URL.
///
/// The lock only guards map access and is never held across network I/O.
/// Two threads refreshing the same URL both fetch; the last store wins.
#[derive(Debug, Default)]
pub struct CrlCache {
    entries: Mutex<HashMap<String, Option<Arc<RevocationList>>>>,
}

impl CrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `url`, evicting an invalid marker if one is found
    pub fn lookup(&self, url: &str, now: OffsetDateTime) -> CacheLookup {
        let mut entries = self.entries.lock();
        match entries.get(url).cloned() {
            Some(Some(crl)) if crl.is_fresh(now) => CacheLookup::Fresh(crl),
            Some(Some(crl)) => CacheLookup::Stale(crl),
            Some(None) => {
                debug!("Evicting invalid CRL cache entry for {}", url);
                entries.remove(url);
                CacheLookup::Miss
            }
            None => CacheLookup::Miss,
        }
    }

    /// Store a freshly fetched list, replacing any previous entry
    pub fn insert(&self, url: &str, crl: Arc<RevocationList>) {
        self.entries.lock().insert(url.to_string(), Some(crl));
    }

    /// Record `url` as known-bad; the next lookup treats it as a miss
    pub fn mark_invalid(&self, url: &str) {
        self.entries.lock().insert(url.to_string(), None);
    }

    /// The cached list for `url`, fresh or not
    pub fn get(&self, url: &str) -> Option<Arc<RevocationList>> {
        self.entries.lock().get(url).cloned().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        info!("CRL cache cleared");
    }

    /// Drop stale and invalid entries, returning how many were removed
    pub fn purge_stale(&self, now: OffsetDateTime) -> usize {
        let mut entries = self.entries.lock();
        let initial_size = entries.len();
        entries.retain(|_, crl| crl.as_ref().is_some_and(|crl| crl.is_fresh(now)));
        let removed = initial_size - entries.len();

        if removed > 0 {
            info!("Removed {} stale CRLs from cache", removed);
        }

        removed
    }
}
