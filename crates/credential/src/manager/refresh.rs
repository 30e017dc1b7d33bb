//! Single-flight coordination of credential refreshes.
//!
//! At most one refresh per [`CacheKey`] is in flight. Every caller that
//! misses the cache while it runs awaits the same [`Shared`] future and
//! observes the same outcome.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, Shared};

use super::cache::CacheKey;
use crate::core::CredentialResult;
use crate::credential::Credential;

/// Outcome of one refresh, shared by all of its waiters
pub(crate) type RefreshFuture = Shared<BoxFuture<'static, CredentialResult<Credential>>>;

/// What a caller should do after consulting the coordinator
pub(crate) enum Join {
    /// Another refresh finished in the meantime; use this credential
    Cached(Credential),
    /// Await this refresh
    Waiting(RefreshFuture),
}

#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    in_flight: DashMap<CacheKey, RefreshFuture>,
}

impl RefreshCoordinator {
    /// Join the refresh in flight for `key`, or start one.
    ///
    /// When the slot is vacant, `recheck` runs while the slot is locked: a
    /// refresh may have completed between the caller's cache miss and now.
    /// Only if it finds nothing does `start` create the new refresh.
    pub(crate) fn join_or_start<R, S>(&self, key: &CacheKey, recheck: R, start: S) -> Join
    where
        R: FnOnce() -> Option<Credential>,
        S: FnOnce() -> RefreshFuture,
    {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(flight) => Join::Waiting(flight.get().clone()),
            Entry::Vacant(slot) => {
                if let Some(credential) = recheck() {
                    return Join::Cached(credential);
                }
                let flight = start();
                slot.insert(flight.clone());
                Join::Waiting(flight)
            }
        }
    }

    /// Clear the slot of a completed refresh
    pub(crate) fn finish(&self, key: &CacheKey) {
        self.in_flight.remove(key);
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
