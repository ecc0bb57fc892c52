//! Retrying access to a shared catalog connection
//!
//! Every engine read goes through [`ResilientStore::read`]. A transient
//! failure triggers one reconnect and a retry (configurable); the failure that
//! survives the retry budget is returned unchanged, so callers see the same
//! typed error the store produced. Round-trips are serialized on a session
//! lock, so concurrent requests never interleave on the shared handle.

use crate::store::CatalogStore;
use gamerec_core::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_RETRIES: usize = 1;

pub struct ResilientStore {
    store: Arc<dyn CatalogStore>,
    max_retries: usize,
    session: Mutex<()>,
    reconnects: AtomicU64,
}

impl ResilientStore {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self::with_retries(store, DEFAULT_MAX_RETRIES)
    }

    pub fn with_retries(store: Arc<dyn CatalogStore>, max_retries: usize) -> Self {
        Self {
            store,
            max_retries,
            session: Mutex::new(()),
            reconnects: AtomicU64::new(0),
        }
    }

    /// Run one read, reconnecting and retrying on transient failure.
    pub fn read<T>(&self, op: &'static str, f: impl Fn(&dyn CatalogStore) -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            let result = {
                let _session = self.session.lock();
                f(self.store.as_ref())
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(op, attempt, error = %e, "catalog read failed, reconnecting");
                    self.reconnect();
                }
                Err(e) if e.is_transient() => {
                    warn!(op, attempts = attempt + 1, error = %e, "catalog read failed after retry");
                    return Err(e);
                }
                other => return other,
            }
        }
    }

    /// Probe the connection and re-acquire it if it is dead.
    pub fn ensure_healthy(&self) -> Result<()> {
        let alive = {
            let _session = self.session.lock();
            self.store.ping()
        };
        match alive {
            Ok(()) => Ok(()),
            Err(e) if e.is_transient() => {
                warn!(error = %e, "catalog connection found dead between requests");
                self.reconnect();
                let _session = self.session.lock();
                self.store.ping()
            }
            Err(e) => Err(e),
        }
    }

    /// Total reconnect attempts since construction
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    fn reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        let _session = self.session.lock();
        match self.store.reconnect() {
            Ok(()) => debug!("catalog connection re-established"),
            Err(e) => warn!(error = %e, "catalog reconnect failed"),
        }
    }
}

impl std::fmt::Debug for ResilientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientStore")
            .field("max_retries", &self.max_retries)
            .field("reconnects", &self.reconnect_count())
            .finish()
    }
}
