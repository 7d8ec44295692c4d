//! In-memory directory
//!
//! Evaluates filters against a fixed entry set. Used by tests and by
//! dry runs against exported directory data.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::client::{DirectoryConnector, DirectorySession};
use crate::config::DirectoryConfig;
use crate::entry::DirectoryEntry;
use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::Filter;

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    released: AtomicUsize,
    searches: AtomicUsize,
    live: AtomicUsize,
    peak: AtomicUsize,
}

/// A directory held in memory. Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryDirectory {
    config: Arc<DirectoryConfig>,
    entries: Arc<RwLock<Vec<DirectoryEntry>>>,
    reachable: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl InMemoryDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            config: Arc::new(config),
            entries: Arc::new(RwLock::new(Vec::new())),
            reachable: Arc::new(AtomicBool::new(true)),
            counters: Arc::new(Counters::default()),
        }
    }

    #[must_use]
    pub fn with_entries(self, entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
            ..self
        }
    }

    pub async fn insert(&self, entry: DirectoryEntry) {
        self.entries.write().await.push(entry);
    }

    /// Make subsequent connects fail with a connectivity error.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Sessions released so far, explicitly or by drop.
    pub fn sessions_released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Most sessions ever open at the same time.
    pub fn sessions_peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Searches served so far.
    pub fn searches(&self) -> usize {
        self.counters.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryConnector for InMemoryDirectory {
    fn config(&self) -> &Arc<DirectoryConfig> {
        &self.config
    }

    async fn connect(&self) -> DirectoryResult<Box<dyn DirectorySession>> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(DirectoryError::connection_failed(format!(
                "directory at {} is unreachable",
                self.config.url()
            )));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            entries: Arc::clone(&self.entries),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MemorySession {
    entries: Arc<RwLock<Vec<DirectoryEntry>>>,
    counters: Arc<Counters>,
}

#[async_trait]
impl DirectorySession for MemorySession {
    async fn search(
        &mut self,
        filter: &Filter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.counters.searches.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| filter.matches(e))
            .map(|e| e.clone().project(attributes))
            .collect())
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}
