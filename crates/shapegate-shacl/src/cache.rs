//! Per-run memo of target selections.

use crate::shape::Target;
use ahash::AHashMap;
use parking_lot::Mutex;
use shapegate_store::{StoreResult, Term, ViewId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A target rule evaluated against one data view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub targets: Vec<Target>,
    pub view: ViewId,
}

/// Focus-node lists keyed by [`SelectionKey`], shared across the plan
/// branches of one validation run.
#[derive(Debug, Default)]
pub struct SelectionCache {
    entries: Mutex<AHashMap<SelectionKey, Arc<[Term]>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached selection for `key`, computing it on a miss.
    ///
    /// The lock is not held while computing, so two branches racing on the
    /// same key may both compute; the first stored result wins.
    pub fn get_or_compute<F>(&self, key: SelectionKey, compute: F) -> StoreResult<Arc<[Term]>>
    where
        F: FnOnce() -> StoreResult<Vec<Term>>,
    {
        if let Some(hit) = self.entries.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let computed: Arc<[Term]> = compute()?.into();
        Ok(self.entries.lock().entry(key).or_insert(computed).clone())
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
