//! Data View: a read-only overlay of staged changes on a base snapshot.

use crate::changeset::ChangeSet;
use crate::error::StoreResult;
use crate::pattern::FactPattern;
use crate::source::{FactIter, TripleSource};
use crate::term::Fact;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one data view instance; never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// `(base ∪ added) \ removed`, answered lazily.
///
/// The change set is normalized on construction so that `added` is disjoint
/// from the base and `removed` is a subset of it; matches never repeat a
/// fact and `size` is exact. Staged additions follow the base facts in
/// staging order.
pub struct DataView {
    id: ViewId,
    base: Arc<dyn TripleSource>,
    added: IndexSet<Fact>,
    removed: IndexSet<Fact>,
}

impl DataView {
    pub fn new(base: Arc<dyn TripleSource>, changes: &ChangeSet) -> StoreResult<Self> {
        let effective = changes.normalized_against(base.as_ref())?;
        Ok(Self {
            id: ViewId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed)),
            base,
            added: effective.added().clone(),
            removed: effective.removed().clone(),
        })
    }

    /// A view with no pending changes.
    pub fn of(base: Arc<dyn TripleSource>) -> Self {
        Self {
            id: ViewId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed)),
            base,
            added: IndexSet::new(),
            removed: IndexSet::new(),
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn base(&self) -> &Arc<dyn TripleSource> {
        &self.base
    }

    /// Effective additions.
    pub fn added(&self) -> &IndexSet<Fact> {
        &self.added
    }

    /// Effective removals.
    pub fn removed(&self) -> &IndexSet<Fact> {
        &self.removed
    }

    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

impl TripleSource for DataView {
    fn match_facts(&self, pattern: &FactPattern) -> StoreResult<FactIter<'_>> {
        let base = self.base.match_facts(pattern)?;
        let removed = &self.removed;
        let pattern = pattern.clone();
        let added = self.added.iter().filter(move |f| pattern.matches(f)).cloned();
        Ok(Box::new(
            base.filter(move |f| !removed.contains(f)).chain(added),
        ))
    }

    fn size(&self) -> StoreResult<usize> {
        Ok(self.base.size()? + self.added.len() - self.removed.len())
    }

    fn contains(&self, fact: &Fact) -> StoreResult<bool> {
        if self.removed.contains(fact) {
            return Ok(false);
        }
        if self.added.contains(fact) {
            return Ok(true);
        }
        self.base.contains(fact)
    }

    fn supports_concurrent_reads(&self) -> bool {
        self.base.supports_concurrent_reads()
    }
}

impl fmt::Debug for DataView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataView")
            .field("id", &self.id)
            .field("added", &self.added.len())
            .field("removed", &self.removed.len())
            .finish()
    }
}
