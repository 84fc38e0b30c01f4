//! In-memory quad store with copy-on-write snapshots.
//!
//! The committed state is an `Arc<FactTable>` behind a lock. Readers clone
//! the `Arc` (a snapshot never changes underneath them); a commit mutates
//! through `Arc::make_mut`, which only copies the table while older
//! snapshots are still alive.

use crate::changeset::ChangeSet;
use crate::connection::{IsolationLevel, Store, StoreConnection};
use crate::error::{StoreError, StoreResult};
use crate::interner::{TermId, TermInterner};
use crate::pattern::{ContextPattern, FactPattern};
use crate::source::{FactIter, TripleSource};
use crate::table::{ContextSelector, EncodedQuad, FactTable, DEFAULT_CONTEXT};
use crate::term::{Fact, Term};
use crate::view::DataView;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Commit log
// ============================================================================

/// Unique identifier for a committed change
pub type CommitId = Uuid;

/// One applied transaction (or bulk load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: CommitId,
    pub committed_at: DateTime<Utc>,
    pub isolation: Option<IsolationLevel>,
    /// Store version after this commit.
    pub version: u64,
    pub added: usize,
    pub removed: usize,
}

// ============================================================================
// Store
// ============================================================================

struct StoreShared {
    interner: Arc<TermInterner>,
    state: RwLock<Arc<FactTable>>,
    version: AtomicU64,
    commit_log: RwLock<Vec<CommitRecord>>,
    concurrent_reads: bool,
}

/// Indexed in-memory store. Cloning yields another handle to the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreShared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_read_mode(true)
    }

    /// A store that reports it cannot serve concurrent reads, the way a
    /// store serializing reads behind an exclusive lock would.
    pub fn serialized_reads() -> Self {
        Self::with_read_mode(false)
    }

    fn with_read_mode(concurrent_reads: bool) -> Self {
        Self {
            inner: Arc::new(StoreShared {
                interner: Arc::new(TermInterner::new()),
                state: RwLock::new(Arc::new(FactTable::default())),
                version: AtomicU64::new(0),
                commit_log: RwLock::new(Vec::new()),
                concurrent_reads,
            }),
        }
    }

    /// Bulk-load facts outside any transaction; returns how many were new.
    pub fn insert_facts(&self, facts: impl IntoIterator<Item = Fact>) -> usize {
        let mut changes = ChangeSet::new();
        for fact in facts {
            changes.add(fact);
        }
        let mut state = self.inner.state.write();
        let (added, _) = self.apply_locked(&mut state, &changes, None);
        added
    }

    /// Consistent read-only view of the current committed state.
    pub fn snapshot(&self) -> Snapshot {
        // Versions only move under the write lock, so this pair is consistent.
        let state = self.inner.state.read();
        Snapshot {
            table: state.clone(),
            interner: self.inner.interner.clone(),
            version: self.version(),
            concurrent_reads: self.inner.concurrent_reads,
        }
    }

    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn commit_log(&self) -> Vec<CommitRecord> {
        self.inner.commit_log.read().clone()
    }

    fn encode(&self, fact: &Fact) -> EncodedQuad {
        let interner = &self.inner.interner;
        [
            interner.intern(&fact.subject).raw(),
            interner.intern(&Term::Iri(fact.predicate.clone())).raw(),
            interner.intern(&fact.object).raw(),
            FactTable::encode_context(fact.context.as_ref().map(|c| interner.intern(c))),
        ]
    }

    /// Apply `changes` while holding the state write lock.
    fn apply_locked(
        &self,
        state: &mut Arc<FactTable>,
        changes: &ChangeSet,
        isolation: Option<IsolationLevel>,
    ) -> (usize, usize) {
        let table = Arc::make_mut(state);
        let mut removed = 0;
        for fact in changes.removed() {
            if let Some(quad) = lookup_quad(&self.inner.interner, fact) {
                if table.remove(&quad) {
                    removed += 1;
                }
            }
        }
        let mut added = 0;
        for fact in changes.added() {
            if table.insert(self.encode(fact)) {
                added += 1;
            }
        }

        let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.commit_log.write().push(CommitRecord {
            id: Uuid::new_v4(),
            committed_at: Utc::now(),
            isolation,
            version,
            added,
            removed,
        });
        tracing::debug!(version, added, removed, "memory store commit applied");
        (added, removed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    type Connection = MemoryConnection;

    fn open_connection(&self) -> StoreResult<MemoryConnection> {
        Ok(MemoryConnection {
            store: self.clone(),
            txn: None,
        })
    }

    fn supports_concurrent_reads(&self) -> bool {
        self.inner.concurrent_reads
    }
}

/// Encode without interning; `None` if any term was never seen.
fn lookup_quad(interner: &TermInterner, fact: &Fact) -> Option<EncodedQuad> {
    let context = match &fact.context {
        Some(c) => Some(interner.id_of(c)?),
        None => None,
    };
    Some([
        interner.id_of(&fact.subject)?.raw(),
        interner.id_of(&Term::Iri(fact.predicate.clone()))?.raw(),
        interner.id_of(&fact.object)?.raw(),
        FactTable::encode_context(context),
    ])
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable committed state at one store version.
#[derive(Clone)]
pub struct Snapshot {
    table: Arc<FactTable>,
    interner: Arc<TermInterner>,
    version: u64,
    concurrent_reads: bool,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    #[allow(clippy::type_complexity)]
    fn encode_pattern(
        &self,
        pattern: &FactPattern,
    ) -> Option<(Option<u32>, Option<u32>, Option<u32>, ContextSelector)> {
        let bound = |term: Option<&Term>| -> Option<Option<u32>> {
            match term {
                Some(t) => Some(Some(self.interner.id_of(t)?.raw())),
                None => Some(None),
            }
        };
        let predicate = pattern.predicate.clone().map(Term::Iri);
        let context = match &pattern.context {
            ContextPattern::Any => ContextSelector::Any,
            ContextPattern::Default => ContextSelector::Exactly(DEFAULT_CONTEXT),
            ContextPattern::Named(ctx) => ContextSelector::Exactly(self.interner.id_of(ctx)?.raw()),
        };
        Some((
            bound(pattern.subject.as_ref())?,
            bound(predicate.as_ref())?,
            bound(pattern.object.as_ref())?,
            context,
        ))
    }

    fn decode_row(&self, row: u32) -> Option<Fact> {
        let [s, p, o, g] = self.table.row(row)?;
        let predicate = match self.interner.lookup(TermId::new(p))? {
            Term::Iri(iri) => iri,
            _ => return None,
        };
        let context = if g == DEFAULT_CONTEXT {
            None
        } else {
            Some(self.interner.lookup(TermId::new(g))?)
        };
        Some(Fact {
            subject: self.interner.lookup(TermId::new(s))?,
            predicate,
            object: self.interner.lookup(TermId::new(o))?,
            context,
        })
    }
}

impl TripleSource for Snapshot {
    fn match_facts(&self, pattern: &FactPattern) -> StoreResult<FactIter<'_>> {
        // A bound term that was never interned cannot match anything.
        let Some((s, p, o, g)) = self.encode_pattern(pattern) else {
            return Ok(Box::new(std::iter::empty()));
        };
        let rows = self.table.matching(s, p, o, g);
        Ok(Box::new(
            rows.into_iter().filter_map(move |row| self.decode_row(row)),
        ))
    }

    fn size(&self) -> StoreResult<usize> {
        Ok(self.table.len())
    }

    fn contains(&self, fact: &Fact) -> StoreResult<bool> {
        Ok(lookup_quad(&self.interner, fact).is_some_and(|quad| self.table.contains(&quad)))
    }

    fn supports_concurrent_reads(&self) -> bool {
        self.concurrent_reads
    }
}

// ============================================================================
// Connection
// ============================================================================

struct Transaction {
    id: Uuid,
    isolation: IsolationLevel,
    snapshot: Snapshot,
    changes: ChangeSet,
}

/// Transactional session on a [`MemoryStore`].
pub struct MemoryConnection {
    store: MemoryStore,
    txn: Option<Transaction>,
}

impl MemoryConnection {
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Staged changes of the active transaction.
    pub fn staged(&self) -> Option<&ChangeSet> {
        self.txn.as_ref().map(|t| &t.changes)
    }

    fn txn_mut(&mut self) -> StoreResult<&mut Transaction> {
        self.txn.as_mut().ok_or(StoreError::NoActiveTransaction)
    }

    fn check_serializable(&self, txn: &Transaction) -> StoreResult<()> {
        let actual = self.store.version();
        if txn.isolation == IsolationLevel::Serializable && actual != txn.snapshot.version() {
            return Err(StoreError::Conflict {
                expected: txn.snapshot.version(),
                actual,
            });
        }
        Ok(())
    }
}

impl StoreConnection for MemoryConnection {
    fn begin(&mut self, isolation: IsolationLevel) -> StoreResult<()> {
        if self.txn.is_some() {
            return Err(StoreError::TransactionAlreadyActive);
        }
        let id = Uuid::new_v4();
        tracing::debug!(txn = %id, ?isolation, "memory transaction started");
        self.txn = Some(Transaction {
            id,
            isolation,
            snapshot: self.store.snapshot(),
            changes: ChangeSet::new(),
        });
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.txn.is_some()
    }

    fn stage_add(&mut self, fact: Fact) -> StoreResult<()> {
        self.txn_mut()?.changes.add(fact);
        Ok(())
    }

    fn stage_remove(&mut self, fact: Fact) -> StoreResult<()> {
        self.txn_mut()?.changes.remove(fact);
        Ok(())
    }

    fn prepare(&mut self) -> StoreResult<()> {
        let txn = self.txn.as_ref().ok_or(StoreError::NoActiveTransaction)?;
        self.check_serializable(txn)
    }

    fn commit(&mut self) -> StoreResult<()> {
        let txn = self.txn.as_ref().ok_or(StoreError::NoActiveTransaction)?;
        {
            // Checked under the write lock so no commit can slip in between.
            let mut state = self.store.inner.state.write();
            self.check_serializable(txn)?;
            self.store
                .apply_locked(&mut state, &txn.changes, Some(txn.isolation));
        }
        tracing::debug!(txn = %txn.id, "memory transaction committed");
        self.txn = None;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if let Some(txn) = self.txn.take() {
            tracing::debug!(txn = %txn.id, staged = txn.changes.len(), "memory transaction rolled back");
        }
        Ok(())
    }

    fn snapshot(&self) -> StoreResult<Arc<dyn TripleSource>> {
        match &self.txn {
            Some(txn) if txn.isolation.pins_snapshot() => Ok(Arc::new(txn.snapshot.clone())),
            _ => Ok(Arc::new(self.store.snapshot())),
        }
    }

    fn match_facts(&self, pattern: &FactPattern) -> StoreResult<Vec<Fact>> {
        let base = self.snapshot()?;
        match &self.txn {
            Some(txn) if !txn.changes.is_empty() => {
                let view = DataView::new(base, &txn.changes)?;
                let facts: Vec<Fact> = view.match_facts(pattern)?.collect();
                Ok(facts)
            }
            _ => {
                let facts: Vec<Fact> = base.match_facts(pattern)?.collect();
                Ok(facts)
            }
        }
    }

    fn size(&self) -> StoreResult<usize> {
        let base = self.snapshot()?;
        match &self.txn {
            Some(txn) if !txn.changes.is_empty() => DataView::new(base, &txn.changes)?.size(),
            _ => base.size(),
        }
    }
}
