//! Term interning: every distinct term is stored once and referenced by a
//! compact `TermId` inside the fact table.

use crate::term::Term;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// Interned term ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TermId(u32);

impl TermId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Concurrent, append-only term interner shared by a store and all of its
/// snapshots.
pub struct TermInterner {
    /// Term to ID mapping
    term_to_id: DashMap<Term, TermId>,
    /// ID to term mapping (for decoding rows)
    id_to_term: DashMap<TermId, Term>,
    /// Next available ID
    next_id: AtomicU32,
}

impl TermInterner {
    pub fn new() -> Self {
        Self {
            term_to_id: DashMap::new(),
            id_to_term: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Intern a term, returning its ID
    pub fn intern(&self, term: &Term) -> TermId {
        if let Some(id) = self.term_to_id.get(term) {
            return *id;
        }

        // The entry guard serializes racing interners of the same term.
        *self.term_to_id.entry(term.clone()).or_insert_with(|| {
            let id = TermId(self.next_id.fetch_add(1, Ordering::SeqCst));
            self.id_to_term.insert(id, term.clone());
            id
        })
    }

    /// Look up an existing ID for a term without inserting.
    pub fn id_of(&self, term: &Term) -> Option<TermId> {
        self.term_to_id.get(term).map(|id| *id)
    }

    /// Look up term by ID
    pub fn lookup(&self, id: TermId) -> Option<Term> {
        self.id_to_term.get(&id).map(|t| t.clone())
    }

    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::SeqCst) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TermInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let interner = TermInterner::new();
        let a = interner.intern(&Term::iri("http://ex/a"));
        let b = interner.intern(&Term::literal("a"));
        assert_ne!(a, b);
        assert_eq!(interner.intern(&Term::iri("http://ex/a")), a);
        assert_eq!(interner.lookup(b), Some(Term::literal("a")));
        assert_eq!(interner.id_of(&Term::blank("x")), None);
        assert_eq!(interner.len(), 2);
    }
}
