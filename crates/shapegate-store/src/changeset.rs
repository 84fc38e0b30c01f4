use crate::error::StoreResult;
use crate::source::TripleSource;
use crate::term::Fact;
use indexmap::IndexSet;

/// Pending additions and removals of one transaction, in staging order.
///
/// A fact is never in both sets: staging an add cancels a pending removal
/// of the same fact and vice versa, so restaging is idempotent. Restaging
/// a fact keeps its first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    added: IndexSet<Fact>,
    removed: IndexSet<Fact>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fact: Fact) {
        self.removed.shift_remove(&fact);
        self.added.insert(fact);
    }

    pub fn remove(&mut self, fact: Fact) {
        self.added.shift_remove(&fact);
        self.removed.insert(fact);
    }

    pub fn added(&self) -> &IndexSet<Fact> {
        &self.added
    }

    pub fn removed(&self) -> &IndexSet<Fact> {
        &self.removed
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
    }

    /// Keep only changes that are effective against `base`: additions not
    /// already present and removals of facts that exist.
    pub fn normalized_against(&self, base: &dyn TripleSource) -> StoreResult<ChangeSet> {
        let mut out = ChangeSet::new();
        for fact in &self.added {
            if !base.contains(fact)? {
                out.added.insert(fact.clone());
            }
        }
        for fact in &self.removed {
            if base.contains(fact)? {
                out.removed.insert(fact.clone());
            }
        }
        Ok(out)
    }
}
