//! Row-oriented quad table with roaring-bitmap postings per position.
//!
//! Pattern matching is a bitmap intersection of the postings for every bound
//! position, masked by the `live` bitmap. Removing a fact only clears its
//! live bit so re-adding it later revives the same row.

use crate::interner::TermId;
use ahash::AHashMap;
use roaring::RoaringBitmap;

/// Encoded context slot for facts in the default context.
pub(crate) const DEFAULT_CONTEXT: u32 = u32::MAX;

/// `[subject, predicate, object, context]` term IDs.
pub(crate) type EncodedQuad = [u32; 4];

/// Context selector after encoding.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ContextSelector {
    Any,
    Exactly(u32),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FactTable {
    rows: Vec<EncodedQuad>,
    live: RoaringBitmap,
    row_index: AHashMap<EncodedQuad, u32>,
    by_subject: AHashMap<u32, RoaringBitmap>,
    by_predicate: AHashMap<u32, RoaringBitmap>,
    by_object: AHashMap<u32, RoaringBitmap>,
    by_context: AHashMap<u32, RoaringBitmap>,
}

impl FactTable {
    pub(crate) fn len(&self) -> usize {
        self.live.len() as usize
    }

    pub(crate) fn encode_context(context: Option<TermId>) -> u32 {
        context.map_or(DEFAULT_CONTEXT, TermId::raw)
    }

    /// Insert a quad; returns `false` if it was already live.
    pub(crate) fn insert(&mut self, quad: EncodedQuad) -> bool {
        if let Some(&row) = self.row_index.get(&quad) {
            return self.live.insert(row);
        }

        let row = self.rows.len() as u32;
        self.rows.push(quad);
        self.row_index.insert(quad, row);
        self.live.insert(row);

        let [s, p, o, g] = quad;
        self.by_subject.entry(s).or_default().insert(row);
        self.by_predicate.entry(p).or_default().insert(row);
        self.by_object.entry(o).or_default().insert(row);
        self.by_context.entry(g).or_default().insert(row);
        true
    }

    /// Remove a quad; returns `false` if it was not live.
    pub(crate) fn remove(&mut self, quad: &EncodedQuad) -> bool {
        match self.row_index.get(quad) {
            Some(&row) => self.live.remove(row),
            None => false,
        }
    }

    pub(crate) fn contains(&self, quad: &EncodedQuad) -> bool {
        self.row_index
            .get(quad)
            .is_some_and(|row| self.live.contains(*row))
    }

    pub(crate) fn row(&self, row: u32) -> Option<EncodedQuad> {
        self.rows.get(row as usize).copied()
    }

    /// Live rows matching every bound position, in insertion order.
    pub(crate) fn matching(
        &self,
        subject: Option<u32>,
        predicate: Option<u32>,
        object: Option<u32>,
        context: ContextSelector,
    ) -> RoaringBitmap {
        let mut out = self.live.clone();
        let postings = [
            (subject, &self.by_subject),
            (predicate, &self.by_predicate),
            (object, &self.by_object),
            (
                match context {
                    ContextSelector::Any => None,
                    ContextSelector::Exactly(g) => Some(g),
                },
                &self.by_context,
            ),
        ];
        for (bound, index) in postings {
            let Some(id) = bound else {
                continue;
            };
            match index.get(&id) {
                Some(bitmap) => out &= bitmap,
                None => return RoaringBitmap::new(),
            }
            if out.is_empty() {
                break;
            }
        }
        out
    }
}
