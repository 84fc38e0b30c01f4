use crate::error::StoreResult;
use crate::pattern::FactPattern;
use crate::term::Fact;

/// Lazy sequence of matched facts.
pub type FactIter<'a> = Box<dyn Iterator<Item = Fact> + 'a>;

/// Read access to a consistent set of facts.
///
/// Implementations must be safe to query from several threads at once;
/// parallel validation fans plan branches out over one shared source.
pub trait TripleSource: Send + Sync {
    /// Facts matching `pattern`, lazily.
    fn match_facts(&self, pattern: &FactPattern) -> StoreResult<FactIter<'_>>;

    /// Number of facts visible through this source.
    fn size(&self) -> StoreResult<usize>;

    fn contains(&self, fact: &Fact) -> StoreResult<bool> {
        Ok(self.match_facts(&FactPattern::exact(fact))?.next().is_some())
    }

    /// Whether concurrent reads are served without exclusive locking.
    ///
    /// Sources that serialize reads behind an exclusive lock return `false`;
    /// parallel validation falls back to sequential execution over them.
    fn supports_concurrent_reads(&self) -> bool {
        true
    }
}
