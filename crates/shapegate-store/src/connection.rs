//! Store and connection contracts consumed by the validation layer.

use crate::error::StoreResult;
use crate::pattern::FactPattern;
use crate::source::TripleSource;
use crate::term::Fact;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Transaction isolation requested at `begin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Reads see whatever is committed at the time of the read.
    None,
    /// Reads see the latest committed state at each read.
    ReadCommitted,
    /// Reads see the state committed when the transaction began.
    #[default]
    SnapshotRead,
    /// Snapshot reads; writes are applied last-writer-wins.
    Snapshot,
    /// Snapshot reads; commit fails if anything else committed meanwhile.
    Serializable,
}

impl IsolationLevel {
    /// Whether reads are pinned to the snapshot taken at `begin`.
    pub fn pins_snapshot(self) -> bool {
        matches!(
            self,
            IsolationLevel::SnapshotRead | IsolationLevel::Snapshot | IsolationLevel::Serializable
        )
    }
}

/// A transactional fact store.
pub trait Store: Send + Sync {
    type Connection: StoreConnection;

    fn open_connection(&self) -> StoreResult<Self::Connection>;

    /// See [`TripleSource::supports_concurrent_reads`].
    fn supports_concurrent_reads(&self) -> bool {
        true
    }
}

/// One client's session against a [`Store`].
pub trait StoreConnection: Send {
    fn begin(&mut self, isolation: IsolationLevel) -> StoreResult<()>;

    fn is_active(&self) -> bool;

    fn stage_add(&mut self, fact: Fact) -> StoreResult<()>;

    fn stage_remove(&mut self, fact: Fact) -> StoreResult<()>;

    /// Check that the staged changes can be committed; applies nothing.
    fn prepare(&mut self) -> StoreResult<()>;

    fn commit(&mut self) -> StoreResult<()>;

    fn rollback(&mut self) -> StoreResult<()>;

    /// Committed state this connection reads from, without its staged changes.
    fn snapshot(&self) -> StoreResult<Arc<dyn TripleSource>>;

    /// Facts matching `pattern`, including this connection's staged changes.
    fn match_facts(&self, pattern: &FactPattern) -> StoreResult<Vec<Fact>>;

    fn size(&self) -> StoreResult<usize>;
}
