//! Shapegate fact store
//!
//! The storage-side collaborators of the validation gate:
//!
//! ```text
//! ┌──────────────┐   begin / stage / commit   ┌──────────────────┐
//! │  Connection  │──────────────────────────►│   MemoryStore    │
//! └──────┬───────┘                            │  interned terms  │
//!        │ snapshot + staged changes          │  roaring indexes │
//!        ▼                                    └──────────────────┘
//! ┌──────────────┐   match(pattern)   ┌────────────────────┐
//! │   DataView   │◄───────────────────│ PatternQueryEngine │
//! └──────────────┘                    └────────────────────┘
//! ```
//!
//! - **Terms/Facts**: IRIs, blank nodes, literals and quoted facts, each
//!   optionally scoped to a named context.
//! - **MemoryStore**: copy-on-write committed state, so a snapshot taken at
//!   `begin` stays consistent while other connections commit.
//! - **DataView**: `(base ∪ added) \ removed` for one transaction.
//! - **Pattern queries**: the "evaluate query, get bindings" capability.

pub mod changeset;
pub mod connection;
pub mod error;
pub mod interner;
pub mod memory;
pub mod pattern;
pub mod query;
pub mod source;
mod table;
pub mod term;
pub mod view;
pub mod vocab;

pub use changeset::ChangeSet;
pub use connection::{IsolationLevel, Store, StoreConnection};
pub use error::{StoreError, StoreResult};
pub use memory::{CommitRecord, MemoryConnection, MemoryStore, Snapshot};
pub use pattern::{ContextPattern, FactPattern};
pub use query::{Bindings, BindingsIter, PatternQuery, PatternQueryEngine, QueryEngine, UpdateRule};
pub use source::{FactIter, TripleSource};
pub use term::{BlankNode, Fact, Iri, Literal, Term, Triple};
pub use view::{DataView, ViewId};
