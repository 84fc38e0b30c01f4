//! Shapegate: shape-constraint validation gate for transactional fact stores
//!
//! A transaction is committed only if the data it would produce conforms to
//! the loaded shapes:
//!
//! ```text
//!  shapes-graph facts ──► ShapesGraph ──infer──► compile ──► ValidationPlan
//!                         (load once)    (fixed point)          │ (reused)
//!                                                               ▼
//!  staged changes ──► DataView(base ∪ added \ removed) ──► executor ──► report
//!                                                               │
//!                                         conforms? commit : abort ◄┘
//! ```
//!
//! - [`schema`]: write-once shapes graph with rule-based inference.
//! - [`shape`]: immutable shape model; malformed constraints become warnings.
//! - [`plan`]: per-constraint operator trees (Select, Cache, Join, Filter,
//!   Aggregate, Union, Except).
//! - [`executor`]: sequential or rayon fork-join execution.
//! - [`sail`]: [`ShaclStore`] / [`ShaclConnection`], the transaction gate.

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod plan;
pub mod report;
pub mod sail;
pub mod schema;
pub mod shape;
pub mod values;
pub mod vocab;

pub use cache::{SelectionCache, SelectionKey};
pub use config::ShaclConfig;
pub use error::{ShaclError, ShaclResult};
pub use executor::validate;
pub use plan::{ExceptKey, ExecutionContext, PlanNode, ShapePlan, ValidationPlan};
pub use report::{ValidationReport, ViolationRecord};
pub use sail::{ShaclConnection, ShaclStore, TransactionState};
pub use schema::{build_schema, CompiledSchema, SchemaState, ShapesGraph};
pub use shape::{
    compile_shapes, CompilationWarning, Constraint, ConstraintComponent, NodeKind, Severity,
    Shape, Target,
};
pub use vocab::{SHAPES_GRAPH, SUPPORTED_PREDICATES};
