//! Transaction integration: a validating wrapper around any [`Store`].
//!
//! ```text
//!  begin ──► Active ──prepare──► Preparing ──commit──► Committed
//!              │                    │
//!              └──── rollback / violation / store error ──► Aborted
//! ```
//!
//! Staged data is held here and only handed to the base connection once the
//! transaction has validated, so a rejected commit never touches the base
//! store. Facts staged in [`SHAPES_GRAPH`] are diverted into the schema
//! loader instead of the data.

use crate::config::ShaclConfig;
use crate::error::{ShaclError, ShaclResult};
use crate::executor::validate;
use crate::plan::ValidationPlan;
use crate::report::ValidationReport;
use crate::schema::{build_schema, CompiledSchema, SchemaState, ShapesGraph};
use crate::shape::{CompilationWarning, Shape};
use crate::vocab::{SHAPES_GRAPH, SUPPORTED_PREDICATES};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use shapegate_store::{
    ChangeSet, DataView, Fact, FactPattern, IsolationLevel, PatternQueryEngine, Store,
    StoreConnection, Term, TripleSource,
};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// No transaction started on this connection yet.
    Idle,
    Active,
    /// Validated; nothing applied yet.
    Preparing,
    Committed,
    Aborted,
}

impl TransactionState {
    fn is_open(self) -> bool {
        matches!(self, TransactionState::Active | TransactionState::Preparing)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// Store
// ============================================================================

/// Shapes graph, compiled schema and plan, swapped as one unit.
struct SchemaSlot {
    graph: ShapesGraph,
    schema: Arc<CompiledSchema>,
    plan: Arc<ValidationPlan>,
}

impl SchemaSlot {
    fn empty() -> Self {
        Self {
            graph: ShapesGraph::new(),
            schema: Arc::new(CompiledSchema::default()),
            plan: Arc::new(ValidationPlan::default()),
        }
    }
}

struct Shared<S> {
    base: S,
    config: RwLock<ShaclConfig>,
    schema: RwLock<SchemaSlot>,
    queries: PatternQueryEngine,
    /// Serializes validate-then-apply across connections.
    commit_lock: Mutex<()>,
}

/// A [`Store`] whose commits are gated on shape validation.
pub struct ShaclStore<S: Store> {
    inner: Arc<Shared<S>>,
}

impl<S: Store> Clone for ShaclStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Store> ShaclStore<S> {
    pub fn new(base: S) -> Self {
        Self::with_config(base, ShaclConfig::default())
    }

    pub fn with_config(base: S, config: ShaclConfig) -> Self {
        config.warn_if_parallel();
        Self {
            inner: Arc::new(Shared {
                base,
                config: RwLock::new(config),
                schema: RwLock::new(SchemaSlot::empty()),
                queries: PatternQueryEngine::new(),
                commit_lock: Mutex::new(()),
            }),
        }
    }

    pub fn base(&self) -> &S {
        &self.inner.base
    }

    pub fn config(&self) -> ShaclConfig {
        self.inner.config.read().clone()
    }

    pub fn set_config(&self, config: ShaclConfig) {
        config.warn_if_parallel();
        let wildcard = config.wildcard_undefined_targets;
        let replan = {
            let mut current = self.inner.config.write();
            let replan = current.wildcard_undefined_targets != wildcard;
            *current = config;
            replan
        };
        if replan {
            let mut slot = self.inner.schema.write();
            slot.plan = Arc::new(ValidationPlan::build(&slot.schema, wildcard));
        }
    }

    fn update_config(&self, update: impl FnOnce(&mut ShaclConfig)) {
        let mut config = self.config();
        update(&mut config);
        self.set_config(config);
    }

    pub fn enable_validation(&self) {
        self.update_config(|c| c.validation_enabled = true);
    }

    pub fn disable_validation(&self) {
        self.update_config(|c| c.validation_enabled = false);
    }

    pub fn set_parallel_validation(&self, enabled: bool) {
        self.update_config(|c| c.parallel_validation = enabled);
    }

    pub fn set_cache_selection_nodes(&self, enabled: bool) {
        self.update_config(|c| c.cache_selection_nodes = enabled);
    }

    pub fn set_wildcard_undefined_targets(&self, enabled: bool) {
        self.update_config(|c| c.wildcard_undefined_targets = enabled);
    }

    pub fn set_ignore_no_shapes_loaded(&self, enabled: bool) {
        self.update_config(|c| c.ignore_no_shapes_loaded = enabled);
    }

    pub fn set_rdfs_sub_class_reasoning(&self, enabled: bool) {
        self.update_config(|c| c.rdfs_sub_class_reasoning = enabled);
    }

    pub fn set_log_validation_plans(&self, enabled: bool) {
        self.update_config(|c| c.log_validation_plans = enabled);
    }

    pub fn set_log_violations(&self, enabled: bool) {
        self.update_config(|c| c.log_violations = enabled);
    }

    pub fn set_log_execution(&self, enabled: bool) {
        self.update_config(|c| c.log_execution = enabled);
    }

    /// Shape predicates the compiler understands.
    pub fn supported_predicates() -> &'static [&'static str] {
        SUPPORTED_PREDICATES
    }

    /// Compiled top-level shapes, in declaration order.
    pub fn shapes(&self) -> Vec<Arc<Shape>> {
        self.inner.schema.read().schema.shapes.clone()
    }

    pub fn compilation_warnings(&self) -> Vec<CompilationWarning> {
        self.inner.schema.read().schema.warnings.clone()
    }

    /// The inferred shapes graph.
    pub fn shapes_graph(&self) -> ShaclResult<Vec<Fact>> {
        self.inner.schema.read().graph.facts()
    }

    pub fn plan(&self) -> Arc<ValidationPlan> {
        self.inner.schema.read().plan.clone()
    }

    pub fn connection(&self) -> ShaclResult<ShaclConnection<S>> {
        Ok(ShaclConnection {
            store: self.clone(),
            base: self.inner.base.open_connection()?,
            state: TransactionState::Idle,
            data: ChangeSet::new(),
            schema: ChangeSet::new(),
        })
    }

    /// Validate the committed data as it stands, outside any transaction.
    pub fn revalidate(&self) -> ShaclResult<ValidationReport> {
        let config = self.config();
        let snapshot = self.inner.base.open_connection()?.snapshot()?;
        let view = DataView::of(snapshot);
        let parallel = self.resolve_parallel(&config, &view);
        validate(&self.plan(), &view, &self.inner.queries, &config, parallel)
    }

    fn resolve_parallel(&self, config: &ShaclConfig, view: &DataView) -> bool {
        if !config.parallel_validation {
            return false;
        }
        if self.inner.base.supports_concurrent_reads() && view.supports_concurrent_reads() {
            return true;
        }
        tracing::info!(
            "store cannot serve concurrent reads; validating sequentially instead of in parallel"
        );
        false
    }

    /// Load, infer and compile a staged schema batch into a fresh slot.
    fn candidate_schema(
        &self,
        changes: &ChangeSet,
        config: &ShaclConfig,
    ) -> ShaclResult<Option<SchemaSlot>> {
        if self.inner.schema.read().graph.state() != SchemaState::Empty {
            return Err(ShaclError::SchemaLoad);
        }
        if changes.added().is_empty() {
            return Ok(None);
        }
        let mut graph = ShapesGraph::new();
        let schema = build_schema(
            &mut graph,
            changes.added().iter().cloned(),
            &self.inner.queries,
            config.max_inference_iterations,
        )?;
        let plan = ValidationPlan::build(&schema, config.wildcard_undefined_targets);
        tracing::info!(
            shapes = schema.shapes.len(),
            facts = schema.facts,
            warnings = schema.warnings.len(),
            "shapes graph compiled"
        );
        Ok(Some(SchemaSlot {
            graph,
            schema: Arc::new(schema),
            plan: Arc::new(plan),
        }))
    }
}

// ============================================================================
// Connection
// ============================================================================

/// One client's validating session.
pub struct ShaclConnection<S: Store> {
    store: ShaclStore<S>,
    base: S::Connection,
    state: TransactionState,
    data: ChangeSet,
    schema: ChangeSet,
}

struct Validated {
    report: ValidationReport,
    schema: Option<SchemaSlot>,
}

impl<S: Store> ShaclConnection<S> {
    pub fn state(&self) -> TransactionState {
        self.state
    }

    fn require_open(&self, operation: &'static str) -> ShaclResult<()> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(ShaclError::InvalidTransactionState {
                state: self.state,
                operation,
            })
        }
    }

    pub fn begin(&mut self, isolation: IsolationLevel) -> ShaclResult<()> {
        if self.state.is_open() {
            return Err(ShaclError::InvalidTransactionState {
                state: self.state,
                operation: "begin",
            });
        }
        self.base.begin(isolation)?;
        self.data.clear();
        self.schema.clear();
        self.state = TransactionState::Active;
        Ok(())
    }

    fn staging_area(&mut self, fact: &Fact) -> &mut ChangeSet {
        let shapes = Term::iri(SHAPES_GRAPH);
        if fact.context.as_ref() == Some(&shapes) {
            &mut self.schema
        } else {
            &mut self.data
        }
    }

    /// Stage an addition. Staging after `prepare` reopens the transaction.
    pub fn add(&mut self, fact: Fact) -> ShaclResult<()> {
        self.require_open("add to")?;
        self.staging_area(&fact).add(fact);
        self.state = TransactionState::Active;
        Ok(())
    }

    pub fn remove(&mut self, fact: Fact) -> ShaclResult<()> {
        self.require_open("remove from")?;
        self.staging_area(&fact).remove(fact);
        self.state = TransactionState::Active;
        Ok(())
    }

    /// Validate the staged changes without applying anything.
    ///
    /// A non-conforming report aborts the transaction and is returned as
    /// [`ShaclError::ValidationFailed`]. Calling it again on a prepared
    /// transaction validates again and still applies nothing.
    pub fn prepare(&mut self) -> ShaclResult<ValidationReport> {
        self.require_open("prepare")?;
        self.state = TransactionState::Preparing;
        let validated = self.validate_staged();
        let validated = self.settle(validated)?;
        Ok(validated.report)
    }

    /// Validate and apply. Validation reruns under the store's commit lock,
    /// since a prepared report may be stale by now.
    pub fn commit(&mut self) -> ShaclResult<()> {
        self.require_open("commit")?;
        let store = self.store.clone();
        let _guard = store.inner.commit_lock.lock();
        self.state = TransactionState::Preparing;

        let validated = self.validate_staged();
        let validated = self.settle(validated)?;
        let applied = self.apply(validated.schema);
        if let Err(err) = applied {
            self.abort();
            return Err(err);
        }
        tracing::debug!(
            added = self.data.added().len(),
            removed = self.data.removed().len(),
            "transaction committed"
        );
        self.data.clear();
        self.schema.clear();
        self.state = TransactionState::Committed;
        Ok(())
    }

    pub fn rollback(&mut self) -> ShaclResult<()> {
        if self.state.is_open() {
            self.base.rollback()?;
            self.data.clear();
            self.schema.clear();
            self.state = TransactionState::Aborted;
        }
        Ok(())
    }

    /// Facts matching `pattern`, including this transaction's staged data.
    pub fn match_facts(&self, pattern: &FactPattern) -> ShaclResult<Vec<Fact>> {
        let view = DataView::new(self.base.snapshot()?, &self.data)?;
        let facts: Vec<Fact> = view.match_facts(pattern)?.collect();
        Ok(facts)
    }

    pub fn size(&self) -> ShaclResult<usize> {
        Ok(DataView::new(self.base.snapshot()?, &self.data)?.size()?)
    }

    fn validate_staged(&self) -> ShaclResult<Validated> {
        let config = self.store.config();
        let candidate = if self.schema.is_empty() {
            None
        } else {
            self.store.candidate_schema(&self.schema, &config)?
        };
        if !config.validation_enabled || (self.data.is_empty() && candidate.is_none()) {
            return Ok(Validated {
                report: ValidationReport::conforming(),
                schema: candidate,
            });
        }

        let plan = match &candidate {
            Some(slot) => slot.plan.clone(),
            None => self.store.plan(),
        };
        let view = DataView::new(self.base.snapshot()?, &self.data)?;
        let parallel = self.store.resolve_parallel(&config, &view);
        let report = validate(&plan, &view, &self.store.inner.queries, &config, parallel)?;
        Ok(Validated {
            report,
            schema: candidate,
        })
    }

    /// Turn a failed or non-conforming validation into an abort.
    fn settle(&mut self, validated: ShaclResult<Validated>) -> ShaclResult<Validated> {
        let validated = match validated {
            Ok(v) if v.report.conforms() => v,
            Ok(v) => {
                tracing::debug!(violations = v.report.len(), "transaction rejected by validation");
                self.abort();
                return Err(ShaclError::ValidationFailed(Box::new(v.report)));
            }
            Err(err) => {
                self.abort();
                return Err(err);
            }
        };
        if let Err(err) = self.base.prepare() {
            self.abort();
            return Err(err.into());
        }
        Ok(validated)
    }

    fn apply(&mut self, schema: Option<SchemaSlot>) -> ShaclResult<()> {
        let mut slot = self.store.inner.schema.write();
        if schema.is_some() && slot.graph.state() != SchemaState::Empty {
            return Err(ShaclError::SchemaLoad);
        }
        for fact in self.data.removed() {
            self.base.stage_remove(fact.clone())?;
        }
        for fact in self.data.added() {
            self.base.stage_add(fact.clone())?;
        }
        self.base.commit()?;
        if let Some(schema) = schema {
            *slot = schema;
        }
        Ok(())
    }

    fn abort(&mut self) {
        if let Err(err) = self.base.rollback() {
            tracing::warn!(error = %err, "base store rollback failed");
        }
        self.data.clear();
        self.schema.clear();
        self.state = TransactionState::Aborted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Constraint;
    use crate::vocab::sh;
    use shapegate_store::{Literal, MemoryStore};

    fn shapes(fact: Fact) -> Fact {
        fact.with_context(Some(Term::iri(SHAPES_GRAPH)))
    }

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://ex/{local}"))
    }

    fn load_min_count(store: &ShaclStore<MemoryStore>) {
        let mut conn = store.connection().expect("connection");
        conn.begin(IsolationLevel::default()).expect("begin");
        conn.add(shapes(Fact::new(ex("S"), sh::TARGET_SUBJECTS_OF, ex("name"))))
            .expect("add");
        conn.add(shapes(Fact::new(ex("S"), sh::PATH, ex("name"))))
            .expect("add");
        conn.add(shapes(Fact::new(ex("S"), sh::MAX_COUNT, Term::Literal(Literal::integer(1)))))
            .expect("add");
        conn.commit().expect("schema commit");
    }

    #[test]
    fn state_machine_transitions() {
        let store = ShaclStore::new(MemoryStore::new());
        load_min_count(&store);
        let mut conn = store.connection().expect("connection");
        assert_eq!(conn.state(), TransactionState::Idle);
        assert!(matches!(
            conn.add(Fact::new(ex("a"), "http://ex/name", Term::literal("x"))),
            Err(ShaclError::InvalidTransactionState { .. })
        ));
        conn.begin(IsolationLevel::default()).expect("begin");
        conn.add(Fact::new(ex("a"), "http://ex/name", Term::literal("x")))
            .expect("add");
        assert!(conn.prepare().expect("prepare").conforms());
        assert_eq!(conn.state(), TransactionState::Preparing);
        assert!(conn.prepare().expect("prepare again").conforms());
        assert!(store.base().is_empty());
        conn.commit().expect("commit");
        assert_eq!(conn.state(), TransactionState::Committed);
        assert_eq!(store.base().len(), 1);
        conn.begin(IsolationLevel::default()).expect("begin again");
        conn.rollback().expect("rollback");
        assert_eq!(conn.state(), TransactionState::Aborted);
    }

    #[test]
    fn rejected_commit_applies_nothing() {
        let store = ShaclStore::new(MemoryStore::new());
        load_min_count(&store);
        let mut conn = store.connection().expect("connection");
        conn.begin(IsolationLevel::default()).expect("begin");
        conn.add(Fact::new(ex("a"), "http://ex/name", Term::literal("x")))
            .expect("add");
        conn.add(Fact::new(ex("a"), "http://ex/name", Term::literal("y")))
            .expect("add");
        let err = conn.commit().expect_err("violates maxCount");
        assert_eq!(err.report().map(ValidationReport::len), Some(1));
        assert_eq!(conn.state(), TransactionState::Aborted);
        assert!(store.base().is_empty());
    }

    #[test]
    fn shapes_keep_declaration_order() {
        let store = ShaclStore::new(MemoryStore::new());
        let mut conn = store.connection().expect("connection");
        conn.begin(IsolationLevel::default()).expect("begin");
        for id in ["Zeta", "Alpha", "Mid"] {
            conn.add(shapes(Fact::new(ex(id), sh::TARGET_NODE, ex("n"))))
                .expect("add");
            conn.add(shapes(Fact::new(ex(id), sh::PATH, ex("name"))))
                .expect("add");
            conn.add(shapes(Fact::new(ex(id), sh::MAX_COUNT, Term::Literal(Literal::integer(3)))))
                .expect("add");
            conn.add(shapes(Fact::new(ex(id), sh::MIN_COUNT, Term::Literal(Literal::integer(0)))))
                .expect("add");
        }
        conn.commit().expect("schema commit");

        let compiled = store.shapes();
        let ids: Vec<Term> = compiled.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![ex("Zeta"), ex("Alpha"), ex("Mid")]);
        let first = &compiled[0];
        assert!(first.is_property_shape());
        assert!(matches!(first.constraints[..], [Constraint::MaxCount(3), Constraint::MinCount(0)]));
    }

    #[test]
    fn staged_reads_follow_staging_order() {
        let store = ShaclStore::new(MemoryStore::new());
        let mut conn = store.connection().expect("connection");
        conn.begin(IsolationLevel::default()).expect("begin");
        let staged = vec![
            Fact::new(ex("z"), "http://ex/name", Term::literal("last")),
            Fact::new(ex("a"), "http://ex/name", Term::literal("first")),
        ];
        for fact in &staged {
            conn.add(fact.clone()).expect("add");
        }
        assert_eq!(conn.match_facts(&FactPattern::any()).expect("match"), staged);
        assert_eq!(conn.size().expect("size"), 2);
        conn.rollback().expect("rollback");
    }

    #[test]
    fn shapes_are_diverted_from_the_data() {
        let store = ShaclStore::new(MemoryStore::new());
        load_min_count(&store);
        assert!(store.base().is_empty());
        assert_eq!(store.shapes().len(), 1);
        assert_eq!(store.shapes_graph().expect("graph").len(), 3);
    }
}
