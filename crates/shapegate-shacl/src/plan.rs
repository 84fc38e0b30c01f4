//! Validation plans: a closed set of operators over data-view tuples.
//!
//! Every constraint compiles to one operator tree whose output is the set of
//! violating tuples. Trees reference shapes only; a [`DataView`] is supplied
//! through [`ExecutionContext`] when a plan runs, so one plan serves every
//! transaction.
//!
//! ```text
//!   Filter(count <= 1)
//!     Aggregate(Count <age>)
//!       Cache
//!         Select(class <Person>)
//! ```

use crate::cache::{SelectionCache, SelectionKey};
use crate::report::ViolationRecord;
use crate::schema::CompiledSchema;
use crate::shape::{Constraint, ConstraintComponent, NodeKind, Severity, Shape, Target};
use crate::values::{compare_literals, has_datatype, language_matches, string_form};
use ahash::AHashSet;
use regex::Regex;
use shapegate_store::{
    Bindings, DataView, FactPattern, Iri, Literal, QueryEngine, StoreResult, Term, TripleSource,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Tuples and operators
// ============================================================================

/// A focus node, optionally with one value node or a value count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tuple {
    pub focus: Term,
    pub value: Option<Term>,
    pub count: Option<usize>,
}

impl Tuple {
    pub fn focus(focus: Term) -> Self {
        Self {
            focus,
            value: None,
            count: None,
        }
    }

    pub fn value(focus: Term, value: Term) -> Self {
        Self {
            focus,
            value: Some(value),
            count: None,
        }
    }
}

/// Lazy tuple sequence; read errors travel inline.
pub type TupleStream<'a> = Box<dyn Iterator<Item = StoreResult<Tuple>> + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    MinExclusive,
    MinInclusive,
    MaxExclusive,
    MaxInclusive,
}

impl RangeKind {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            RangeKind::MinExclusive => ordering == Ordering::Greater,
            RangeKind::MinInclusive => ordering != Ordering::Less,
            RangeKind::MaxExclusive => ordering == Ordering::Less,
            RangeKind::MaxInclusive => ordering != Ordering::Greater,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            RangeKind::MinExclusive => ">",
            RangeKind::MinInclusive => ">=",
            RangeKind::MaxExclusive => "<",
            RangeKind::MaxInclusive => "<=",
        }
    }
}

/// Predicate applied by a [`PlanNode::Filter`].
#[derive(Debug, Clone)]
pub enum ValueCheck {
    AtLeast(usize),
    AtMost(usize),
    Datatype(Iri),
    NodeKind(NodeKind),
    Class(Iri),
    Range { kind: RangeKind, bound: Literal },
    MinLength(usize),
    MaxLength(usize),
    Pattern { source: String, regex: Regex },
    LanguageIn(Vec<String>),
    In(Vec<Term>),
}

impl ValueCheck {
    /// Whether `tuple` fails this check. Counts are read from `count`;
    /// everything else from `value`, falling back to the focus node.
    fn rejects(&self, tuple: &Tuple, ctx: ExecutionContext<'_>) -> StoreResult<bool> {
        let value = tuple.value.as_ref().unwrap_or(&tuple.focus);
        let count = tuple.count.unwrap_or(0);
        Ok(match self {
            ValueCheck::AtLeast(min) => count < *min,
            ValueCheck::AtMost(max) => count > *max,
            ValueCheck::Datatype(dt) => !has_datatype(value, dt),
            ValueCheck::NodeKind(kind) => !kind.matches(value),
            ValueCheck::Class(class) => {
                if value.is_literal() {
                    true
                } else {
                    let seed = Bindings::from([("value".to_string(), value.clone())]);
                    let query = class_query("value", class, ctx.subclass_reasoning);
                    ctx.queries
                        .evaluate(ctx.view, &query, &seed)?
                        .next()
                        .is_none()
                }
            }
            ValueCheck::Range { kind, bound } => match value.as_literal() {
                Some(lit) => !compare_literals(lit, bound).is_some_and(|o| kind.accepts(o)),
                None => true,
            },
            ValueCheck::MinLength(min) => {
                string_form(value).map_or(true, |s| s.chars().count() < *min)
            }
            ValueCheck::MaxLength(max) => {
                string_form(value).map_or(true, |s| s.chars().count() > *max)
            }
            ValueCheck::Pattern { regex, .. } => {
                string_form(value).map_or(true, |s| !regex.is_match(s))
            }
            ValueCheck::LanguageIn(ranges) => !value
                .as_literal()
                .and_then(Literal::language)
                .is_some_and(|tag| ranges.iter().any(|r| language_matches(tag, r))),
            ValueCheck::In(allowed) => !allowed.contains(value),
        })
    }
}

impl fmt::Display for ValueCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueCheck::AtLeast(n) => write!(f, "count >= {n}"),
            ValueCheck::AtMost(n) => write!(f, "count <= {n}"),
            ValueCheck::Datatype(dt) => write!(f, "datatype {dt}"),
            ValueCheck::NodeKind(kind) => write!(f, "nodeKind {kind:?}"),
            ValueCheck::Class(c) => write!(f, "class {c}"),
            ValueCheck::Range { kind, bound } => write!(f, "value {} {bound}", kind.symbol()),
            ValueCheck::MinLength(n) => write!(f, "length >= {n}"),
            ValueCheck::MaxLength(n) => write!(f, "length <= {n}"),
            ValueCheck::Pattern { source, .. } => write!(f, "pattern /{source}/"),
            ValueCheck::LanguageIn(langs) => write!(f, "languageIn [{}]", langs.join(", ")),
            ValueCheck::In(values) => write!(f, "in ({} values)", values.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    /// One tuple per focus carrying the number of distinct values.
    Count,
    /// One tuple per language tag used by more than one value of a focus.
    DuplicateLanguages,
}

impl AggregateOp {
    fn apply(self, focus: Term, values: Vec<Term>) -> Vec<Tuple> {
        match self {
            AggregateOp::Count => vec![Tuple {
                focus,
                value: None,
                count: Some(values.len()),
            }],
            AggregateOp::DuplicateLanguages => {
                let mut tags: BTreeMap<&str, usize> = BTreeMap::new();
                for tag in values.iter().filter_map(|v| v.as_literal()?.language()) {
                    *tags.entry(tag).or_default() += 1;
                }
                tags.into_iter()
                    .filter(|(_, n)| *n > 1)
                    .map(|(tag, _)| Tuple::value(focus.clone(), Term::literal(tag)))
                    .collect()
            }
        }
    }
}

/// What [`PlanNode::Except`] compares when removing tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptKey {
    /// The focus node alone.
    Focus,
    /// The focus node together with its value node.
    FocusValue,
}

impl ExceptKey {
    fn of(self, tuple: &Tuple) -> (Term, Option<Term>) {
        match self {
            ExceptKey::Focus => (tuple.focus.clone(), None),
            ExceptKey::FocusValue => (tuple.focus.clone(), tuple.value.clone()),
        }
    }
}

/// Operator graph node.
#[derive(Debug, Clone)]
pub enum PlanNode {
    /// Focus nodes chosen by target rules, distinct, in discovery order.
    Select { targets: Vec<Target> },
    /// Memoizes a `Select` in the run's [`SelectionCache`], when there is one.
    Cache { input: Box<PlanNode> },
    /// Pairs each focus with its values along `path` (itself when `None`).
    Join {
        input: Box<PlanNode>,
        path: Option<Iri>,
    },
    /// Keeps the tuples that fail `check`.
    Filter {
        input: Box<PlanNode>,
        check: ValueCheck,
    },
    Aggregate {
        input: Box<PlanNode>,
        path: Iri,
        op: AggregateOp,
    },
    /// Distinct tuples of every input.
    Union { inputs: Vec<PlanNode> },
    /// Tuples of `left` whose `key` never appears in `right`.
    Except {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        key: ExceptKey,
    },
}

/// What a running plan reads from.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub view: &'a DataView,
    pub queries: &'a dyn QueryEngine,
    pub cache: Option<&'a SelectionCache>,
    pub subclass_reasoning: bool,
}

fn stream<'a, I>(result: StoreResult<I>) -> TupleStream<'a>
where
    I: IntoIterator<Item = Tuple>,
    I::IntoIter: 'a,
{
    match result {
        Ok(items) => Box::new(items.into_iter().map(Ok)),
        Err(e) => Box::new(std::iter::once(Err(e))),
    }
}

fn class_query(var: &str, class: &Iri, subclass_reasoning: bool) -> String {
    if subclass_reasoning {
        format!("?{var} rdf:type/rdfs:subClassOf* {class}")
    } else {
        format!("?{var} rdf:type {class}")
    }
}

/// Distinct objects of `focus` along `path`, across all contexts.
fn values_of(view: &DataView, focus: &Term, path: &Iri) -> StoreResult<Vec<Term>> {
    let pattern = FactPattern::any()
        .with_subject(focus.clone())
        .with_predicate(path.clone());
    let mut seen = AHashSet::new();
    let values: Vec<Term> = view
        .match_facts(&pattern)?
        .map(|f| f.object)
        .filter(|o| seen.insert(o.clone()))
        .collect();
    Ok(values)
}

fn select_focus(targets: &[Target], ctx: ExecutionContext<'_>) -> StoreResult<Vec<Term>> {
    let mut seen = AHashSet::new();
    let mut out = Vec::new();
    let mut push = |term: Term| {
        if seen.insert(term.clone()) {
            out.push(term);
        }
    };
    for target in targets {
        match target {
            Target::Class(class) => {
                let query = class_query("focus", class, ctx.subclass_reasoning);
                for mut solution in ctx.queries.evaluate(ctx.view, &query, &Bindings::new())? {
                    if let Some(focus) = solution.remove("focus") {
                        push(focus);
                    }
                }
            }
            Target::Node(node) => push(node.clone()),
            Target::SubjectsOf(p) => {
                let pattern = FactPattern::any().with_predicate(p.clone());
                ctx.view.match_facts(&pattern)?.for_each(|f| push(f.subject));
            }
            Target::ObjectsOf(p) => {
                let pattern = FactPattern::any().with_predicate(p.clone());
                ctx.view.match_facts(&pattern)?.for_each(|f| push(f.object));
            }
            Target::AllSubjects => {
                ctx.view
                    .match_facts(&FactPattern::any())?
                    .for_each(|f| push(f.subject));
            }
        }
    }
    Ok(out)
}

impl PlanNode {
    fn boxed(self) -> Box<PlanNode> {
        Box::new(self)
    }

    fn empty() -> PlanNode {
        PlanNode::Union { inputs: Vec::new() }
    }

    pub fn execute<'a>(&'a self, ctx: ExecutionContext<'a>) -> TupleStream<'a> {
        match self {
            PlanNode::Select { targets } => {
                stream(select_focus(targets, ctx).map(|nodes| nodes.into_iter().map(Tuple::focus)))
            }
            PlanNode::Cache { input } => match (ctx.cache, input.as_ref()) {
                (Some(cache), PlanNode::Select { targets }) => {
                    let key = SelectionKey {
                        targets: targets.clone(),
                        view: ctx.view.id(),
                    };
                    let nodes = cache.get_or_compute(key, || select_focus(targets, ctx));
                    stream(nodes.map(|nodes| {
                        (0..nodes.len()).map(move |i| Tuple::focus(nodes[i].clone()))
                    }))
                }
                _ => input.execute(ctx),
            },
            PlanNode::Join { input, path } => {
                Box::new(input.execute(ctx).flat_map(move |item| -> TupleStream<'a> {
                    let tuple = match item {
                        Ok(tuple) => tuple,
                        Err(e) => return Box::new(std::iter::once(Err(e))),
                    };
                    match path {
                        None => Box::new(std::iter::once(Ok(Tuple::value(
                            tuple.focus.clone(),
                            tuple.focus,
                        )))),
                        Some(p) => stream(values_of(ctx.view, &tuple.focus, p).map(|values| {
                            values
                                .into_iter()
                                .map(move |v| Tuple::value(tuple.focus.clone(), v))
                        })),
                    }
                }))
            }
            PlanNode::Filter { input, check } => {
                Box::new(input.execute(ctx).filter_map(move |item| match item {
                    Ok(tuple) => match check.rejects(&tuple, ctx) {
                        Ok(true) => Some(Ok(tuple)),
                        Ok(false) => None,
                        Err(e) => Some(Err(e)),
                    },
                    Err(e) => Some(Err(e)),
                }))
            }
            PlanNode::Aggregate { input, path, op } => {
                let op = *op;
                Box::new(input.execute(ctx).flat_map(move |item| -> TupleStream<'a> {
                    let tuple = match item {
                        Ok(tuple) => tuple,
                        Err(e) => return Box::new(std::iter::once(Err(e))),
                    };
                    let values = values_of(ctx.view, &tuple.focus, path);
                    stream(values.map(|values| op.apply(tuple.focus, values)))
                }))
            }
            PlanNode::Union { inputs } => {
                let mut seen = AHashSet::new();
                Box::new(
                    inputs
                        .iter()
                        .flat_map(move |input| input.execute(ctx))
                        .filter(move |item| match item {
                            Ok(tuple) => seen.insert(tuple.clone()),
                            Err(_) => true,
                        }),
                )
            }
            PlanNode::Except { left, right, key } => {
                let key = *key;
                let excluded: StoreResult<AHashSet<(Term, Option<Term>)>> =
                    right.execute(ctx).map(|item| item.map(|t| key.of(&t))).collect();
                match excluded {
                    Ok(excluded) => Box::new(left.execute(ctx).filter(move |item| match item {
                        Ok(tuple) => !excluded.contains(&key.of(tuple)),
                        Err(_) => true,
                    })),
                    Err(e) => Box::new(std::iter::once(Err(e))),
                }
            }
        }
    }

    /// Indented operator tree, one node per line.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(0, &mut out);
        out
    }

    fn explain_into(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let (label, children): (String, Vec<&PlanNode>) = match self {
            PlanNode::Select { targets } => {
                let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
                (format!("Select({})", targets.join(", ")), Vec::new())
            }
            PlanNode::Cache { input } => ("Cache".to_string(), vec![input.as_ref()]),
            PlanNode::Join { input, path } => match path {
                Some(p) => (format!("Join({p})"), vec![input.as_ref()]),
                None => ("Join(self)".to_string(), vec![input.as_ref()]),
            },
            PlanNode::Filter { input, check } => (format!("Filter({check})"), vec![input.as_ref()]),
            PlanNode::Aggregate { input, path, op } => {
                (format!("Aggregate({op:?} {path})"), vec![input.as_ref()])
            }
            PlanNode::Union { inputs } => ("Union".to_string(), inputs.iter().collect()),
            PlanNode::Except { left, right, key } => {
                let label = match key {
                    ExceptKey::Focus => "Except",
                    ExceptKey::FocusValue => "Except(value)",
                };
                (label.to_string(), vec![left.as_ref(), right.as_ref()])
            }
        };
        out.push_str(&indent);
        out.push_str(&label);
        out.push('\n');
        for child in children {
            child.explain_into(depth + 1, out);
        }
    }
}

// ============================================================================
// Plans
// ============================================================================

/// The operator tree of one constraint plus what its violations report.
#[derive(Debug, Clone)]
pub struct ConstraintPlan {
    /// Shape reported as `sh:sourceShape`.
    pub shape: Arc<Shape>,
    pub component: ConstraintComponent,
    pub path: Option<Iri>,
    pub severity: Severity,
    pub message: String,
    pub root: PlanNode,
}

impl ConstraintPlan {
    /// Run against `ctx`; one record per violating tuple.
    pub fn violations(
        &self,
        ctx: ExecutionContext<'_>,
        log_execution: bool,
    ) -> StoreResult<Vec<ViolationRecord>> {
        let mut out = Vec::new();
        for item in self.root.execute(ctx) {
            let tuple = item?;
            if log_execution {
                tracing::info!(
                    shape = %self.shape.id,
                    component = %self.component,
                    focus = %tuple.focus,
                    value = ?tuple.value.as_ref().map(|v| v.to_string()),
                    "plan emitted tuple"
                );
            }
            out.push(ViolationRecord {
                source_shape: self.shape.id.clone(),
                focus_node: tuple.focus,
                result_path: self.path.clone(),
                value: tuple.value,
                source_constraint_component: self.component,
                severity: self.severity,
                message: self.message.clone(),
            });
        }
        Ok(out)
    }
}

/// All constraint plans of one top-level shape.
#[derive(Debug, Clone)]
pub struct ShapePlan {
    pub shape: Arc<Shape>,
    pub constraints: Vec<ConstraintPlan>,
}

/// Reusable plans for a compiled schema.
#[derive(Debug, Clone, Default)]
pub struct ValidationPlan {
    pub shapes: Vec<ShapePlan>,
    /// Shapes in the schema, planned or not.
    pub declared_shapes: usize,
    /// Deactivated or untargeted shapes that got no plan.
    pub skipped: Vec<Term>,
}

impl ValidationPlan {
    /// Plan every active shape of `schema`.
    ///
    /// Untargeted shapes select every subject when `wildcard_undefined_targets`
    /// is set and are skipped otherwise.
    pub fn build(schema: &CompiledSchema, wildcard_undefined_targets: bool) -> Self {
        let mut plan = ValidationPlan {
            declared_shapes: schema.shapes.len(),
            ..Default::default()
        };
        for shape in &schema.shapes {
            let targets = if shape.deactivated {
                None
            } else if !shape.targets.is_empty() {
                Some(shape.targets.clone())
            } else if wildcard_undefined_targets {
                Some(vec![Target::AllSubjects])
            } else {
                None
            };
            let Some(targets) = targets else {
                plan.skipped.push(shape.id.clone());
                continue;
            };
            let focus = PlanNode::Cache {
                input: PlanNode::Select { targets }.boxed(),
            };
            let mut constraints = Vec::new();
            plan_shape(shape, shape.path.as_ref(), &focus, &mut constraints);
            plan.shapes.push(ShapePlan {
                shape: shape.clone(),
                constraints,
            });
        }
        plan
    }

    pub fn constraint_count(&self) -> usize {
        self.shapes.iter().map(|s| s.constraints.len()).sum()
    }

    pub fn explain(&self) -> String {
        let mut out = String::new();
        for shape in &self.shapes {
            for c in &shape.constraints {
                out.push_str(&format!("{} {} ({})\n", shape.shape.id, c.component, c.shape.id));
                c.root.explain_into(1, &mut out);
            }
        }
        out
    }
}

fn plan_shape(
    shape: &Arc<Shape>,
    path: Option<&Iri>,
    focus: &PlanNode,
    out: &mut Vec<ConstraintPlan>,
) {
    for constraint in &shape.constraints {
        if let Constraint::Property(nested) = constraint {
            if !nested.deactivated {
                plan_shape(nested, nested.path.as_ref(), focus, out);
            }
            continue;
        }
        if let Some(root) = failures(constraint, path, focus) {
            out.push(ConstraintPlan {
                shape: shape.clone(),
                component: constraint.component(),
                path: path.cloned(),
                severity: shape.severity,
                message: shape
                    .message
                    .clone()
                    .unwrap_or_else(|| constraint.description()),
                root,
            });
        }
    }
}

/// Tuples violating `constraint` for the foci of `focus` along `path`.
fn failures(constraint: &Constraint, path: Option<&Iri>, focus: &PlanNode) -> Option<PlanNode> {
    let values = || PlanNode::Join {
        input: focus.clone().boxed(),
        path: path.cloned(),
    };
    let filter = |check: ValueCheck| PlanNode::Filter {
        input: values().boxed(),
        check,
    };
    let count = |check: ValueCheck| {
        path.map(|p| PlanNode::Filter {
            input: PlanNode::Aggregate {
                input: focus.clone().boxed(),
                path: p.clone(),
                op: AggregateOp::Count,
            }
            .boxed(),
            check,
        })
    };
    let except = |(left, key): &(PlanNode, ExceptKey), right: PlanNode| PlanNode::Except {
        left: left.clone().boxed(),
        right: right.boxed(),
        key: *key,
    };
    // Members that judge each value alone combine per value node; anything
    // else combines per focus node.
    let scope_of = |members: &[Arc<Shape>]| match path {
        Some(p) if members.iter().all(|m| value_local(m, p)) => (values(), ExceptKey::FocusValue),
        _ => (focus.clone(), ExceptKey::Focus),
    };

    Some(match constraint {
        Constraint::MinCount(n) => count(ValueCheck::AtLeast(*n))?,
        Constraint::MaxCount(n) => count(ValueCheck::AtMost(*n))?,
        Constraint::UniqueLang => PlanNode::Aggregate {
            input: focus.clone().boxed(),
            path: path?.clone(),
            op: AggregateOp::DuplicateLanguages,
        },
        Constraint::Datatype(dt) => filter(ValueCheck::Datatype(dt.clone())),
        Constraint::NodeKind(kind) => filter(ValueCheck::NodeKind(*kind)),
        Constraint::Class(class) => filter(ValueCheck::Class(class.clone())),
        Constraint::MinExclusive(b) => filter(range(RangeKind::MinExclusive, b)),
        Constraint::MinInclusive(b) => filter(range(RangeKind::MinInclusive, b)),
        Constraint::MaxExclusive(b) => filter(range(RangeKind::MaxExclusive, b)),
        Constraint::MaxInclusive(b) => filter(range(RangeKind::MaxInclusive, b)),
        Constraint::MinLength(n) => filter(ValueCheck::MinLength(*n)),
        Constraint::MaxLength(n) => filter(ValueCheck::MaxLength(*n)),
        Constraint::Pattern { source, regex, .. } => filter(ValueCheck::Pattern {
            source: source.clone(),
            regex: regex.clone(),
        }),
        Constraint::LanguageIn(langs) => filter(ValueCheck::LanguageIn(langs.clone())),
        Constraint::In(allowed) => filter(ValueCheck::In(allowed.clone())),
        Constraint::Property(nested) => shape_failures(nested, nested.path.as_ref(), focus),
        // Scope tuples failing some member: S \ (S \ ∪ fail_i).
        Constraint::And(members) => {
            let scope = scope_of(members.as_slice());
            let failed = PlanNode::Union {
                inputs: members
                    .iter()
                    .map(|m| member_failures(m, path, focus))
                    .collect(),
            };
            except(&scope, except(&scope, failed))
        }
        // Scope tuples passing no member: S \ ∪ (S \ fail_i).
        Constraint::Or(members) => {
            let scope = scope_of(members.as_slice());
            let passed = PlanNode::Union {
                inputs: members
                    .iter()
                    .map(|m| except(&scope, member_failures(m, path, focus)))
                    .collect(),
            };
            except(&scope, passed)
        }
        Constraint::Not(member) => {
            let scope = scope_of(std::slice::from_ref(member));
            except(&scope, member_failures(member, path, focus))
        }
    })
}

fn range(kind: RangeKind, bound: &Literal) -> ValueCheck {
    ValueCheck::Range {
        kind,
        bound: bound.clone(),
    }
}

/// Whether `member` decides each value of `parent_path` on its own: it stays
/// on that path and carries only per-value constraints.
fn value_local(member: &Shape, parent_path: &Iri) -> bool {
    if member.path.as_ref().is_some_and(|p| p != parent_path) {
        return false;
    }
    member.constraints.iter().all(|c| match c {
        Constraint::MinCount(_)
        | Constraint::MaxCount(_)
        | Constraint::UniqueLang
        | Constraint::Property(_) => false,
        Constraint::And(members) | Constraint::Or(members) => {
            members.iter().all(|m| value_local(m, parent_path))
        }
        Constraint::Not(inner) => value_local(inner, parent_path),
        _ => true,
    })
}

/// Path-less members of a logical constraint use the enclosing path.
fn member_failures(member: &Shape, parent_path: Option<&Iri>, focus: &PlanNode) -> PlanNode {
    shape_failures(member, member.path.as_ref().or(parent_path), focus)
}

fn shape_failures(shape: &Shape, path: Option<&Iri>, focus: &PlanNode) -> PlanNode {
    if shape.deactivated {
        return PlanNode::empty();
    }
    PlanNode::Union {
        inputs: shape
            .constraints
            .iter()
            .filter_map(|c| failures(c, path, focus))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapegate_store::{Fact, MemoryStore, PatternQueryEngine};

    const EX: &str = "http://example.org/";

    fn ex(local: &str) -> Term {
        Term::iri(format!("{EX}{local}"))
    }

    fn iri(local: &str) -> Iri {
        Iri::new(format!("{EX}{local}"))
    }

    fn shape(id: &str, targets: Vec<Target>, path: Option<Iri>, constraints: Vec<Constraint>) -> Arc<Shape> {
        Arc::new(Shape {
            id: ex(id),
            targets,
            path,
            constraints,
            deactivated: false,
            severity: Severity::Violation,
            message: None,
        })
    }

    fn run(schema_shapes: Vec<Arc<Shape>>, facts: Vec<Fact>) -> Vec<ViolationRecord> {
        let store = MemoryStore::new();
        store.insert_facts(facts);
        let view = DataView::of(Arc::new(store.snapshot()));
        let engine = PatternQueryEngine::new();
        let cache = SelectionCache::new();
        let ctx = ExecutionContext {
            view: &view,
            queries: &engine,
            cache: Some(&cache),
            subclass_reasoning: true,
        };
        let schema = CompiledSchema {
            shapes: schema_shapes,
            ..Default::default()
        };
        let plan = ValidationPlan::build(&schema, false);
        let mut out = Vec::new();
        for s in &plan.shapes {
            for c in &s.constraints {
                out.extend(c.violations(ctx, false).expect("violations"));
            }
        }
        out
    }

    #[test]
    fn max_count_counts_distinct_values() {
        let person = shape(
            "PersonShape",
            vec![Target::Class(iri("Person"))],
            None,
            vec![Constraint::Property(shape(
                "AgeShape",
                Vec::new(),
                Some(iri("age")),
                vec![Constraint::MinCount(1), Constraint::MaxCount(1)],
            ))],
        );
        let records = run(
            vec![person],
            vec![
                Fact::new(ex("alice"), "http://www.w3.org/1999/02/22-rdf-syntax-ns#type", ex("Person")),
                Fact::new(ex("alice"), iri("age"), Term::Literal(Literal::integer(30))),
                Fact::new(ex("alice"), iri("age"), Term::Literal(Literal::integer(31))),
            ],
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_constraint_component, ConstraintComponent::MaxCount);
        assert_eq!(records[0].source_shape, ex("AgeShape"));
        assert_eq!(records[0].result_path, Some(iri("age")));
    }

    #[test]
    fn subclass_instances_are_targeted() {
        let s = shape(
            "S",
            vec![Target::Class(iri("Person"))],
            Some(iri("name")),
            vec![Constraint::MinCount(1)],
        );
        let records = run(
            vec![s],
            vec![
                Fact::new(ex("Student"), "http://www.w3.org/2000/01/rdf-schema#subClassOf", ex("Person")),
                Fact::new(ex("bob"), "http://www.w3.org/1999/02/22-rdf-syntax-ns#type", ex("Student")),
            ],
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].focus_node, ex("bob"));
    }

    #[test]
    fn or_fails_only_when_every_branch_fails() {
        let short = shape("Short", Vec::new(), None, vec![Constraint::MaxLength(3)]);
        let numeric = shape(
            "Numeric",
            Vec::new(),
            None,
            vec![Constraint::Datatype(Iri::new(crate::vocab::xsd::INTEGER))],
        );
        let s = shape(
            "S",
            vec![Target::SubjectsOf(iri("code"))],
            Some(iri("code")),
            vec![Constraint::Or(vec![short, numeric])],
        );
        let records = run(
            vec![s],
            vec![
                Fact::new(ex("a"), iri("code"), Term::literal("ab")),
                Fact::new(ex("b"), iri("code"), Term::Literal(Literal::integer(12345))),
                Fact::new(ex("c"), iri("code"), Term::literal("too long")),
            ],
        );
        let foci: Vec<&Term> = records.iter().map(|r| &r.focus_node).collect();
        assert_eq!(foci, vec![&ex("c")]);
        assert_eq!(records[0].source_constraint_component, ConstraintComponent::Or);
    }

    fn code_shape(constraint: Constraint) -> Arc<Shape> {
        shape(
            "S",
            vec![Target::SubjectsOf(iri("code"))],
            Some(iri("code")),
            vec![constraint],
        )
    }

    fn integer_shape() -> Arc<Shape> {
        shape(
            "Numeric",
            Vec::new(),
            None,
            vec![Constraint::Datatype(Iri::new(crate::vocab::xsd::INTEGER))],
        )
    }

    #[test]
    fn or_is_decided_per_value() {
        let short = shape("Short", Vec::new(), None, vec![Constraint::MaxLength(3)]);
        let s = code_shape(Constraint::Or(vec![short, integer_shape()]));
        let records = run(
            vec![s],
            vec![
                Fact::new(ex("mixed"), iri("code"), Term::literal("ab")),
                Fact::new(ex("mixed"), iri("code"), Term::Literal(Literal::integer(12345))),
                Fact::new(ex("bad"), iri("code"), Term::literal("ab")),
                Fact::new(ex("bad"), iri("code"), Term::literal("too long")),
            ],
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].focus_node, ex("bad"));
        assert_eq!(records[0].value, Some(Term::literal("too long")));
        assert_eq!(records[0].source_constraint_component, ConstraintComponent::Or);
    }

    #[test]
    fn not_reports_each_conforming_value() {
        let s = code_shape(Constraint::Not(integer_shape()));
        let records = run(
            vec![s],
            vec![
                Fact::new(ex("a"), iri("code"), Term::literal("ab")),
                Fact::new(ex("a"), iri("code"), Term::Literal(Literal::integer(5))),
            ],
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].focus_node, ex("a"));
        assert_eq!(records[0].value, Some(Term::Literal(Literal::integer(5))));
        assert_eq!(records[0].source_constraint_component, ConstraintComponent::Not);
    }

    #[test]
    fn and_reports_values_failing_any_member() {
        let s = code_shape(Constraint::And(vec![
            shape("Long", Vec::new(), None, vec![Constraint::MinLength(2)]),
            shape("Short", Vec::new(), Some(iri("code")), vec![Constraint::MaxLength(4)]),
        ]));
        let records = run(
            vec![s],
            vec![
                Fact::new(ex("a"), iri("code"), Term::literal("x")),
                Fact::new(ex("a"), iri("code"), Term::literal("abc")),
                Fact::new(ex("a"), iri("code"), Term::literal("abcdef")),
            ],
        );
        let values: Vec<Option<Term>> = records.iter().map(|r| r.value.clone()).collect();
        assert_eq!(
            values,
            vec![Some(Term::literal("x")), Some(Term::literal("abcdef"))]
        );
        assert!(records
            .iter()
            .all(|r| r.source_constraint_component == ConstraintComponent::And));
    }

    #[test]
    fn cardinality_members_keep_focus_level_logic() {
        let pair = shape("Pair", Vec::new(), None, vec![Constraint::MinCount(2)]);
        let s = code_shape(Constraint::Or(vec![pair, integer_shape()]));
        let records = run(
            vec![s],
            vec![
                Fact::new(ex("one"), iri("code"), Term::literal("ab")),
                Fact::new(ex("two"), iri("code"), Term::literal("ab")),
                Fact::new(ex("two"), iri("code"), Term::literal("cd")),
            ],
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].focus_node, ex("one"));
        assert_eq!(records[0].value, None);

        let plan = ValidationPlan::build(
            &CompiledSchema {
                shapes: vec![code_shape(Constraint::Not(integer_shape()))],
                ..Default::default()
            },
            false,
        );
        assert!(plan.explain().contains("Except(value)"));
    }

    #[test]
    fn not_and_in_and_unique_lang() {
        let s = shape(
            "S",
            vec![Target::Node(ex("a"))],
            Some(iri("label")),
            vec![
                Constraint::UniqueLang,
                Constraint::In(vec![Term::Literal(Literal::lang("x", "en")), Term::Literal(Literal::lang("y", "en"))]),
                Constraint::Not(shape("Empty", Vec::new(), None, vec![Constraint::MinCount(1)])),
            ],
        );
        let records = run(
            vec![s],
            vec![
                Fact::new(ex("a"), iri("label"), Term::Literal(Literal::lang("x", "en"))),
                Fact::new(ex("a"), iri("label"), Term::Literal(Literal::lang("y", "en"))),
            ],
        );
        let components: Vec<ConstraintComponent> =
            records.iter().map(|r| r.source_constraint_component).collect();
        assert_eq!(
            components,
            vec![ConstraintComponent::UniqueLang, ConstraintComponent::Not]
        );
    }

    #[test]
    fn explain_shows_operator_tree() {
        let s = shape(
            "S",
            vec![Target::Class(iri("Person"))],
            Some(iri("age")),
            vec![Constraint::MaxCount(1)],
        );
        let plan = ValidationPlan::build(
            &CompiledSchema {
                shapes: vec![s],
                ..Default::default()
            },
            false,
        );
        assert_eq!(plan.constraint_count(), 1);
        let text = plan.explain();
        assert!(text.contains("Filter(count <= 1)"));
        assert!(text.contains("Aggregate(Count <http://example.org/age>)"));
        assert!(text.contains("Select(class <http://example.org/Person>)"));
    }

    #[test]
    fn untargeted_shapes_need_wildcard() {
        let s = shape("S", Vec::new(), Some(iri("p")), vec![Constraint::MinCount(1)]);
        let schema = CompiledSchema {
            shapes: vec![s],
            ..Default::default()
        };
        assert!(ValidationPlan::build(&schema, false).shapes.is_empty());
        let plan = ValidationPlan::build(&schema, true);
        assert!(matches!(
            &plan.shapes[0].constraints[0].root,
            PlanNode::Filter { .. }
        ));
    }
}
