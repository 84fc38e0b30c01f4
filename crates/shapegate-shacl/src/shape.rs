//! Shape model and the compiler that builds it from an inferred shapes graph.
//!
//! Compilation is best-effort: a malformed constraint is skipped with a
//! [`CompilationWarning`] and the rest of the shape still compiles. Shapes
//! come out in declaration order (first appearance in the shapes graph).

use crate::error::ShaclResult;
use crate::vocab::{rdf, sh};
use ahash::{AHashMap, AHashSet};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use shapegate_store::{Fact, FactPattern, Iri, Literal, Term, TripleSource};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Model
// ============================================================================

/// Result severity (`sh:severity`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Violation,
}

impl Severity {
    pub fn iri(self) -> &'static str {
        match self {
            Severity::Info => sh::INFO,
            Severity::Warning => sh::WARNING,
            Severity::Violation => sh::VIOLATION,
        }
    }

    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            sh::INFO => Some(Severity::Info),
            sh::WARNING => Some(Severity::Warning),
            sh::VIOLATION => Some(Severity::Violation),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("Info"),
            Severity::Warning => f.write_str("Warning"),
            Severity::Violation => f.write_str("Violation"),
        }
    }
}

/// How a shape selects its focus nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Instances of a class (`sh:targetClass`).
    Class(Iri),
    /// One explicit node (`sh:targetNode`).
    Node(Term),
    /// Subjects of a predicate (`sh:targetSubjectsOf`).
    SubjectsOf(Iri),
    /// Objects of a predicate (`sh:targetObjectsOf`).
    ObjectsOf(Iri),
    /// Every subject in the data; used for untargeted shapes in wildcard mode.
    AllSubjects,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Class(c) => write!(f, "class {c}"),
            Target::Node(n) => write!(f, "node {n}"),
            Target::SubjectsOf(p) => write!(f, "subjectsOf {p}"),
            Target::ObjectsOf(p) => write!(f, "objectsOf {p}"),
            Target::AllSubjects => f.write_str("all subjects"),
        }
    }
}

/// `sh:nodeKind` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            sh::IRI => Some(NodeKind::Iri),
            sh::BLANK_NODE => Some(NodeKind::BlankNode),
            sh::LITERAL => Some(NodeKind::Literal),
            sh::BLANK_NODE_OR_IRI => Some(NodeKind::BlankNodeOrIri),
            sh::BLANK_NODE_OR_LITERAL => Some(NodeKind::BlankNodeOrLiteral),
            sh::IRI_OR_LITERAL => Some(NodeKind::IriOrLiteral),
            _ => None,
        }
    }

    pub fn matches(self, term: &Term) -> bool {
        match self {
            NodeKind::Iri => term.is_iri(),
            NodeKind::BlankNode => term.is_blank_node(),
            NodeKind::Literal => term.is_literal(),
            NodeKind::BlankNodeOrIri => term.is_blank_node() || term.is_iri(),
            NodeKind::BlankNodeOrLiteral => term.is_blank_node() || term.is_literal(),
            NodeKind::IriOrLiteral => term.is_iri() || term.is_literal(),
        }
    }
}

/// A single typed constraint parameter.
#[derive(Debug, Clone)]
pub enum Constraint {
    MinCount(usize),
    MaxCount(usize),
    Datatype(Iri),
    NodeKind(NodeKind),
    Class(Iri),
    MinExclusive(Literal),
    MinInclusive(Literal),
    MaxExclusive(Literal),
    MaxInclusive(Literal),
    MinLength(usize),
    MaxLength(usize),
    Pattern {
        source: String,
        flags: Option<String>,
        regex: Regex,
    },
    LanguageIn(Vec<String>),
    UniqueLang,
    In(Vec<Term>),
    Property(Arc<Shape>),
    And(Vec<Arc<Shape>>),
    Or(Vec<Arc<Shape>>),
    Not(Arc<Shape>),
}

impl Constraint {
    pub fn component(&self) -> ConstraintComponent {
        match self {
            Constraint::MinCount(_) => ConstraintComponent::MinCount,
            Constraint::MaxCount(_) => ConstraintComponent::MaxCount,
            Constraint::Datatype(_) => ConstraintComponent::Datatype,
            Constraint::NodeKind(_) => ConstraintComponent::NodeKind,
            Constraint::Class(_) => ConstraintComponent::Class,
            Constraint::MinExclusive(_) => ConstraintComponent::MinExclusive,
            Constraint::MinInclusive(_) => ConstraintComponent::MinInclusive,
            Constraint::MaxExclusive(_) => ConstraintComponent::MaxExclusive,
            Constraint::MaxInclusive(_) => ConstraintComponent::MaxInclusive,
            Constraint::MinLength(_) => ConstraintComponent::MinLength,
            Constraint::MaxLength(_) => ConstraintComponent::MaxLength,
            Constraint::Pattern { .. } => ConstraintComponent::Pattern,
            Constraint::LanguageIn(_) => ConstraintComponent::LanguageIn,
            Constraint::UniqueLang => ConstraintComponent::UniqueLang,
            Constraint::In(_) => ConstraintComponent::In,
            Constraint::Property(_) => ConstraintComponent::Property,
            Constraint::And(_) => ConstraintComponent::And,
            Constraint::Or(_) => ConstraintComponent::Or,
            Constraint::Not(_) => ConstraintComponent::Not,
        }
    }

    /// Human-readable description, used when a shape has no `sh:message`.
    pub fn description(&self) -> String {
        match self {
            Constraint::MinCount(n) => format!("expected at least {n} value(s)"),
            Constraint::MaxCount(n) => format!("expected at most {n} value(s)"),
            Constraint::Datatype(dt) => format!("value must be a valid {}", dt.local_name()),
            Constraint::NodeKind(kind) => format!("value must have node kind {kind:?}"),
            Constraint::Class(c) => format!("value must be an instance of {}", c.local_name()),
            Constraint::MinExclusive(v) => format!("value must be > {}", v.lexical()),
            Constraint::MinInclusive(v) => format!("value must be >= {}", v.lexical()),
            Constraint::MaxExclusive(v) => format!("value must be < {}", v.lexical()),
            Constraint::MaxInclusive(v) => format!("value must be <= {}", v.lexical()),
            Constraint::MinLength(n) => format!("value must have at least {n} characters"),
            Constraint::MaxLength(n) => format!("value must have at most {n} characters"),
            Constraint::Pattern { source, .. } => format!("value must match pattern '{source}'"),
            Constraint::LanguageIn(langs) => {
                format!("language tag must be one of [{}]", langs.join(", "))
            }
            Constraint::UniqueLang => "language tags must be unique".to_string(),
            Constraint::In(values) => format!("value must be one of {} allowed values", values.len()),
            Constraint::Property(shape) => format!("must conform to property shape {}", shape.id),
            Constraint::And(shapes) => format!("must conform to all {} shapes", shapes.len()),
            Constraint::Or(shapes) => format!("must conform to at least one of {} shapes", shapes.len()),
            Constraint::Not(shape) => format!("must not conform to shape {}", shape.id),
        }
    }
}

/// SHACL constraint component reported as `sh:sourceConstraintComponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintComponent {
    MinCount,
    MaxCount,
    Datatype,
    NodeKind,
    Class,
    MinExclusive,
    MinInclusive,
    MaxExclusive,
    MaxInclusive,
    MinLength,
    MaxLength,
    Pattern,
    LanguageIn,
    UniqueLang,
    In,
    Property,
    And,
    Or,
    Not,
}

impl ConstraintComponent {
    pub fn name(self) -> &'static str {
        match self {
            ConstraintComponent::MinCount => "MinCountConstraintComponent",
            ConstraintComponent::MaxCount => "MaxCountConstraintComponent",
            ConstraintComponent::Datatype => "DatatypeConstraintComponent",
            ConstraintComponent::NodeKind => "NodeKindConstraintComponent",
            ConstraintComponent::Class => "ClassConstraintComponent",
            ConstraintComponent::MinExclusive => "MinExclusiveConstraintComponent",
            ConstraintComponent::MinInclusive => "MinInclusiveConstraintComponent",
            ConstraintComponent::MaxExclusive => "MaxExclusiveConstraintComponent",
            ConstraintComponent::MaxInclusive => "MaxInclusiveConstraintComponent",
            ConstraintComponent::MinLength => "MinLengthConstraintComponent",
            ConstraintComponent::MaxLength => "MaxLengthConstraintComponent",
            ConstraintComponent::Pattern => "PatternConstraintComponent",
            ConstraintComponent::LanguageIn => "LanguageInConstraintComponent",
            ConstraintComponent::UniqueLang => "UniqueLangConstraintComponent",
            ConstraintComponent::In => "InConstraintComponent",
            ConstraintComponent::Property => "PropertyConstraintComponent",
            ConstraintComponent::And => "AndConstraintComponent",
            ConstraintComponent::Or => "OrConstraintComponent",
            ConstraintComponent::Not => "NotConstraintComponent",
        }
    }

    pub fn iri(self) -> Iri {
        Iri::new(format!("{}{}", sh::NS, self.name()))
    }
}

impl fmt::Display for ConstraintComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled shape. Immutable once built and shared behind `Arc`.
#[derive(Debug, Clone)]
pub struct Shape {
    pub id: Term,
    pub targets: Vec<Target>,
    /// Single-predicate path; `None` for node shapes.
    pub path: Option<Iri>,
    pub constraints: Vec<Constraint>,
    pub deactivated: bool,
    pub severity: Severity,
    pub message: Option<String>,
}

impl Shape {
    pub fn is_property_shape(&self) -> bool {
        self.path.is_some()
    }
}

/// A constraint or shape that could not be compiled and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationWarning {
    pub shape: String,
    pub message: String,
}

impl fmt::Display for CompilationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.shape, self.message)
    }
}

/// Output of [`compile_shapes`].
#[derive(Debug, Clone, Default)]
pub struct CompiledShapes {
    /// Top-level shapes in declaration order.
    pub shapes: Vec<Arc<Shape>>,
    pub warnings: Vec<CompilationWarning>,
}

// ============================================================================
// Compiler
// ============================================================================

const TARGET_PREDICATES: &[&str] = &[
    sh::TARGET_CLASS,
    sh::TARGET_NODE,
    sh::TARGET_SUBJECTS_OF,
    sh::TARGET_OBJECTS_OF,
];

/// Non-validating `sh:` predicates that are accepted and ignored.
const ANNOTATION_PREDICATES: &[&str] = &[
    "http://www.w3.org/ns/shacl#name",
    "http://www.w3.org/ns/shacl#description",
    "http://www.w3.org/ns/shacl#order",
    "http://www.w3.org/ns/shacl#group",
    "http://www.w3.org/ns/shacl#defaultValue",
];

/// Compile every top-level shape declared in `graph`.
///
/// Top-level shapes are those with a target, plus declared node/property
/// shapes that no other shape references.
pub fn compile_shapes(graph: &dyn TripleSource) -> ShaclResult<CompiledShapes> {
    let mut compiler = ShapeCompiler {
        graph,
        memo: AHashMap::new(),
        in_progress: AHashSet::new(),
        warnings: Vec::new(),
    };

    let mut declared = Vec::new();
    let mut seen = AHashSet::new();
    let mut targeted = AHashSet::new();
    let mut referenced = AHashSet::new();
    for fact in graph.match_facts(&FactPattern::any())? {
        let p = fact.predicate.as_str();
        let declares = (p == rdf::TYPE
            && matches!(fact.object.as_iri().map(Iri::as_str), Some(sh::NODE_SHAPE | sh::PROPERTY_SHAPE)))
            || TARGET_PREDICATES.contains(&p);
        if TARGET_PREDICATES.contains(&p) {
            targeted.insert(fact.subject.clone());
        }
        if p == sh::PROPERTY || p == sh::NOT {
            referenced.insert(fact.object.clone());
        }
        if p == sh::AND || p == sh::OR {
            if let Some(members) = compiler.read_list(&fact.object)? {
                referenced.extend(members);
            }
        }
        if declares && seen.insert(fact.subject.clone()) {
            declared.push(fact.subject);
        }
    }

    let mut shapes = Vec::new();
    for id in declared {
        if !targeted.contains(&id) && referenced.contains(&id) {
            continue;
        }
        if let Some(shape) = compiler.compile(&id)? {
            shapes.push(shape);
        }
    }

    for warning in &compiler.warnings {
        tracing::warn!(shape = %warning.shape, "skipped during shape compilation: {}", warning.message);
    }
    Ok(CompiledShapes {
        shapes,
        warnings: compiler.warnings,
    })
}

struct ShapeCompiler<'g> {
    graph: &'g dyn TripleSource,
    memo: AHashMap<Term, Arc<Shape>>,
    in_progress: AHashSet<Term>,
    warnings: Vec<CompilationWarning>,
}

impl ShapeCompiler<'_> {
    fn warn(&mut self, shape: &Term, message: impl Into<String>) {
        self.warnings.push(CompilationWarning {
            shape: shape.to_string(),
            message: message.into(),
        });
    }

    fn objects(&self, subject: &Term, predicate: &str) -> ShaclResult<Vec<Term>> {
        let pattern = FactPattern::any()
            .with_subject(subject.clone())
            .with_predicate(predicate);
        Ok(self.graph.match_facts(&pattern)?.map(|f| f.object).collect())
    }

    /// Members of an `rdf:first`/`rdf:rest` list; `None` if malformed.
    fn read_list(&self, head: &Term) -> ShaclResult<Option<Vec<Term>>> {
        let nil = Term::iri(rdf::NIL);
        let mut members = Vec::new();
        let mut visited = AHashSet::new();
        let mut node = head.clone();
        while node != nil {
            if !visited.insert(node.clone()) {
                return Ok(None);
            }
            let (first, rest) = (self.objects(&node, rdf::FIRST)?, self.objects(&node, rdf::REST)?);
            let ([first], [rest]) = (first.as_slice(), rest.as_slice()) else {
                return Ok(None);
            };
            members.push(first.clone());
            node = rest.clone();
        }
        Ok(Some(members))
    }

    fn compile(&mut self, id: &Term) -> ShaclResult<Option<Arc<Shape>>> {
        if let Some(shape) = self.memo.get(id) {
            return Ok(Some(shape.clone()));
        }
        if !self.in_progress.insert(id.clone()) {
            self.warn(id, "recursive shape reference");
            return Ok(None);
        }
        let result = self.compile_fresh(id);
        self.in_progress.remove(id);
        let shape = result?;
        if let Some(shape) = &shape {
            self.memo.insert(id.clone(), shape.clone());
        }
        Ok(shape)
    }

    fn compile_fresh(&mut self, id: &Term) -> ShaclResult<Option<Arc<Shape>>> {
        let facts: Vec<Fact> = self
            .graph
            .match_facts(&FactPattern::any().with_subject(id.clone()))?
            .collect();

        let mut shape = Shape {
            id: id.clone(),
            targets: Vec::new(),
            path: None,
            constraints: Vec::new(),
            deactivated: false,
            severity: Severity::default(),
            message: None,
        };
        let mut patterns = Vec::new();
        let mut flags = None;
        let mut unsupported_path = false;

        for fact in &facts {
            let object = &fact.object;
            match fact.predicate.as_str() {
                rdf::TYPE => {}
                sh::TARGET_CLASS => match object.as_iri() {
                    Some(c) => shape.targets.push(Target::Class(c.clone())),
                    None => self.warn(id, format!("sh:targetClass must be an IRI, got {object}")),
                },
                sh::TARGET_NODE => shape.targets.push(Target::Node(object.clone())),
                sh::TARGET_SUBJECTS_OF => match object.as_iri() {
                    Some(p) => shape.targets.push(Target::SubjectsOf(p.clone())),
                    None => self.warn(id, "sh:targetSubjectsOf must be an IRI"),
                },
                sh::TARGET_OBJECTS_OF => match object.as_iri() {
                    Some(p) => shape.targets.push(Target::ObjectsOf(p.clone())),
                    None => self.warn(id, "sh:targetObjectsOf must be an IRI"),
                },
                sh::PATH => match (object.as_iri(), &shape.path) {
                    (Some(p), None) => shape.path = Some(p.clone()),
                    (Some(_), Some(_)) => self.warn(id, "multiple sh:path values; keeping the first"),
                    (None, _) => {
                        self.warn(id, "only single-predicate paths are supported; shape skipped");
                        unsupported_path = true;
                    }
                },
                sh::DEACTIVATED => shape.deactivated = is_true(object),
                sh::SEVERITY => match object.as_iri().and_then(|s| Severity::from_iri(s.as_str())) {
                    Some(severity) => shape.severity = severity,
                    None => self.warn(id, format!("unknown severity {object}")),
                },
                sh::MESSAGE => {
                    if let (Some(lit), None) = (object.as_literal(), &shape.message) {
                        shape.message = Some(lit.lexical().to_string());
                    }
                }
                sh::MIN_COUNT => self.push_count(id, object, &mut shape, Constraint::MinCount),
                sh::MAX_COUNT => self.push_count(id, object, &mut shape, Constraint::MaxCount),
                sh::MIN_LENGTH => self.push_count(id, object, &mut shape, Constraint::MinLength),
                sh::MAX_LENGTH => self.push_count(id, object, &mut shape, Constraint::MaxLength),
                sh::PATTERN => match object.as_literal() {
                    Some(lit) => patterns.push(lit.lexical().to_string()),
                    None => self.warn(id, "sh:pattern must be a literal"),
                },
                sh::FLAGS => flags = object.as_literal().map(|l| l.lexical().to_string()),
                sh::NODE_KIND => match object.as_iri().and_then(|k| NodeKind::from_iri(k.as_str())) {
                    Some(kind) => shape.constraints.push(Constraint::NodeKind(kind)),
                    None => self.warn(id, format!("unknown node kind {object}")),
                },
                sh::DATATYPE => match object.as_iri() {
                    Some(dt) => shape.constraints.push(Constraint::Datatype(dt.clone())),
                    None => self.warn(id, "sh:datatype must be an IRI"),
                },
                sh::CLASS => match object.as_iri() {
                    Some(c) => shape.constraints.push(Constraint::Class(c.clone())),
                    None => self.warn(id, "sh:class must be an IRI"),
                },
                sh::MIN_EXCLUSIVE => self.push_bound(id, object, &mut shape, Constraint::MinExclusive),
                sh::MIN_INCLUSIVE => self.push_bound(id, object, &mut shape, Constraint::MinInclusive),
                sh::MAX_EXCLUSIVE => self.push_bound(id, object, &mut shape, Constraint::MaxExclusive),
                sh::MAX_INCLUSIVE => self.push_bound(id, object, &mut shape, Constraint::MaxInclusive),
                sh::UNIQUE_LANG => {
                    if is_true(object) {
                        shape.constraints.push(Constraint::UniqueLang);
                    }
                }
                sh::LANGUAGE_IN => match self.read_list(object)? {
                    Some(items) => {
                        let langs: Option<Vec<String>> = items
                            .iter()
                            .map(|t| t.as_literal().map(|l| l.lexical().to_ascii_lowercase()))
                            .collect();
                        match langs {
                            Some(langs) => shape.constraints.push(Constraint::LanguageIn(langs)),
                            None => self.warn(id, "sh:languageIn members must be literals"),
                        }
                    }
                    None => self.warn(id, "sh:languageIn is not a well-formed list"),
                },
                sh::IN => match self.read_list(object)? {
                    Some(items) => shape.constraints.push(Constraint::In(items)),
                    None => self.warn(id, "sh:in is not a well-formed list"),
                },
                sh::PROPERTY => match self.compile(object)? {
                    Some(nested) => shape.constraints.push(Constraint::Property(nested)),
                    None => self.warn(id, format!("property shape {object} skipped")),
                },
                sh::NOT => match self.compile(object)? {
                    Some(nested) => shape.constraints.push(Constraint::Not(nested)),
                    None => self.warn(id, format!("sh:not shape {object} skipped")),
                },
                sh::AND | sh::OR => {
                    let is_and = fact.predicate.as_str() == sh::AND;
                    let Some(members) = self.read_list(object)? else {
                        self.warn(id, "logical constraint is not a well-formed list");
                        continue;
                    };
                    let mut compiled = Vec::with_capacity(members.len());
                    for member in &members {
                        if let Some(m) = self.compile(member)? {
                            compiled.push(m);
                        }
                    }
                    if compiled.len() != members.len() {
                        self.warn(id, "logical constraint has members that failed to compile; skipped");
                    } else if is_and {
                        shape.constraints.push(Constraint::And(compiled));
                    } else {
                        shape.constraints.push(Constraint::Or(compiled));
                    }
                }
                p if p.starts_with(sh::NS) && !ANNOTATION_PREDICATES.contains(&p) => {
                    self.warn(id, format!("unsupported constraint <{p}>"));
                }
                _ => {}
            }
        }

        for source in patterns {
            match build_regex(&source, flags.as_deref()) {
                Ok(regex) => shape.constraints.push(Constraint::Pattern {
                    source,
                    flags: flags.clone(),
                    regex,
                }),
                Err(message) => self.warn(id, message),
            }
        }

        if unsupported_path {
            return Ok(None);
        }

        if shape.is_property_shape() {
            let before = shape.constraints.len();
            shape
                .constraints
                .retain(|c| !matches!(c, Constraint::Property(_)));
            if shape.constraints.len() != before {
                self.warn(id, "nested property shapes under a property shape need multi-segment paths; skipped");
            }
        } else {
            let before = shape.constraints.len();
            shape.constraints.retain(|c| {
                !matches!(
                    c,
                    Constraint::MinCount(_) | Constraint::MaxCount(_) | Constraint::UniqueLang
                )
            });
            if shape.constraints.len() != before {
                self.warn(id, "cardinality and uniqueLang constraints need sh:path; skipped");
            }
        }

        Ok(Some(Arc::new(shape)))
    }

    fn push_count(
        &mut self,
        id: &Term,
        object: &Term,
        shape: &mut Shape,
        make: fn(usize) -> Constraint,
    ) {
        match object
            .as_literal()
            .and_then(|l| l.lexical().trim().parse::<usize>().ok())
        {
            Some(n) => shape.constraints.push(make(n)),
            None => self.warn(id, format!("expected a non-negative integer, got {object}")),
        }
    }

    fn push_bound(
        &mut self,
        id: &Term,
        object: &Term,
        shape: &mut Shape,
        make: fn(Literal) -> Constraint,
    ) {
        match object.as_literal() {
            Some(lit) => shape.constraints.push(make(lit.clone())),
            None => self.warn(id, format!("range bound must be a literal, got {object}")),
        }
    }
}

fn is_true(term: &Term) -> bool {
    term.as_literal()
        .is_some_and(|l| matches!(l.lexical().trim(), "true" | "1"))
}

/// Build a regex honouring SHACL/XPath flags (`i`, `m`, `s`, `x`, `q`).
pub(crate) fn build_regex(source: &str, flags: Option<&str>) -> Result<Regex, String> {
    let mut literal = false;
    let mut builder_flags = (false, false, false, false);
    for flag in flags.unwrap_or("").chars() {
        match flag {
            'i' => builder_flags.0 = true,
            'm' => builder_flags.1 = true,
            's' => builder_flags.2 = true,
            'x' => builder_flags.3 = true,
            'q' => literal = true,
            other => return Err(format!("unsupported regex flag '{other}'")),
        }
    }
    let pattern = if literal {
        regex::escape(source)
    } else {
        source.to_string()
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(builder_flags.0)
        .multi_line(builder_flags.1)
        .dot_matches_new_line(builder_flags.2)
        .ignore_whitespace(builder_flags.3)
        .build()
        .map_err(|e| format!("invalid pattern '{source}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapegate_store::MemoryStore;

    const EX: &str = "http://example.org/";

    fn ex(local: &str) -> Term {
        Term::iri(format!("{EX}{local}"))
    }

    fn graph(facts: Vec<Fact>) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_facts(facts);
        store
    }

    #[test]
    fn compiles_targets_path_and_counts_in_order() {
        let store = graph(vec![
            Fact::new(ex("S"), rdf::TYPE, Term::iri(sh::NODE_SHAPE)),
            Fact::new(ex("S"), sh::TARGET_CLASS, ex("Person")),
            Fact::new(ex("S"), sh::PROPERTY, Term::blank("p")),
            Fact::new(Term::blank("p"), sh::PATH, ex("age")),
            Fact::new(Term::blank("p"), sh::MIN_COUNT, Term::Literal(Literal::integer(1))),
            Fact::new(Term::blank("p"), sh::MAX_COUNT, Term::Literal(Literal::integer(1))),
        ]);
        let compiled = compile_shapes(&store.snapshot()).expect("compile");
        assert!(compiled.warnings.is_empty(), "{:?}", compiled.warnings);
        assert_eq!(compiled.shapes.len(), 1);
        let shape = &compiled.shapes[0];
        assert_eq!(shape.targets, vec![Target::Class(Iri::new(format!("{EX}Person")))]);
        let Constraint::Property(nested) = &shape.constraints[0] else {
            panic!("expected property constraint");
        };
        assert_eq!(nested.path.as_ref().map(Iri::as_str), Some("http://example.org/age"));
        assert!(matches!(nested.constraints[0], Constraint::MinCount(1)));
        assert!(matches!(nested.constraints[1], Constraint::MaxCount(1)));
    }

    #[test]
    fn malformed_constraints_are_skipped_with_warnings() {
        let store = graph(vec![
            Fact::new(ex("S"), sh::TARGET_NODE, ex("a")),
            Fact::new(ex("S"), sh::PATH, ex("name")),
            Fact::new(ex("S"), sh::MIN_LENGTH, Term::literal("many")),
            Fact::new(ex("S"), sh::PATTERN, Term::literal("(unclosed")),
            Fact::new(ex("S"), sh::MAX_LENGTH, Term::Literal(Literal::integer(5))),
            Fact::new(ex("S"), "http://www.w3.org/ns/shacl#qualifiedValueShape", ex("Q")),
        ]);
        let compiled = compile_shapes(&store.snapshot()).expect("compile");
        assert_eq!(compiled.shapes.len(), 1);
        assert_eq!(compiled.warnings.len(), 3);
        let shape = &compiled.shapes[0];
        assert_eq!(shape.constraints.len(), 1);
        assert!(matches!(shape.constraints[0], Constraint::MaxLength(5)));
    }

    #[test]
    fn recursive_references_do_not_loop() {
        let store = graph(vec![
            Fact::new(ex("A"), sh::TARGET_NODE, ex("x")),
            Fact::new(ex("A"), sh::NOT, ex("A")),
        ]);
        let compiled = compile_shapes(&store.snapshot()).expect("compile");
        assert!(compiled
            .warnings
            .iter()
            .any(|w| w.message.contains("recursive")));
    }

    #[test]
    fn regex_flags_are_honoured() {
        let re = build_regex("^abc$", Some("i")).expect("regex");
        assert!(re.is_match("ABC"));
        let re = build_regex("a.c", Some("q")).expect("regex");
        assert!(!re.is_match("abc"));
        assert!(build_regex("a", Some("z")).is_err());
    }
}
