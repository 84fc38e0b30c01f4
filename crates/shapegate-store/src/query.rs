//! Pattern queries: a small SPARQL-shaped language evaluated over any
//! [`TripleSource`].
//!
//! ```text
//! PREFIX ex: <http://example.org/>
//! ?focus rdf:type/rdfs:subClassOf* ex:Person .
//! ?focus ex:age ?age .
//! NOT { ?focus ex:retired true }
//! ```
//!
//! Supported: triple patterns, `a`, variables, IRIs, prefixed names,
//! literals (quoted, numeric, boolean), blank nodes, `NOT { ... }` groups and
//! sequence paths whose steps may carry a `*` closure. Update rules use
//! `INSERT { template } WHERE { pattern }`.
//!
//! Evaluation is a nested-loop join in textual order; `NOT` filters the
//! solutions produced so far.

use crate::error::{StoreError, StoreResult};
use crate::pattern::FactPattern;
use crate::source::TripleSource;
use crate::term::{Fact, Iri, Literal, Term};
use crate::vocab::{rdf, xsd, BUILTIN_PREFIXES};
use ahash::AHashSet;
use dashmap::DashMap;
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, not, opt, recognize, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// Variable name (without `?`) to bound term.
pub type Bindings = BTreeMap<String, Term>;

/// Lazy sequence of solutions.
pub type BindingsIter = Box<dyn Iterator<Item = Bindings> + Send>;

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternTerm {
    Var(String),
    Const(Term),
}

/// One step of a sequence path; `closure` means zero or more repetitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub predicate: Iri,
    pub closure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub path: Vec<PathStep>,
    pub object: PatternTerm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupElement {
    Triple(TriplePattern),
    Not(Vec<GroupElement>),
}

/// A parsed pattern query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternQuery {
    pub elements: Vec<GroupElement>,
}

/// `INSERT { template } WHERE { pattern }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRule {
    pub template: Vec<TriplePattern>,
    pub pattern: PatternQuery,
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone)]
enum RawIri {
    Full(String),
    Prefixed(String, String),
    A,
}

#[derive(Debug, Clone)]
enum RawTerm {
    Var(String),
    Iri(RawIri),
    Blank(String),
    Literal {
        lexical: String,
        language: Option<String>,
        datatype: Option<RawIri>,
    },
    Typed(String, &'static str),
}

#[derive(Debug, Clone)]
struct RawTriple {
    subject: RawTerm,
    path: Vec<(RawIri, bool)>,
    object: RawTerm,
}

#[derive(Debug, Clone)]
enum RawElement {
    Triple(RawTriple),
    Not(Vec<RawElement>),
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn iri_ref(input: &str) -> IResult<&str, RawIri> {
    map(
        delimited(
            char('<'),
            take_while(|c: char| c != '>' && !c.is_whitespace()),
            char('>'),
        ),
        |s: &str| RawIri::Full(s.to_string()),
    )(input)
}

fn prefixed_name(input: &str) -> IResult<&str, RawIri> {
    map(
        pair(
            terminated(take_while(is_name_char), char(':')),
            take_while(is_name_char),
        ),
        |(prefix, local): (&str, &str)| RawIri::Prefixed(prefix.to_string(), local.to_string()),
    )(input)
}

/// Succeeds without consuming when no name character follows.
fn word_end(input: &str) -> IResult<&str, ()> {
    not(satisfy(|c| is_name_char(c) || c == ':'))(input)
}

fn keyword_a(input: &str) -> IResult<&str, RawIri> {
    value(RawIri::A, terminated(char('a'), word_end))(input)
}

fn variable(input: &str) -> IResult<&str, RawTerm> {
    map(
        preceded(alt((char('?'), char('$'))), take_while1(is_name_char)),
        |name: &str| RawTerm::Var(name.to_string()),
    )(input)
}

fn blank_node(input: &str) -> IResult<&str, RawTerm> {
    map(preceded(tag("_:"), take_while1(is_name_char)), |label: &str| {
        RawTerm::Blank(label.to_string())
    })(input)
}

fn quoted_string(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("\n", tag("n")),
                    value("\r", tag("r")),
                    value("\t", tag("t")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, RawTerm> {
    let (input, lexical) = quoted_string(input)?;
    let (input, language) = opt(preceded(char('@'), take_while1(is_name_char)))(input)?;
    let (input, datatype) = match language {
        Some(_) => (input, None),
        None => opt(preceded(tag("^^"), alt((iri_ref, prefixed_name))))(input)?,
    };
    Ok((
        input,
        RawTerm::Literal {
            lexical,
            language: language.map(str::to_string),
            datatype,
        },
    ))
}

fn numeric_literal(input: &str) -> IResult<&str, RawTerm> {
    alt((
        map(
            recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
            |s: &str| RawTerm::Typed(s.to_string(), xsd::DECIMAL),
        ),
        map(recognize(pair(opt(char('-')), digit1)), |s: &str| {
            RawTerm::Typed(s.to_string(), xsd::INTEGER)
        }),
    ))(input)
}

fn boolean_literal(input: &str) -> IResult<&str, RawTerm> {
    map(
        terminated(alt((tag("true"), tag("false"))), word_end),
        |s: &str| RawTerm::Typed(s.to_string(), xsd::BOOLEAN),
    )(input)
}

fn term(input: &str) -> IResult<&str, RawTerm> {
    alt((
        variable,
        map(iri_ref, RawTerm::Iri),
        blank_node,
        string_literal,
        numeric_literal,
        boolean_literal,
        map(prefixed_name, RawTerm::Iri),
    ))(input)
}

fn path(input: &str) -> IResult<&str, Vec<(RawIri, bool)>> {
    separated_list1(
        char('/'),
        pair(
            alt((keyword_a, iri_ref, prefixed_name)),
            map(opt(char('*')), |star| star.is_some()),
        ),
    )(input)
}

fn triple(input: &str) -> IResult<&str, RawTriple> {
    map(
        tuple((ws(term), ws(path), ws(term))),
        |(subject, path, object)| RawTriple {
            subject,
            path,
            object,
        },
    )(input)
}

fn not_block(input: &str) -> IResult<&str, RawElement> {
    map(
        preceded(
            ws(tag_no_case("NOT")),
            delimited(ws(char('{')), group, ws(char('}'))),
        ),
        RawElement::Not,
    )(input)
}

fn element(input: &str) -> IResult<&str, RawElement> {
    terminated(
        alt((not_block, map(triple, RawElement::Triple))),
        opt(ws(char('.'))),
    )(input)
}

fn group(input: &str) -> IResult<&str, Vec<RawElement>> {
    many0(element)(input)
}

fn prefix_decl(input: &str) -> IResult<&str, (String, String)> {
    map(
        tuple((
            ws(tag_no_case("PREFIX")),
            ws(terminated(take_while(is_name_char), char(':'))),
            ws(iri_ref),
        )),
        |(_, prefix, iri)| {
            let iri = match iri {
                RawIri::Full(iri) => iri,
                _ => String::new(),
            };
            (prefix.to_string(), iri)
        },
    )(input)
}

fn query_text(input: &str) -> IResult<&str, (Vec<(String, String)>, Vec<RawElement>)> {
    all_consuming(pair(many0(prefix_decl), terminated(group, multispace0)))(input)
}

#[allow(clippy::type_complexity)]
fn rule_text(
    input: &str,
) -> IResult<&str, (Vec<(String, String)>, Vec<RawTriple>, Vec<RawElement>)> {
    all_consuming(tuple((
        many0(prefix_decl),
        preceded(
            ws(tag_no_case("INSERT")),
            delimited(
                ws(char('{')),
                many0(terminated(triple, opt(ws(char('.'))))),
                ws(char('}')),
            ),
        ),
        preceded(
            ws(tag_no_case("WHERE")),
            delimited(ws(char('{')), group, ws(char('}'))),
        ),
    )))(input)
}

// ============================================================================
// Prefix resolution
// ============================================================================

struct Resolver {
    prefixes: HashMap<String, String>,
}

impl Resolver {
    fn new(declared: Vec<(String, String)>) -> Self {
        let mut prefixes: HashMap<String, String> = BUILTIN_PREFIXES
            .iter()
            .map(|(p, ns)| (p.to_string(), ns.to_string()))
            .collect();
        prefixes.extend(declared);
        Self { prefixes }
    }

    fn iri(&self, raw: RawIri) -> StoreResult<Iri> {
        match raw {
            RawIri::Full(iri) => Ok(Iri::new(iri)),
            RawIri::A => Ok(Iri::new(rdf::TYPE)),
            RawIri::Prefixed(prefix, local) => match self.prefixes.get(&prefix) {
                Some(ns) => Ok(Iri::new(format!("{ns}{local}"))),
                None => Err(StoreError::query(format!("unknown prefix '{prefix}:'"))),
            },
        }
    }

    fn term(&self, raw: RawTerm) -> StoreResult<PatternTerm> {
        Ok(match raw {
            RawTerm::Var(name) => PatternTerm::Var(name),
            RawTerm::Iri(iri) => PatternTerm::Const(Term::Iri(self.iri(iri)?)),
            RawTerm::Blank(label) => PatternTerm::Const(Term::blank(label)),
            RawTerm::Literal {
                lexical,
                language: Some(lang),
                ..
            } => PatternTerm::Const(Term::Literal(Literal::lang(lexical, lang))),
            RawTerm::Literal {
                lexical,
                datatype: Some(dt),
                ..
            } => PatternTerm::Const(Term::Literal(Literal::typed(lexical, self.iri(dt)?))),
            RawTerm::Literal { lexical, .. } => PatternTerm::Const(Term::literal(lexical)),
            RawTerm::Typed(lexical, dt) => {
                PatternTerm::Const(Term::Literal(Literal::typed(lexical, Iri::new(dt))))
            }
        })
    }

    fn triple(&self, raw: RawTriple) -> StoreResult<TriplePattern> {
        let path = raw
            .path
            .into_iter()
            .map(|(iri, closure)| {
                Ok(PathStep {
                    predicate: self.iri(iri)?,
                    closure,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(TriplePattern {
            subject: self.term(raw.subject)?,
            path,
            object: self.term(raw.object)?,
        })
    }

    fn group(&self, raw: Vec<RawElement>) -> StoreResult<Vec<GroupElement>> {
        raw.into_iter()
            .map(|el| match el {
                RawElement::Triple(t) => Ok(GroupElement::Triple(self.triple(t)?)),
                RawElement::Not(inner) => Ok(GroupElement::Not(self.group(inner)?)),
            })
            .collect()
    }
}

fn parse_failure(kind: &str, text: &str, err: nom::Err<nom::error::Error<&str>>) -> StoreError {
    let at = match &err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input.chars().take(40).collect::<String>(),
        nom::Err::Incomplete(_) => String::new(),
    };
    StoreError::query(format!(
        "failed to parse {kind} near '{at}' in: {}",
        text.trim()
    ))
}

impl PatternQuery {
    pub fn parse(text: &str) -> StoreResult<Self> {
        let (_, (prefixes, raw)) = query_text(text).map_err(|e| parse_failure("query", text, e))?;
        let resolver = Resolver::new(prefixes);
        Ok(Self {
            elements: resolver.group(raw)?,
        })
    }

    /// All solutions extending `seed`, in evaluation order.
    pub fn solutions(&self, source: &dyn TripleSource, seed: &Bindings) -> StoreResult<Vec<Bindings>> {
        eval_group(source, &self.elements, vec![seed.clone()])
    }
}

impl UpdateRule {
    pub fn parse(text: &str) -> StoreResult<Self> {
        let (_, (prefixes, template, raw)) =
            rule_text(text).map_err(|e| parse_failure("update rule", text, e))?;
        let resolver = Resolver::new(prefixes);
        let template = template
            .into_iter()
            .map(|t| resolver.triple(t))
            .collect::<StoreResult<Vec<_>>>()?;
        if let Some(bad) = template
            .iter()
            .find(|t| t.path.len() != 1 || t.path[0].closure)
        {
            return Err(StoreError::query(format!(
                "insert template needs a single predicate, got {} steps",
                bad.path.len()
            )));
        }
        Ok(Self {
            template,
            pattern: PatternQuery {
                elements: resolver.group(raw)?,
            },
        })
    }

    /// Instantiate the template for every solution; distinct facts in
    /// first-derivation order, without context.
    pub fn derive(&self, source: &dyn TripleSource) -> StoreResult<Vec<Fact>> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        for solution in self.pattern.solutions(source, &Bindings::new())? {
            for t in &self.template {
                let (Some(subject), Some(object)) =
                    (resolve(&t.subject, &solution), resolve(&t.object, &solution))
                else {
                    continue;
                };
                let fact = Fact::new(subject, t.path[0].predicate.clone(), object);
                if seen.insert(fact.clone()) {
                    out.push(fact);
                }
            }
        }
        Ok(out)
    }
}

// ============================================================================
// Evaluation
// ============================================================================

fn resolve(term: &PatternTerm, bindings: &Bindings) -> Option<Term> {
    match term {
        PatternTerm::Const(t) => Some(t.clone()),
        PatternTerm::Var(name) => bindings.get(name).cloned(),
    }
}

/// Bind `term` to `value`; `false` if it is already bound to something else.
fn bind(bindings: &mut Bindings, term: &PatternTerm, value: &Term) -> bool {
    match term {
        PatternTerm::Const(t) => t == value,
        PatternTerm::Var(name) => match bindings.get(name) {
            Some(existing) => existing == value,
            None => {
                bindings.insert(name.clone(), value.clone());
                true
            }
        },
    }
}

fn eval_group(
    source: &dyn TripleSource,
    elements: &[GroupElement],
    seed: Vec<Bindings>,
) -> StoreResult<Vec<Bindings>> {
    let mut solutions = seed;
    for element in elements {
        if solutions.is_empty() {
            break;
        }
        let mut next = Vec::new();
        match element {
            GroupElement::Triple(pattern) => {
                for b in &solutions {
                    next.extend(eval_triple(source, pattern, b)?);
                }
            }
            GroupElement::Not(inner) => {
                for b in solutions {
                    if eval_group(source, inner, vec![b.clone()])?.is_empty() {
                        next.push(b);
                    }
                }
            }
        }
        solutions = next;
    }
    Ok(solutions)
}

fn eval_triple(
    source: &dyn TripleSource,
    pattern: &TriplePattern,
    bindings: &Bindings,
) -> StoreResult<Vec<Bindings>> {
    let subject = resolve(&pattern.subject, bindings);
    let object = resolve(&pattern.object, bindings);
    let mut out = Vec::new();
    for (s, o) in eval_path(source, subject.as_ref(), &pattern.path, object.as_ref())? {
        let mut extended = bindings.clone();
        if bind(&mut extended, &pattern.subject, &s) && bind(&mut extended, &pattern.object, &o) {
            out.push(extended);
        }
    }
    Ok(out)
}

/// `(start, end)` pairs connected by `steps`, distinct, in discovery order.
fn eval_path(
    source: &dyn TripleSource,
    start: Option<&Term>,
    steps: &[PathStep],
    end: Option<&Term>,
) -> StoreResult<Vec<(Term, Term)>> {
    if let [step] = steps {
        if !step.closure {
            let pattern = FactPattern {
                subject: start.cloned(),
                predicate: Some(step.predicate.clone()),
                object: end.cloned(),
                ..FactPattern::default()
            };
            let mut seen = AHashSet::new();
            return Ok(source
                .match_facts(&pattern)?
                .map(|f| (f.subject, f.object))
                .filter(|pair| seen.insert(pair.clone()))
                .collect());
        }
    }

    // Walk backwards from a bound end when the start is free.
    let backward = start.is_none() && end.is_some();
    let mut frontier: Vec<(Term, Term)> = match (start, end) {
        (Some(s), _) => vec![(s.clone(), s.clone())],
        (None, Some(e)) => vec![(e.clone(), e.clone())],
        (None, None) => seed_nodes(source, &steps[0])?
            .into_iter()
            .map(|n| (n.clone(), n))
            .collect(),
    };

    let ordered: Vec<&PathStep> = if backward {
        steps.iter().rev().collect()
    } else {
        steps.iter().collect()
    };
    for step in ordered {
        frontier = advance(source, frontier, step, !backward)?;
    }

    let mut seen = AHashSet::new();
    Ok(frontier
        .into_iter()
        .map(|(origin, reached)| if backward { (reached, origin) } else { (origin, reached) })
        .filter(|(s, o)| start.map_or(true, |x| x == s) && end.map_or(true, |x| x == o))
        .filter(|pair| seen.insert(pair.clone()))
        .collect())
}

/// Candidate start nodes for a path whose endpoints are both free.
fn seed_nodes(source: &dyn TripleSource, step: &PathStep) -> StoreResult<Vec<Term>> {
    let pattern = FactPattern::any().with_predicate(step.predicate.clone());
    let mut seen = AHashSet::new();
    let mut out = Vec::new();
    for fact in source.match_facts(&pattern)? {
        if seen.insert(fact.subject.clone()) {
            out.push(fact.subject);
        }
        if step.closure && seen.insert(fact.object.clone()) {
            out.push(fact.object);
        }
    }
    Ok(out)
}

fn neighbours(
    source: &dyn TripleSource,
    node: &Term,
    predicate: &Iri,
    forward: bool,
) -> StoreResult<Vec<Term>> {
    let pattern = FactPattern::any().with_predicate(predicate.clone());
    Ok(if forward {
        source
            .match_facts(&pattern.with_subject(node.clone()))?
            .map(|f| f.object)
            .collect()
    } else {
        source
            .match_facts(&pattern.with_object(node.clone()))?
            .map(|f| f.subject)
            .collect()
    })
}

fn advance(
    source: &dyn TripleSource,
    frontier: Vec<(Term, Term)>,
    step: &PathStep,
    forward: bool,
) -> StoreResult<Vec<(Term, Term)>> {
    let mut out = Vec::new();
    let mut seen = AHashSet::new();
    for (origin, node) in frontier {
        if !step.closure {
            for next in neighbours(source, &node, &step.predicate, forward)? {
                if seen.insert((origin.clone(), next.clone())) {
                    out.push((origin.clone(), next));
                }
            }
            continue;
        }

        let mut visited = AHashSet::new();
        let mut queue = VecDeque::from([node]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for next in neighbours(source, &current, &step.predicate, forward)? {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
            if seen.insert((origin.clone(), current.clone())) {
                out.push((origin.clone(), current));
            }
        }
    }
    Ok(out)
}

// ============================================================================
// Engine
// ============================================================================

/// The "evaluate parametric query, get bindings" capability.
pub trait QueryEngine: Send + Sync {
    /// Solutions of `query` over `source` that extend `bindings`.
    fn evaluate(
        &self,
        source: &dyn TripleSource,
        query: &str,
        bindings: &Bindings,
    ) -> StoreResult<BindingsIter>;

    /// Facts an `INSERT ... WHERE ...` rule derives from `source`.
    fn derive(&self, source: &dyn TripleSource, rule: &str) -> StoreResult<Vec<Fact>>;
}

/// [`QueryEngine`] over the pattern language, memoizing parsed text.
#[derive(Default)]
pub struct PatternQueryEngine {
    queries: DashMap<String, Arc<PatternQuery>>,
    rules: DashMap<String, Arc<UpdateRule>>,
}

impl PatternQueryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn query(&self, text: &str) -> StoreResult<Arc<PatternQuery>> {
        if let Some(q) = self.queries.get(text) {
            return Ok(q.clone());
        }
        let parsed = Arc::new(PatternQuery::parse(text)?);
        self.queries.insert(text.to_string(), parsed.clone());
        Ok(parsed)
    }

    fn rule(&self, text: &str) -> StoreResult<Arc<UpdateRule>> {
        if let Some(r) = self.rules.get(text) {
            return Ok(r.clone());
        }
        let parsed = Arc::new(UpdateRule::parse(text)?);
        self.rules.insert(text.to_string(), parsed.clone());
        Ok(parsed)
    }
}

impl QueryEngine for PatternQueryEngine {
    fn evaluate(
        &self,
        source: &dyn TripleSource,
        query: &str,
        bindings: &Bindings,
    ) -> StoreResult<BindingsIter> {
        let solutions = self.query(query)?.solutions(source, bindings)?;
        Ok(Box::new(solutions.into_iter()))
    }

    fn derive(&self, source: &dyn TripleSource, rule: &str) -> StoreResult<Vec<Fact>> {
        self.rule(rule)?.derive(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    const EX: &str = "http://example.org/";

    fn ex(local: &str) -> Term {
        Term::iri(format!("{EX}{local}"))
    }

    fn sample_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_facts([
            Fact::new(ex("alice"), rdf::TYPE, ex("Student")),
            Fact::new(ex("Student"), crate::vocab::rdfs::SUB_CLASS_OF, ex("Person")),
            Fact::new(ex("bob"), rdf::TYPE, ex("Person")),
            Fact::new(ex("alice"), format!("{EX}age").as_str(), Term::Literal(Literal::integer(30))),
            Fact::new(ex("carol"), rdf::TYPE, ex("Robot")),
        ]);
        store
    }

    #[test]
    fn parses_paths_literals_and_not() {
        let q = PatternQuery::parse(
            r#"PREFIX ex: <http://example.org/>
               ?s a/rdfs:subClassOf* ex:Person .
               ?s ex:name "x\"y"@EN .
               NOT { ?s ex:age 42 }"#,
        )
        .expect("parse");
        assert_eq!(q.elements.len(), 3);
        let GroupElement::Triple(first) = &q.elements[0] else {
            panic!("expected triple");
        };
        assert_eq!(first.path.len(), 2);
        assert!(first.path[1].closure);
        let GroupElement::Triple(second) = &q.elements[1] else {
            panic!("expected triple");
        };
        assert_eq!(
            second.object,
            PatternTerm::Const(Term::Literal(Literal::lang("x\"y", "en")))
        );
        assert!(matches!(q.elements[2], GroupElement::Not(_)));
    }

    #[test]
    fn unknown_prefix_is_an_error() {
        let err = PatternQuery::parse("?s nope:p ?o").expect_err("must fail");
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn subclass_closure_selects_instances_backwards() {
        let store = sample_store();
        let snapshot = store.snapshot();
        let engine = PatternQueryEngine::new();
        let found: Vec<Term> = engine
            .evaluate(
                &snapshot,
                "?x rdf:type/rdfs:subClassOf* <http://example.org/Person>",
                &Bindings::new(),
            )
            .expect("evaluate")
            .filter_map(|b| b.get("x").cloned())
            .collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&ex("alice")));
        assert!(found.contains(&ex("bob")));
    }

    #[test]
    fn bound_parameters_restrict_solutions() {
        let store = sample_store();
        let snapshot = store.snapshot();
        let engine = PatternQueryEngine::new();
        let mut bindings = Bindings::new();
        bindings.insert("x".to_string(), ex("carol"));
        let count = engine
            .evaluate(
                &snapshot,
                "?x rdf:type/rdfs:subClassOf* <http://example.org/Person>",
                &bindings,
            )
            .expect("evaluate")
            .count();
        assert_eq!(count, 0);
    }

    #[test]
    fn update_rule_respects_negation() {
        let store = sample_store();
        let engine = PatternQueryEngine::new();
        let rule = "INSERT { ?x <http://example.org/flag> true } \
                    WHERE { ?x a ?c . NOT { ?x <http://example.org/age> ?a } }";
        let derived = engine.derive(&store.snapshot(), rule).expect("derive");
        let subjects: Vec<&Term> = derived.iter().map(|f| &f.subject).collect();
        assert_eq!(subjects, vec![&ex("bob"), &ex("carol")]);
        assert_eq!(derived[0].object, Term::Literal(Literal::boolean(true)));
    }
}
