use proptest::prelude::*;
use shapegate_shacl::vocab::{rdf, rdfs, sh};
use shapegate_shacl::{
    build_schema, validate, ConstraintComponent, ShaclConfig, ShaclError, ShaclStore,
    ShapesGraph, ValidationPlan, ValidationReport, SHAPES_GRAPH,
};
use shapegate_store::{
    DataView, Fact, Iri, IsolationLevel, Literal, MemoryStore, PatternQueryEngine, Term,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const EX: &str = "http://example.org/";

fn ex(local: &str) -> Term {
    Term::iri(format!("{EX}{local}"))
}

fn ex_iri(local: &str) -> Iri {
    Iri::new(format!("{EX}{local}"))
}

fn int(value: i64) -> Term {
    Term::Literal(Literal::integer(value))
}

fn yes() -> Term {
    Term::Literal(Literal::boolean(true))
}

/// `ex:S` targets `ex:focus` along `ex:p` with the given parameters.
fn property_shape(params: Vec<(&str, Term)>) -> Vec<Fact> {
    let mut facts = vec![
        Fact::new(ex("S"), sh::TARGET_NODE, ex("focus")),
        Fact::new(ex("S"), sh::PATH, ex("p")),
    ];
    facts.extend(params.into_iter().map(|(p, o)| Fact::new(ex("S"), p, o)));
    facts
}

fn rdf_list(prefix: &str, items: Vec<Term>) -> (Term, Vec<Fact>) {
    let mut facts = Vec::new();
    let mut head = Term::iri(rdf::NIL);
    for (i, item) in items.into_iter().enumerate().rev() {
        let node = Term::blank(format!("{prefix}{i}"));
        facts.push(Fact::new(node.clone(), rdf::FIRST, item));
        facts.push(Fact::new(node.clone(), rdf::REST, head));
        head = node;
    }
    (head, facts)
}

fn validate_facts(shapes: Vec<Fact>, data: Vec<Fact>, config: &ShaclConfig) -> ValidationReport {
    let engine = PatternQueryEngine::new();
    let mut graph = ShapesGraph::new();
    let schema = build_schema(&mut graph, shapes, &engine, config.max_inference_iterations)
        .expect("schema");
    let plan = ValidationPlan::build(&schema, config.wildcard_undefined_targets);
    let store = MemoryStore::new();
    store.insert_facts(data);
    let view = DataView::of(Arc::new(store.snapshot()));
    validate(&plan, &view, &engine, config, false).expect("validate")
}

fn values_on_focus(values: impl IntoIterator<Item = Term>) -> Vec<Fact> {
    values
        .into_iter()
        .map(|v| Fact::new(ex("focus"), ex_iri("p"), v))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn cardinality_reports_each_breached_bound_once(n in 0usize..6, min in 0usize..4, max in 0usize..4) {
        let shapes = property_shape(vec![
            (sh::MIN_COUNT, int(min as i64)),
            (sh::MAX_COUNT, int(max as i64)),
        ]);
        let data = values_on_focus((0..n).map(|i| int(i as i64)));
        let report = validate_facts(shapes, data, &ShaclConfig::default());

        prop_assert_eq!(report.by_component(ConstraintComponent::MinCount).count(), usize::from(n < min));
        prop_assert_eq!(report.by_component(ConstraintComponent::MaxCount).count(), usize::from(n > max));
        prop_assert_eq!(report.conforms(), n >= min && n <= max);
    }

    #[test]
    fn in_accepts_exactly_the_listed_members(
        allowed in prop::collection::btree_set(0i64..6, 0..5),
        value in 0i64..6,
    ) {
        let (list, list_facts) = rdf_list("in", allowed.iter().map(|v| int(*v)).collect());
        let mut shapes = property_shape(vec![(sh::IN, list)]);
        shapes.extend(list_facts);
        let report = validate_facts(shapes, values_on_focus([int(value)]), &ShaclConfig::default());

        prop_assert_eq!(
            report.by_component(ConstraintComponent::In).count(),
            usize::from(!allowed.contains(&value))
        );
    }

    #[test]
    fn unique_lang_flags_every_shared_tag(
        tags in prop::collection::vec(prop::sample::select(vec!["en", "fr", "de"]), 0..6),
    ) {
        let shapes = property_shape(vec![(sh::UNIQUE_LANG, yes())]);
        let data = values_on_focus(
            tags.iter()
                .enumerate()
                .map(|(i, tag)| Term::Literal(Literal::lang(format!("v{i}"), *tag))),
        );
        let report = validate_facts(shapes, data, &ShaclConfig::default());

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for tag in &tags {
            *counts.entry(*tag).or_default() += 1;
        }
        let shared = counts.values().filter(|n| **n > 1).count();
        prop_assert_eq!(report.by_component(ConstraintComponent::UniqueLang).count(), shared);
    }

    #[test]
    fn deactivated_shapes_never_report(n in 0usize..5) {
        let shapes = property_shape(vec![
            (sh::MIN_COUNT, int(10)),
            (sh::MAX_COUNT, int(0)),
            (sh::DEACTIVATED, yes()),
        ]);
        let report = validate_facts(shapes, values_on_focus((0..n).map(|i| int(i as i64))), &ShaclConfig::default());
        prop_assert!(report.conforms());
    }

    #[test]
    fn wildcard_targets_every_subject(has_p in prop::collection::vec(any::<bool>(), 1..6), wildcard in any::<bool>()) {
        let shapes = vec![
            Fact::new(ex("S"), rdf::TYPE, Term::iri(sh::PROPERTY_SHAPE)),
            Fact::new(ex("S"), sh::PATH, ex("p")),
            Fact::new(ex("S"), sh::MIN_COUNT, int(1)),
        ];
        let mut data = Vec::new();
        for (i, has) in has_p.iter().enumerate() {
            let subject = ex(&format!("n{i}"));
            data.push(Fact::new(subject.clone(), ex_iri("q"), Term::literal("x")));
            if *has {
                data.push(Fact::new(subject, ex_iri("p"), Term::literal("y")));
            }
        }
        let config = ShaclConfig { wildcard_undefined_targets: wildcard, ..Default::default() };
        let report = validate_facts(shapes, data, &config);

        let missing = has_p.iter().filter(|h| !**h).count();
        let expected = if wildcard { missing } else { 0 };
        prop_assert_eq!(report.len(), expected);
    }

    #[test]
    fn inference_is_idempotent(
        decls in prop::collection::vec((0u8..4, any::<bool>(), any::<bool>(), any::<bool>()), 0..8),
    ) {
        let mut facts = Vec::new();
        for (i, is_class, node_shape, with_or) in decls {
            let s = ex(&format!("C{i}"));
            if is_class {
                facts.push(Fact::new(s.clone(), rdf::TYPE, Term::iri(rdfs::CLASS)));
            }
            if node_shape {
                facts.push(Fact::new(s.clone(), rdf::TYPE, Term::iri(sh::NODE_SHAPE)));
            } else {
                facts.push(Fact::new(s.clone(), rdf::TYPE, Term::iri(sh::PROPERTY_SHAPE)));
            }
            if with_or {
                let (list, list_facts) = rdf_list(&format!("or{i}_"), vec![Term::blank(format!("m{i}"))]);
                facts.push(Fact::new(s.clone(), sh::PATH, ex("p")));
                facts.push(Fact::new(s, sh::OR, list));
                facts.extend(list_facts);
            }
        }

        let engine = PatternQueryEngine::new();
        let mut graph = ShapesGraph::new();
        graph.load(facts).expect("load");
        graph.infer(&engine, 64).expect("infer");
        let stable: BTreeSet<Fact> = graph.facts().expect("facts").into_iter().collect();
        prop_assert_eq!(graph.infer(&engine, 64).expect("re-infer"), 0);
        let again: BTreeSet<Fact> = graph.facts().expect("facts").into_iter().collect();
        prop_assert_eq!(stable, again);
    }

    #[test]
    fn commit_succeeds_iff_report_conforms(
        values in prop::collection::vec(0i64..4, 0..4),
        max in 0usize..3,
    ) {
        let shapes = property_shape(vec![(sh::MAX_COUNT, int(max as i64))]);
        let data = values_on_focus(values.iter().map(|v| int(*v)));
        let expected = validate_facts(shapes.clone(), data.clone(), &ShaclConfig::default());

        let store = ShaclStore::new(MemoryStore::new());
        let mut conn = store.connection().expect("connection");
        conn.begin(IsolationLevel::default()).expect("begin");
        for fact in shapes {
            conn.add(fact.with_context(Some(Term::iri(SHAPES_GRAPH)))).expect("stage shape");
        }
        conn.commit().expect("schema commit");

        conn.begin(IsolationLevel::default()).expect("begin");
        for fact in data {
            conn.add(fact).expect("stage data");
        }
        let result = conn.commit();
        prop_assert_eq!(result.is_ok(), expected.conforms());
        match result {
            Ok(()) => {
                let distinct: BTreeSet<i64> = values.into_iter().collect();
                prop_assert_eq!(store.base().len(), distinct.len());
            }
            Err(ShaclError::ValidationFailed(report)) => {
                prop_assert_eq!(*report, expected);
                prop_assert!(store.base().is_empty());
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}
