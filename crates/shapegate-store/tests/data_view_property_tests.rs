use proptest::prelude::*;
use shapegate_store::{
    ChangeSet, ContextPattern, DataView, Fact, FactPattern, MemoryStore, Term, TripleSource,
};
use std::collections::BTreeSet;
use std::sync::Arc;

const EX: &str = "http://example.org/";

fn node(i: u8) -> Term {
    Term::iri(format!("{EX}n{i}"))
}

fn fact_from((s, p, o, g): (u8, u8, u8, Option<u8>)) -> Fact {
    Fact::new(node(s), format!("{EX}p{p}").as_str(), node(o)).with_context(g.map(node))
}

fn arb_fact() -> impl Strategy<Value = Fact> {
    (0u8..4, 0u8..3, 0u8..4, proptest::option::of(0u8..2)).prop_map(fact_from)
}

fn collect(source: &dyn TripleSource, pattern: &FactPattern) -> BTreeSet<Fact> {
    source
        .match_facts(pattern)
        .expect("match")
        .collect::<BTreeSet<_>>()
}

proptest! {
    #[test]
    fn data_view_is_base_union_added_minus_removed(
        base in proptest::collection::vec(arb_fact(), 0..24),
        ops in proptest::collection::vec((any::<bool>(), arb_fact()), 0..24),
    ) {
        let store = MemoryStore::new();
        store.insert_facts(base.clone());

        let mut changes = ChangeSet::new();
        let mut expected: BTreeSet<Fact> = base.into_iter().collect();
        for (is_add, fact) in ops {
            if is_add {
                changes.add(fact.clone());
                expected.insert(fact);
            } else {
                changes.remove(fact.clone());
                expected.remove(&fact);
            }
        }

        let view = DataView::new(Arc::new(store.snapshot()), &changes).expect("view");
        let all = view.match_facts(&FactPattern::any()).expect("match").collect::<Vec<_>>();
        // no duplicates
        prop_assert_eq!(all.len(), all.iter().collect::<BTreeSet<_>>().len());
        prop_assert_eq!(all.into_iter().collect::<BTreeSet<_>>(), expected.clone());
        prop_assert_eq!(view.size().expect("size"), expected.len());

        for fact in &expected {
            prop_assert!(view.contains(fact).expect("contains"));
        }

        // Pattern matches agree with filtering the expected set.
        let pattern = FactPattern::any()
            .with_subject(node(1))
            .in_context(ContextPattern::Default);
        let filtered: BTreeSet<Fact> = expected.iter().filter(|f| pattern.matches(f)).cloned().collect();
        prop_assert_eq!(collect(&view, &pattern), filtered);

        // The base store never sees staged changes.
        prop_assert!(store.commit_log().len() <= 1);
    }

    #[test]
    fn staging_is_idempotent(fact in arb_fact(), repeats in 1usize..5) {
        let mut once = ChangeSet::new();
        once.add(fact.clone());
        let mut many = ChangeSet::new();
        for _ in 0..repeats {
            many.add(fact.clone());
        }
        prop_assert_eq!(once, many);
    }
}

#[test]
fn quoted_facts_round_trip_through_the_store() {
    let store = MemoryStore::new();
    let inner = Fact::new(node(0), format!("{EX}knows").as_str(), node(1));
    let about = Fact::new(inner.quoted(), format!("{EX}certainty").as_str(), Term::literal("high"));
    store.insert_facts([inner.clone(), about.clone()]);

    let snapshot = store.snapshot();
    let found = collect(&snapshot, &FactPattern::any().with_subject(inner.quoted()));
    assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![about]);
}

#[test]
fn overlay_of_redundant_changes_has_none() {
    let store = MemoryStore::new();
    store.insert_facts([fact_from((0, 0, 1, None))]);
    let base: Arc<dyn TripleSource> = Arc::new(store.snapshot());
    assert!(!DataView::of(base.clone()).has_changes());

    let mut changes = ChangeSet::new();
    changes.add(fact_from((0, 0, 1, None)));
    changes.remove(fact_from((2, 0, 1, None)));
    assert!(!DataView::new(base.clone(), &changes).expect("view").has_changes());

    changes.add(fact_from((1, 0, 1, None)));
    let view = DataView::new(base, &changes).expect("view");
    assert!(view.has_changes());
    assert_eq!(view.added().len(), 1);
}
