//! Validation report: the conforms flag plus the set of violation records.

use crate::shape::{ConstraintComponent, Severity};
use crate::vocab::{rdf, sh};
use serde::{Deserialize, Serialize};
use shapegate_store::{Fact, Iri, Literal, Term};
use std::collections::BTreeSet;
use std::fmt;

/// One failure of one constraint for one focus (and value) node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub source_shape: Term,
    pub focus_node: Term,
    pub result_path: Option<Iri>,
    pub value: Option<Term>,
    pub source_constraint_component: ConstraintComponent,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for ViolationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.focus_node)?;
        if let Some(path) = &self.result_path {
            write!(f, " {path}")?;
        }
        if let Some(value) = &self.value {
            write!(f, " = {value}")?;
        }
        write!(
            f,
            ": {} ({} in {})",
            self.message, self.source_constraint_component, self.source_shape
        )
    }
}

/// Outcome of one validation run.
///
/// Records are kept sorted by shape, then focus node, so two runs over the
/// same data render identically whatever the execution order was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    conforms: bool,
    results: Vec<ViolationRecord>,
}

impl ValidationReport {
    /// A conforming report with no records.
    pub fn conforming() -> Self {
        Self {
            conforms: true,
            results: Vec::new(),
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = ViolationRecord>) -> Self {
        let results: Vec<ViolationRecord> = records
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            conforms: results.is_empty(),
            results,
        }
    }

    pub fn conforms(&self) -> bool {
        self.conforms
    }

    pub fn results(&self) -> &[ViolationRecord] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Records raised by one constraint component.
    pub fn by_component(
        &self,
        component: ConstraintComponent,
    ) -> impl Iterator<Item = &ViolationRecord> + '_ {
        self.results
            .iter()
            .filter(move |r| r.source_constraint_component == component)
    }

    /// Render as an `sh:ValidationReport` graph of blank nodes.
    pub fn to_facts(&self) -> Vec<Fact> {
        let report = Term::blank("report");
        let mut facts = vec![
            Fact::new(report.clone(), rdf::TYPE, Term::iri(sh::VALIDATION_REPORT)),
            Fact::new(
                report.clone(),
                sh::CONFORMS,
                Term::Literal(Literal::boolean(self.conforms)),
            ),
        ];
        for (i, record) in self.results.iter().enumerate() {
            let node = Term::blank(format!("result{i}"));
            facts.push(Fact::new(report.clone(), sh::RESULT, node.clone()));
            facts.push(Fact::new(node.clone(), rdf::TYPE, Term::iri(sh::VALIDATION_RESULT)));
            facts.push(Fact::new(node.clone(), sh::FOCUS_NODE, record.focus_node.clone()));
            if let Some(path) = &record.result_path {
                facts.push(Fact::new(node.clone(), sh::RESULT_PATH, path.clone()));
            }
            if let Some(value) = &record.value {
                facts.push(Fact::new(node.clone(), sh::VALUE, value.clone()));
            }
            facts.push(Fact::new(
                node.clone(),
                sh::RESULT_SEVERITY,
                Term::iri(record.severity.iri()),
            ));
            facts.push(Fact::new(node.clone(), sh::SOURCE_SHAPE, record.source_shape.clone()));
            facts.push(Fact::new(
                node.clone(),
                sh::SOURCE_CONSTRAINT_COMPONENT,
                record.source_constraint_component.iri(),
            ));
            facts.push(Fact::new(
                node,
                sh::RESULT_MESSAGE,
                Term::literal(record.message.clone()),
            ));
        }
        facts
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::conforming()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conforms {
            return f.write_str("conforms");
        }
        write!(f, "{} violation(s)", self.results.len())?;
        for record in &self.results {
            write!(f, "\n  - {record}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(focus: &str, component: ConstraintComponent) -> ViolationRecord {
        ViolationRecord {
            source_shape: Term::iri("http://ex/Shape"),
            focus_node: Term::iri(focus),
            result_path: Some(Iri::new("http://ex/age")),
            value: None,
            source_constraint_component: component,
            severity: Severity::Violation,
            message: "expected at most 1 value(s)".to_string(),
        }
    }

    #[test]
    fn duplicates_collapse_and_order_is_stable() {
        let report = ValidationReport::from_records([
            record("http://ex/b", ConstraintComponent::MaxCount),
            record("http://ex/a", ConstraintComponent::MaxCount),
            record("http://ex/b", ConstraintComponent::MaxCount),
        ]);
        assert!(!report.conforms());
        assert_eq!(report.len(), 2);
        assert_eq!(report.results()[0].focus_node, Term::iri("http://ex/a"));
    }

    #[test]
    fn empty_report_conforms() {
        let report = ValidationReport::from_records(Vec::new());
        assert!(report.conforms());
        assert_eq!(report.to_string(), "conforms");
    }

    #[test]
    fn renders_report_graph() {
        let report =
            ValidationReport::from_records([record("http://ex/a", ConstraintComponent::MaxCount)]);
        let facts = report.to_facts();
        assert!(facts.iter().any(|f| f.predicate.as_str() == sh::CONFORMS
            && f.object == Term::Literal(Literal::boolean(false))));
        assert!(facts.iter().any(|f| f.predicate.as_str() == sh::SOURCE_CONSTRAINT_COMPONENT
            && f.object == Term::iri("http://www.w3.org/ns/shacl#MaxCountConstraintComponent")));
        assert_eq!(
            facts.iter().filter(|f| f.predicate.as_str() == sh::RESULT).count(),
            1
        );
    }

    #[test]
    fn json_round_trip() {
        let report =
            ValidationReport::from_records([record("http://ex/a", ConstraintComponent::MinCount)]);
        let json = report.to_json().expect("json");
        let back: ValidationReport = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, report);
    }
}
