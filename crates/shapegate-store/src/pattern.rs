use crate::term::{Fact, Iri, Term};

/// Which contexts a pattern reaches into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ContextPattern {
    /// Every context, including the default one.
    #[default]
    Any,
    /// Only facts without a named context.
    Default,
    /// Only facts in the given context.
    Named(Term),
}

impl ContextPattern {
    pub fn matches(&self, context: Option<&Term>) -> bool {
        match self {
            ContextPattern::Any => true,
            ContextPattern::Default => context.is_none(),
            ContextPattern::Named(named) => context == Some(named),
        }
    }
}

/// A subject/predicate/object/context pattern; `None` positions are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FactPattern {
    pub subject: Option<Term>,
    pub predicate: Option<Iri>,
    pub object: Option<Term>,
    pub context: ContextPattern,
}

impl FactPattern {
    pub fn any() -> Self {
        Self::default()
    }

    /// Pattern matching exactly one fact (including its context).
    pub fn exact(fact: &Fact) -> Self {
        Self {
            subject: Some(fact.subject.clone()),
            predicate: Some(fact.predicate.clone()),
            object: Some(fact.object.clone()),
            context: match &fact.context {
                Some(ctx) => ContextPattern::Named(ctx.clone()),
                None => ContextPattern::Default,
            },
        }
    }

    pub fn with_subject(mut self, subject: Term) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<Iri>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_object(mut self, object: Term) -> Self {
        self.object = Some(object);
        self
    }

    pub fn in_context(mut self, context: ContextPattern) -> Self {
        self.context = context;
        self
    }

    pub fn matches(&self, fact: &Fact) -> bool {
        self.subject.as_ref().map_or(true, |s| *s == fact.subject)
            && self.predicate.as_ref().map_or(true, |p| *p == fact.predicate)
            && self.object.as_ref().map_or(true, |o| *o == fact.object)
            && self.context.matches(fact.context.as_ref())
    }
}
