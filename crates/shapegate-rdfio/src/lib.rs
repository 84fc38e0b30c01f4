//! RDF text I/O for Shapegate (boundary adapter).
//!
//! Schemas and data reach the validation core as facts only. This crate turns
//! RDF text into [`Fact`]s and back, so hosts and tests can write shapes in
//! Turtle instead of building facts by hand.
//!
//! Parsing uses **Sophia**:
//! - N-Triples (`.nt`)
//! - Turtle (`.ttl`)
//! - N-Quads (`.nq`)
//! - TriG (`.trig`)
//! - RDF/XML (`.rdf`, `.owl`, `.xml`)

use anyhow::{anyhow, Result};
use shapegate_store::vocab::xsd;
use shapegate_store::{Fact, Iri, Literal, Term};
use sophia::api::prelude::*;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
    NQuads,
    TriG,
    RdfXml,
}

impl RdfFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "nt" => Some(RdfFormat::NTriples),
            "ttl" => Some(RdfFormat::Turtle),
            "nq" => Some(RdfFormat::NQuads),
            "trig" => Some(RdfFormat::TriG),
            "rdf" | "owl" | "xml" => Some(RdfFormat::RdfXml),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct FactSinkError {
    message: String,
}

impl From<anyhow::Error> for FactSinkError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

// ============================================================================
// Term decoding (from Sophia's N-Triples display form)
// ============================================================================

fn unescape_rdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_term_display(term: &str) -> Result<Term> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Term::iri(rest));
    }

    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(Term::blank(rest));
    }

    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if ch == '"' && !escaped {
                end_quote = Some(i);
                break;
            }
            escaped = ch == '\\' && !escaped;
        }
        let Some(end) = end_quote else {
            return Err(anyhow!("invalid literal term (missing closing quote): {s}"));
        };

        let lexical = unescape_rdf_string(&s[1..end]);
        let rest = s[end + 1..].trim();

        if let Some(lang) = rest.strip_prefix('@') {
            return Ok(Term::Literal(Literal::lang(lexical, lang)));
        }
        if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            let dt = dt
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(dt);
            if dt.is_empty() || dt == xsd::STRING {
                return Ok(Term::Literal(Literal::simple(lexical)));
            }
            return Ok(Term::Literal(Literal::typed(lexical, Iri::new(dt))));
        }
        return Ok(Term::Literal(Literal::simple(lexical)));
    }

    Err(anyhow!("unsupported RDF term form: {s}"))
}

fn parse_predicate_display(term: &str) -> Result<Iri> {
    match parse_term_display(term)? {
        Term::Iri(iri) => Ok(iri),
        other => Err(anyhow!("predicate must be an IRI, got {other}")),
    }
}

fn parse_node_display(term: &str) -> Result<Term> {
    match parse_term_display(term)? {
        lit @ Term::Literal(_) => Err(anyhow!("expected IRI/blank node, got literal: {lit}")),
        node => Ok(node),
    }
}

fn fact_from_display(
    s: &str,
    p: &str,
    o: &str,
    context: Option<Term>,
) -> std::result::Result<Fact, FactSinkError> {
    Ok(Fact {
        subject: parse_node_display(s)?,
        predicate: parse_predicate_display(p)?,
        object: parse_term_display(o)?,
        context,
    })
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse RDF text into facts.
///
/// Triples land in `context` (use `None` for the default context); quads
/// keep their own graph name and fall back to `context` in the default graph.
pub fn parse_facts(bytes: &[u8], format: RdfFormat, context: Option<Term>) -> Result<Vec<Fact>> {
    let cursor = std::io::Cursor::new(bytes);
    let reader = std::io::BufReader::new(cursor);
    let mut out: Vec<Fact> = Vec::new();

    match format {
        RdfFormat::NTriples => {
            let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), FactSinkError> {
                    out.push(fact_from_display(
                        &t.s().to_string(),
                        &t.p().to_string(),
                        &t.o().to_string(),
                        context.clone(),
                    )?);
                    Ok(())
                })
                .map_err(|e| anyhow!("failed to parse N-Triples: {e}"))?;
        }
        RdfFormat::Turtle => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), FactSinkError> {
                    out.push(fact_from_display(
                        &t.s().to_string(),
                        &t.p().to_string(),
                        &t.o().to_string(),
                        context.clone(),
                    )?);
                    Ok(())
                })
                .map_err(|e| anyhow!("failed to parse Turtle: {e}"))?;
        }
        RdfFormat::NQuads => {
            let mut parser = sophia::turtle::parser::nq::parse_bufread(reader);
            parser
                .try_for_each_quad(|q| -> std::result::Result<(), FactSinkError> {
                    let graph = match q.g() {
                        Some(g) => Some(parse_node_display(&g.to_string())?),
                        None => context.clone(),
                    };
                    out.push(fact_from_display(
                        &q.s().to_string(),
                        &q.p().to_string(),
                        &q.o().to_string(),
                        graph,
                    )?);
                    Ok(())
                })
                .map_err(|e| anyhow!("failed to parse N-Quads: {e}"))?;
        }
        RdfFormat::TriG => {
            let mut parser = sophia::turtle::parser::trig::parse_bufread(reader);
            parser
                .try_for_each_quad(|q| -> std::result::Result<(), FactSinkError> {
                    let graph = match q.g() {
                        Some(g) => Some(parse_node_display(&g.to_string())?),
                        None => context.clone(),
                    };
                    out.push(fact_from_display(
                        &q.s().to_string(),
                        &q.p().to_string(),
                        &q.o().to_string(),
                        graph,
                    )?);
                    Ok(())
                })
                .map_err(|e| anyhow!("failed to parse TriG: {e}"))?;
        }
        RdfFormat::RdfXml => {
            let mut parser = sophia::xml::parser::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), FactSinkError> {
                    out.push(fact_from_display(
                        &t.s().to_string(),
                        &t.p().to_string(),
                        &t.o().to_string(),
                        context.clone(),
                    )?);
                    Ok(())
                })
                .map_err(|e| anyhow!("failed to parse RDF/XML: {e}"))?;
        }
    }

    Ok(out)
}

/// Parse Turtle text into facts placed in `context`.
pub fn parse_turtle(text: &str, context: Option<Term>) -> Result<Vec<Fact>> {
    parse_facts(text.as_bytes(), RdfFormat::Turtle, context)
}

/// Parse an RDF file, picking the format from its extension.
pub fn parse_file(path: &Path, context: Option<Term>) -> Result<Vec<Fact>> {
    let format = RdfFormat::from_path(path)
        .ok_or_else(|| anyhow!("unsupported RDF file extension: {}", path.display()))?;
    let bytes = std::fs::read(path)?;
    parse_facts(&bytes, format, context)
}

// ============================================================================
// Writing
// ============================================================================

/// One fact per line; N-Quads lines for facts with a context.
pub fn write_nquads(facts: &[Fact]) -> String {
    let mut out = String::new();
    for fact in facts {
        out.push_str(&fact.to_string());
        out.push('\n');
    }
    out
}

/// N-Triples, dropping contexts.
pub fn write_ntriples(facts: &[Fact]) -> String {
    let stripped: Vec<Fact> = facts
        .iter()
        .map(|f| f.clone().with_context(None))
        .collect();
    write_nquads(&stripped)
}
