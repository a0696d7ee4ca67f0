//! Structured SELECT queries.
//!
//! Queries are assembled from triple patterns instead of concatenated strings.
//! Optional data is expressed as one `OPTIONAL` left-join per pattern group, so
//! a subject that lacks some predicates still produces a row with those
//! variables unbound.

use std::fmt::Write as _;

use crate::error::{StoreError, StoreResult};

use super::{Term, Triple};

/// Either a query variable or a fixed term in a pattern position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Var(String),
    Term(Term),
}

impl Slot {
    pub fn var(name: impl Into<String>) -> Self {
        Slot::Var(name.into())
    }

    pub fn iri(iri: impl Into<String>) -> Self {
        Slot::Term(Term::Iri(iri.into()))
    }
}

impl From<Term> for Slot {
    fn from(term: Term) -> Self {
        Slot::Term(term)
    }
}

/// `subject path object`, where `path` is a sequence of one or more predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Slot,
    pub path: Vec<String>,
    pub object: Slot,
}

impl TriplePattern {
    pub fn new(subject: Slot, path: Vec<String>, object: Slot) -> Self {
        Self {
            subject,
            path,
            object,
        }
    }
}

/// A SELECT query over a single named graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    distinct: bool,
    projection: Vec<String>,
    values: Vec<(String, Vec<Term>)>,
    required: Vec<TriplePattern>,
    optional: Vec<Vec<TriplePattern>>,
    limit: Option<usize>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `SELECT DISTINCT`.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a projected variable.
    pub fn select(mut self, var: impl Into<String>) -> Self {
        self.projection.push(var.into());
        self
    }

    /// Pin `var` to one of `terms` via an inline `VALUES` block.
    pub fn pin(mut self, var: impl Into<String>, terms: Vec<Term>) -> Self {
        self.values.push((var.into(), terms));
        self
    }

    /// Add a pattern every result row must satisfy.
    pub fn require(mut self, pattern: TriplePattern) -> Self {
        self.required.push(pattern);
        self
    }

    /// Add a pattern group joined as `OPTIONAL { ... }`.
    pub fn optional(mut self, group: Vec<TriplePattern>) -> Self {
        self.optional.push(group);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render to SPARQL with `graph` as the default graph (`FROM <graph>`).
    pub fn to_sparql(&self, graph: &str) -> StoreResult<String> {
        let mut out = String::from("SELECT ");
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        if self.projection.is_empty() {
            out.push('*');
        } else {
            let vars = self
                .projection
                .iter()
                .map(|v| render_var(v))
                .collect::<StoreResult<Vec<_>>>()?;
            out.push_str(&vars.join(" "));
        }
        let _ = write!(out, "\nFROM {}\nWHERE {{\n", render_iri(graph)?);

        for (var, terms) in &self.values {
            let rendered = terms
                .iter()
                .map(render_term)
                .collect::<StoreResult<Vec<_>>>()?;
            let _ = writeln!(out, "  VALUES {} {{ {} }}", render_var(var)?, rendered.join(" "));
        }
        for pattern in &self.required {
            let _ = writeln!(out, "  {} .", render_pattern(pattern)?);
        }
        for group in &self.optional {
            let body = group
                .iter()
                .map(render_pattern)
                .collect::<StoreResult<Vec<_>>>()?;
            let _ = writeln!(out, "  OPTIONAL {{ {} . }}", body.join(" . "));
        }
        out.push('}');
        if let Some(limit) = self.limit {
            let _ = write!(out, "\nLIMIT {limit}");
        }
        Ok(out)
    }
}

fn render_pattern(pattern: &TriplePattern) -> StoreResult<String> {
    if pattern.path.is_empty() {
        return Err(StoreError::InvalidTerm {
            message: "empty predicate path in pattern".into(),
        });
    }
    let path = pattern
        .path
        .iter()
        .map(|p| render_iri(p))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(format!(
        "{} {} {}",
        render_slot(&pattern.subject)?,
        path.join("/"),
        render_slot(&pattern.object)?
    ))
}

fn render_slot(slot: &Slot) -> StoreResult<String> {
    match slot {
        Slot::Var(v) => render_var(v),
        Slot::Term(t) => render_term(t),
    }
}

pub(crate) fn render_var(name: &str) -> StoreResult<String> {
    if is_valid_var(name) {
        Ok(format!("?{name}"))
    } else {
        Err(StoreError::InvalidTerm {
            message: format!("invalid variable name {name:?}"),
        })
    }
}

/// Whether `name` can be used as a SPARQL variable name.
pub fn is_valid_var(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `iri` can be written as `<iri>` without escaping.
pub fn is_valid_iri(iri: &str) -> bool {
    !iri.is_empty()
        && !iri
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "<>\"{}|^`\\".contains(c))
}

pub(crate) fn render_iri(iri: &str) -> StoreResult<String> {
    if !is_valid_iri(iri) {
        return Err(StoreError::InvalidTerm {
            message: format!("invalid IRI {iri:?}"),
        });
    }
    Ok(format!("<{iri}>"))
}

fn render_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a term in SPARQL syntax. Blank nodes keep their label.
pub(crate) fn render_term(term: &Term) -> StoreResult<String> {
    match term {
        Term::Iri(iri) => render_iri(iri),
        Term::Blank(label) => {
            if is_valid_var(label) {
                Ok(format!("_:{label}"))
            } else {
                Err(StoreError::InvalidTerm {
                    message: format!("invalid blank node label {label:?}"),
                })
            }
        }
        Term::Literal(l) => match &l.datatype {
            Some(dt) => Ok(format!("{}^^{}", render_literal(&l.value), render_iri(dt)?)),
            None => Ok(render_literal(&l.value)),
        },
    }
}

/// Render triples as a `s p o .` block. With `blank_as_var`, blank nodes
/// become variables so the block can be used as a match pattern.
pub(crate) fn render_triples<'a>(
    triples: impl IntoIterator<Item = &'a Triple>,
    blank_as_var: bool,
) -> StoreResult<String> {
    let term = |t: &Term| match t {
        Term::Blank(label) if blank_as_var => render_var(&format!("blank_{label}")),
        other => render_term(other),
    };
    let mut out = String::new();
    for t in triples {
        let _ = writeln!(
            out,
            "    {} {} {} .",
            term(&t.subject)?,
            render_iri(&t.predicate)?,
            term(&t.object)?
        );
    }
    Ok(out)
}
