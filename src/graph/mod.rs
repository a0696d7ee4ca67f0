//! Graph data model and the store contract.
//!
//! Triples are `(subject, predicate, object)` facts grouped into named graphs.
//! Subjects are IRIs or blank nodes, predicates are always IRIs, and objects may
//! additionally be literals.
//!
//! - **Data model** ([`Term`], [`Literal`], [`Triple`], [`TripleSet`])
//! - **Store contract** ([`GraphStore`]): scoped reads, atomic inserts, best-effort deletes
//! - **Query builder** ([`query`]): structured SELECT queries rendered to SPARQL
//! - **oxigraph binding** ([`sparql::SparqlStore`])

pub mod query;
pub mod sparql;

use std::collections::HashMap;
use std::fmt;

use crate::error::StoreResult;

use self::query::SelectQuery;

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Marker predicate naming the registered type an object was saved as.
pub const APPLICATION_CLASS: &str = "http://active-sparql.semte.ch/v0.1/applicationClass";

/// `xsd:string`, the datatype of plain literals.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// `xsd:integer`.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// `xsd:boolean`.
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// A literal value with an optional datatype IRI (`None` means `xsd:string`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub value: String,
    pub datatype: Option<String>,
}

impl Literal {
    /// A plain string literal.
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
        }
    }

    /// A literal with an explicit datatype. `xsd:string` is normalised to `None`.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Self {
            value: value.into(),
            datatype: (datatype != XSD_STRING).then_some(datatype),
        }
    }
}

/// A node or value in a triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// A named node.
    Iri(String),
    /// An anonymous node. The label is only meaningful within one triple set
    /// or one result set.
    Blank(String),
    /// A literal value.
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    /// The lexical form: the IRI, the blank label, or the literal value.
    pub fn lexical(&self) -> &str {
        match self {
            Term::Iri(s) | Term::Blank(s) => s,
            Term::Literal(l) => &l.value,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Blank(label) => write!(f, "_:{label}"),
            Term::Literal(l) => match &l.datatype {
                Some(dt) => write!(f, "{:?}^^<{dt}>", l.value),
                None => write!(f, "{:?}", l.value),
            },
        }
    }
}

/// A single `(subject, predicate, object)` fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    /// IRI or blank node.
    pub subject: Term,
    /// Predicate IRI.
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }

    /// Whether either end of this triple is a blank node.
    pub fn touches_blank(&self) -> bool {
        self.subject.is_blank() || self.object.is_blank()
    }
}

/// An ordered set of triples written or deleted as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripleSet {
    triples: Vec<Triple>,
}

impl TripleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a triple unless an identical one is already present.
    pub fn push(&mut self, triple: Triple) {
        if !self.triples.contains(&triple) {
            self.triples.push(triple);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Distinct blank nodes mentioned anywhere in the set.
    pub fn blank_nodes(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .triples
            .iter()
            .flat_map(|t| [&t.subject, &t.object])
            .filter_map(|term| match term {
                Term::Blank(label) => Some(label.as_str()),
                _ => None,
            })
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Split into triples that only mention named nodes and literals, and
    /// triples that touch at least one blank node.
    pub fn partition_ground(&self) -> (Vec<&Triple>, Vec<&Triple>) {
        self.triples.iter().partition(|t| !t.touches_blank())
    }
}

impl IntoIterator for TripleSet {
    type Item = Triple;
    type IntoIter = std::vec::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

/// One result row: variable name → bound term. Unbound variables are absent.
pub type Bindings = HashMap<String, Term>;

/// The triple store this crate persists into.
///
/// Every read and write is scoped to one named graph. Implementations must make
/// [`insert`](GraphStore::insert) atomic with respect to readers.
pub trait GraphStore: Send + Sync {
    /// Evaluate a SELECT query against `graph`.
    fn query(&self, query: &SelectQuery, graph: &str) -> StoreResult<Vec<Bindings>>;

    /// Atomically add all triples to `graph`.
    fn insert(&self, triples: &TripleSet, graph: &str) -> StoreResult<()>;

    /// Remove the triples from `graph`. Absent triples are ignored.
    fn delete(&self, triples: &TripleSet, graph: &str) -> StoreResult<()>;

    /// Run a raw SPARQL update statement.
    fn update(&self, sparql: &str) -> StoreResult<()>;
}
