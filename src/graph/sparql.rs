//! Persistent SPARQL RDF store backed by oxigraph.
//!
//! Provides durable storage of triples in named graphs and evaluates the
//! queries built by [`SelectQuery`]. Writes go through SPARQL updates, each of
//! which oxigraph applies in a single transaction.

use std::collections::HashMap;

use oxigraph::model::Term as OxTerm;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::{StoreError, StoreResult};

use super::query::{SelectQuery, render_iri, render_triples, render_var};
use super::{Bindings, GraphStore, Literal, Term, Triple, TripleSet};

/// Persistent SPARQL-capable RDF store.
pub struct SparqlStore {
    store: Store,
}

impl SparqlStore {
    /// Create a new in-memory SPARQL store (no persistence).
    pub fn in_memory() -> StoreResult<Self> {
        let store = Store::new().map_err(|e| StoreError::Open {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Open or create a persistent SPARQL store at the given path.
    pub fn open(path: &std::path::Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| StoreError::Open {
            message: format!("failed to create oxigraph directory: {e}"),
        })?;
        let store = Store::open(path).map_err(|e| StoreError::Open {
            message: format!("failed to open oxigraph store at {}: {e}", path.display()),
        })?;
        tracing::debug!(path = %path.display(), "opened oxigraph store");
        Ok(Self { store })
    }

    /// Number of triples stored in `graph`.
    pub fn len(&self, graph: &str) -> StoreResult<usize> {
        let sparql = format!(
            "SELECT (COUNT(*) AS ?count) WHERE {{ GRAPH {} {{ ?s ?p ?o }} }}",
            render_iri(graph)?
        );
        let rows = self.select_raw(&sparql, graph)?;
        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(|term| term.lexical().parse().ok())
            .unwrap_or(0);
        Ok(count)
    }

    /// Whether `graph` holds no triples.
    pub fn is_empty(&self, graph: &str) -> StoreResult<bool> {
        self.len(graph).map(|n| n == 0)
    }

    /// Get internal store reference (for advanced oxigraph operations).
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn select_raw(&self, sparql: &str, graph: &str) -> StoreResult<Vec<Bindings>> {
        let results = self.store.query(sparql).map_err(|e| StoreError::Query {
            graph: graph.to_string(),
            message: e.to_string(),
        })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| StoreError::Query {
                        graph: graph.to_string(),
                        message: format!("solution error: {e}"),
                    })?;
                    let mut row = Bindings::new();
                    for (var, term) in solution.iter() {
                        if let Some(term) = convert_term(term) {
                            row.insert(var.as_str().to_string(), term);
                        }
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            QueryResults::Boolean(_) => Err(StoreError::UnexpectedResult {
                message: "ASK queries are not supported via query".into(),
            }),
            QueryResults::Graph(_) => Err(StoreError::UnexpectedResult {
                message: "CONSTRUCT/DESCRIBE queries are not supported via query".into(),
            }),
        }
    }
}

fn convert_term(term: &OxTerm) -> Option<Term> {
    match term {
        OxTerm::NamedNode(node) => Some(Term::Iri(node.as_str().to_string())),
        OxTerm::BlankNode(node) => Some(Term::Blank(node.as_str().to_string())),
        OxTerm::Literal(literal) => Some(Term::Literal(Literal::typed(
            literal.value(),
            literal.datatype().as_str(),
        ))),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Edges leading from a named subject down to `node`, outermost first.
fn chain_to<'a>(node: &'a Term, incoming: &HashMap<&str, &'a Triple>) -> Vec<&'a Triple> {
    let mut edges: Vec<&'a Triple> = Vec::new();
    let mut node = node;
    while let Term::Blank(label) = node {
        match incoming.get(label.as_str()) {
            Some(&edge) if !edges.contains(&edge) => {
                edges.push(edge);
                node = &edge.subject;
            }
            _ => break,
        }
    }
    edges.reverse();
    edges
}

/// Shape-matched deletes for triples touching blank nodes, which cannot be
/// named across requests.
///
/// Every value under a blank node gets its own `DELETE/WHERE` walking from the
/// named subject, so a value missing from the store does not keep its siblings
/// alive. Edges into blank nodes follow, deepest first, and only go once the
/// node has no outgoing triples left.
fn blank_deletes(graph_iri: &str, blank: &[&Triple]) -> StoreResult<Vec<String>> {
    let mut incoming: HashMap<&str, &Triple> = HashMap::new();
    for triple in blank {
        if let Term::Blank(label) = &triple.object {
            incoming.entry(label.as_str()).or_insert(*triple);
        }
    }

    let mut operations = Vec::new();
    for value in blank.iter().copied().filter(|t| !t.object.is_blank()) {
        let mut pattern = chain_to(&value.subject, &incoming);
        pattern.push(value);
        operations.push(format!(
            "WITH {graph_iri}\nDELETE {{\n{}}}\nWHERE {{\n{}}}",
            render_triples([value], true)?,
            render_triples(pattern, true)?
        ));
    }

    let mut edges: Vec<(Vec<&Triple>, &Triple)> = blank
        .iter()
        .copied()
        .filter(|t| t.object.is_blank())
        .map(|edge| (chain_to(&edge.subject, &incoming), edge))
        .collect();
    edges.sort_by_key(|(chain, _)| std::cmp::Reverse(chain.len()));
    for (mut pattern, edge) in edges {
        let node = render_var(&format!("blank_{}", edge.object.lexical()))?;
        pattern.push(edge);
        operations.push(format!(
            "WITH {graph_iri}\nDELETE {{\n{}}}\nWHERE {{\n{}    FILTER NOT EXISTS {{ {node} ?any_p ?any_o }}\n}}",
            render_triples([edge], true)?,
            render_triples(pattern, true)?
        ));
    }
    Ok(operations)
}

impl GraphStore for SparqlStore {
    fn query(&self, query: &SelectQuery, graph: &str) -> StoreResult<Vec<Bindings>> {
        let sparql = query.to_sparql(graph)?;
        tracing::debug!(graph, %sparql, "evaluating select");
        self.select_raw(&sparql, graph)
    }

    fn insert(&self, triples: &TripleSet, graph: &str) -> StoreResult<()> {
        if triples.is_empty() {
            return Ok(());
        }
        let sparql = format!(
            "INSERT DATA {{\n  GRAPH {} {{\n{}  }}\n}}",
            render_iri(graph)?,
            render_triples(triples.iter(), false)?
        );
        tracing::debug!(graph, triples = triples.len(), "inserting triples");
        self.update(&sparql)
    }

    fn delete(&self, triples: &TripleSet, graph: &str) -> StoreResult<()> {
        let (ground, blank) = triples.partition_ground();
        let graph_iri = render_iri(graph)?;
        let mut operations = Vec::new();
        if !ground.is_empty() {
            operations.push(format!(
                "DELETE DATA {{\n  GRAPH {graph_iri} {{\n{}  }}\n}}",
                render_triples(ground, false)?
            ));
        }
        operations.extend(blank_deletes(&graph_iri, &blank)?);
        if operations.is_empty() {
            return Ok(());
        }
        tracing::debug!(graph, triples = triples.len(), "deleting triples");
        self.update(&operations.join(" ;\n"))
    }

    fn update(&self, sparql: &str) -> StoreResult<()> {
        self.store.update(sparql).map_err(|e| StoreError::Update {
            message: e.to_string(),
        })
    }
}

impl std::fmt::Debug for SparqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparqlStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::query::{Slot, TriplePattern};
    use crate::graph::Triple;

    const G: &str = "http://example.org/graph";
    const OTHER: &str = "http://example.org/other";
    const P: &str = "http://example.org/p";
    const Q: &str = "http://example.org/q";

    fn iri(s: &str) -> Term {
        Term::iri(format!("http://example.org/{s}"))
    }

    fn all_query() -> SelectQuery {
        SelectQuery::new()
            .select("s")
            .select("o")
            .require(TriplePattern::new(Slot::var("s"), vec![P.into()], Slot::var("o")))
    }

    #[test]
    fn insert_and_query_scoped_to_graph() {
        let store = SparqlStore::in_memory().unwrap();
        let mut set = TripleSet::new();
        set.push(Triple::new(iri("a"), P, Term::Literal(Literal::plain("x"))));
        store.insert(&set, G).unwrap();

        let rows = store.query(&all_query(), G).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["o"], Term::Literal(Literal::plain("x")));

        assert!(store.query(&all_query(), OTHER).unwrap().is_empty());
        assert_eq!(store.len(G).unwrap(), 1);
        assert!(store.is_empty(OTHER).unwrap());
    }

    #[test]
    fn typed_literals_round_trip() {
        let store = SparqlStore::in_memory().unwrap();
        let mut set = TripleSet::new();
        set.push(Triple::new(
            iri("a"),
            P,
            Term::Literal(Literal::typed("42", crate::graph::XSD_INTEGER)),
        ));
        store.insert(&set, G).unwrap();
        let rows = store.query(&all_query(), G).unwrap();
        assert_eq!(
            rows[0]["o"],
            Term::Literal(Literal::typed("42", crate::graph::XSD_INTEGER))
        );
    }

    #[test]
    fn delete_matches_blank_chains_by_shape() {
        let store = SparqlStore::in_memory().unwrap();
        let mut set = TripleSet::new();
        set.push(Triple::new(iri("a"), P, Term::Blank("n0".into())));
        set.push(Triple::new(
            Term::Blank("n0".into()),
            Q,
            Term::Literal(Literal::plain("deep")),
        ));
        set.push(Triple::new(iri("a"), Q, Term::Literal(Literal::plain("flat"))));
        store.insert(&set, G).unwrap();
        assert_eq!(store.len(G).unwrap(), 3);

        // Labels differ from the stored nodes; the shape is what matters.
        let mut again = TripleSet::new();
        again.push(Triple::new(iri("a"), P, Term::Blank("n7".into())));
        again.push(Triple::new(
            Term::Blank("n7".into()),
            Q,
            Term::Literal(Literal::plain("deep")),
        ));
        again.push(Triple::new(iri("a"), Q, Term::Literal(Literal::plain("flat"))));
        store.delete(&again, G).unwrap();
        assert!(store.is_empty(G).unwrap());
    }

    fn chain(leaves: &[(&str, &str)]) -> TripleSet {
        let mut set = TripleSet::new();
        set.push(Triple::new(iri("a"), P, Term::Blank("n0".into())));
        for (predicate, value) in leaves {
            set.push(Triple::new(
                Term::Blank("n0".into()),
                format!("http://example.org/{predicate}"),
                Term::Literal(Literal::plain(*value)),
            ));
        }
        set
    }

    #[test]
    fn delete_removes_stored_chain_when_other_values_are_absent() {
        let store = SparqlStore::in_memory().unwrap();
        store.insert(&chain(&[("name", "A")]), G).unwrap();
        assert_eq!(store.len(G).unwrap(), 2);

        store.delete(&chain(&[("name", "A"), ("mail", "x@y")]), G).unwrap();
        assert!(store.is_empty(G).unwrap());
    }

    #[test]
    fn delete_keeps_intermediate_node_with_foreign_values() {
        let store = SparqlStore::in_memory().unwrap();
        store.insert(&chain(&[("name", "A"), ("mail", "x@y")]), G).unwrap();

        store.delete(&chain(&[("name", "A")]), G).unwrap();
        // The intermediate node still carries mail, so its edge stays.
        assert_eq!(store.len(G).unwrap(), 2);
    }

    #[test]
    fn delete_walks_nested_chains_deepest_first() {
        let store = SparqlStore::in_memory().unwrap();
        let mut set = TripleSet::new();
        set.push(Triple::new(iri("a"), P, Term::Blank("n0".into())));
        set.push(Triple::new(Term::Blank("n0".into()), Q, Term::Blank("n1".into())));
        set.push(Triple::new(
            Term::Blank("n1".into()),
            P,
            Term::Literal(Literal::plain("deep")),
        ));
        set.push(Triple::new(
            Term::Blank("n0".into()),
            P,
            Term::Literal(Literal::plain("mid")),
        ));
        store.insert(&set, G).unwrap();

        set.push(Triple::new(
            Term::Blank("n1".into()),
            Q,
            Term::Literal(Literal::plain("never stored")),
        ));
        store.delete(&set, G).unwrap();
        assert!(store.is_empty(G).unwrap());
    }

    #[test]
    fn delete_of_absent_triples_is_silent() {
        let store = SparqlStore::in_memory().unwrap();
        let mut set = TripleSet::new();
        set.push(Triple::new(iri("a"), P, iri("b")));
        store.delete(&set, G).unwrap();
        store.delete(&TripleSet::new(), G).unwrap();
    }

    #[test]
    fn ask_is_rejected_by_select_path() {
        let store = SparqlStore::in_memory().unwrap();
        let err = store.select_raw("ASK { ?s ?p ?o }", G).unwrap_err();
        assert!(matches!(err, StoreError::UnexpectedResult { .. }));
    }
}
