//! Path serialization: turning an object's attributes into triples.
//!
//! A path of length one becomes a single triple on the object's IRI. Longer
//! paths walk through anonymous intermediate nodes. Nodes are memoized per
//! path prefix, so paths that share a prefix share the intermediate node.
//! Absent values write nothing, not even intermediate nodes.

use std::collections::HashMap;

use crate::graph::{APPLICATION_CLASS, Literal, RDF_TYPE, Term, Triple, TripleSet};
use crate::object::GraphObject;
use crate::schema::PredicateSchema;

/// Accumulates triples for one object, materializing intermediate nodes.
struct PathWriter {
    subject: Term,
    nodes: HashMap<Vec<String>, Term>,
    next_blank: usize,
    triples: TripleSet,
}

impl PathWriter {
    fn new(subject: Term) -> Self {
        Self {
            subject,
            nodes: HashMap::new(),
            next_blank: 0,
            triples: TripleSet::new(),
        }
    }

    /// The node reached by following `prefix` from the subject, creating
    /// missing intermediate nodes on the way.
    fn node_for(&mut self, prefix: &[String]) -> Term {
        let Some((last, parent_prefix)) = prefix.split_last() else {
            return self.subject.clone();
        };
        if let Some(node) = self.nodes.get(prefix) {
            return node.clone();
        }
        let parent = self.node_for(parent_prefix);
        let node = Term::Blank(format!("n{}", self.next_blank));
        self.next_blank += 1;
        self.triples
            .push(Triple::new(parent, last.clone(), node.clone()));
        self.nodes.insert(prefix.to_vec(), node.clone());
        node
    }

    /// Attach `objects` at the end of `path`.
    fn write(&mut self, path: &[String], objects: Vec<Term>) {
        let Some((last, parent_prefix)) = path.split_last() else {
            return;
        };
        if objects.is_empty() {
            return;
        }
        let parent = self.node_for(parent_prefix);
        for object in objects {
            self.triples
                .push(Triple::new(parent.clone(), last.clone(), object));
        }
    }
}

/// Build the full triple set `object` produces when saved at `uri`.
pub fn object_triples(object: &dyn GraphObject, schema: &PredicateSchema, uri: &str) -> TripleSet {
    let subject = Term::iri(uri);
    let mut writer = PathWriter::new(subject.clone());

    for (name, spec) in schema.variables() {
        let terms = object.values(name).iter().map(|v| v.to_term()).collect();
        writer.write(spec.path.predicates(), terms);
    }
    for (name, spec) in schema.links() {
        if let Some(link) = object.link(name) {
            writer.write(spec.path.predicates(), vec![Term::iri(link.uri())]);
        }
    }

    let mut triples = writer.triples;
    triples.push(Triple::new(
        subject.clone(),
        RDF_TYPE,
        Term::iri(schema.class_uri()),
    ));
    triples.push(Triple::new(
        subject,
        APPLICATION_CLASS,
        Term::Literal(Literal::plain(object.type_tag())),
    ));
    triples
}
