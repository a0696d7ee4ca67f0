//! Declarative per-type predicate schemas.
//!
//! A [`PredicateSchema`] describes how one object type is laid out in the graph:
//! its class IRI, how identifiers become IRIs, which named graph it lives in,
//! and the predicate path behind every scalar attribute and link. Schemas are
//! built once with [`SchemaBuilder`] and never mutated afterwards.

use std::collections::BTreeMap;

use crate::graph::query::is_valid_var;

/// An ordered, non-empty sequence of predicate IRIs leading from an object's
/// IRI to a value, possibly through intermediate anonymous nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredicatePath(Vec<String>);

impl PredicatePath {
    pub fn new<I, S>(predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(predicates.into_iter().map(Into::into).collect())
    }

    pub fn predicates(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PredicatePath {
    fn from(predicate: &str) -> Self {
        Self(vec![predicate.to_string()])
    }
}

impl<const N: usize> From<[&str; N]> for PredicatePath {
    fn from(predicates: [&str; N]) -> Self {
        Self::new(predicates)
    }
}

impl From<Vec<String>> for PredicatePath {
    fn from(predicates: Vec<String>) -> Self {
        Self(predicates)
    }
}

/// How many values an attribute may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

/// A scalar attribute: its path and cardinality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    pub path: PredicatePath,
    pub cardinality: Cardinality,
}

/// A single-valued link to another registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub path: PredicatePath,
    /// Type tag of the linked object. May be overridden per instance by the
    /// linked object's stored application class.
    pub target: String,
}

/// Immutable description of one object type's layout in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateSchema {
    class_uri: String,
    base_uri: String,
    graph: Option<String>,
    variables: BTreeMap<String, VariableSpec>,
    links: BTreeMap<String, LinkSpec>,
}

impl PredicateSchema {
    pub fn builder(class_uri: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            schema: PredicateSchema {
                class_uri: class_uri.into(),
                base_uri: String::new(),
                graph: None,
                variables: BTreeMap::new(),
                links: BTreeMap::new(),
            },
            problems: Vec::new(),
        }
    }

    pub fn class_uri(&self) -> &str {
        &self.class_uri
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// The named graph this type is stored in, if it overrides the default.
    pub fn graph(&self) -> Option<&str> {
        self.graph.as_deref()
    }

    /// The same schema, stored in `graph`.
    pub fn in_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    pub fn variables(&self) -> &BTreeMap<String, VariableSpec> {
        &self.variables
    }

    pub fn links(&self) -> &BTreeMap<String, LinkSpec> {
        &self.links
    }

    /// `base_uri + id`.
    pub fn uri_for(&self, id: &str) -> String {
        format!("{}{id}", self.base_uri)
    }

    /// Inverse of [`uri_for`](Self::uri_for): `None` if `uri` is outside the base.
    pub fn id_from_uri<'a>(&self, uri: &'a str) -> Option<&'a str> {
        uri.strip_prefix(&self.base_uri).filter(|id| !id.is_empty())
    }

    /// Every attribute and link name with its path, variables first.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &PredicatePath)> {
        self.variables
            .iter()
            .map(|(name, spec)| (name.as_str(), &spec.path))
            .chain(self.links.iter().map(|(name, spec)| (name.as_str(), &spec.path)))
    }
}

/// Builder for [`PredicateSchema`]. Invalid declarations are collected and
/// reported together by [`build`](SchemaBuilder::build).
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: PredicateSchema,
    problems: Vec<String>,
}

impl SchemaBuilder {
    /// Prefix that turns an identifier into the object's IRI.
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.schema.base_uri = base_uri.into();
        self
    }

    /// Declare a single-valued attribute.
    pub fn pred(self, name: &str, path: impl Into<PredicatePath>) -> Self {
        self.variable(name, path.into(), Cardinality::One)
    }

    /// Declare a multi-valued attribute.
    pub fn pred_set(self, name: &str, path: impl Into<PredicatePath>) -> Self {
        self.variable(name, path.into(), Cardinality::Many)
    }

    /// Declare a link to an object of type `target`.
    pub fn has_one(mut self, name: &str, path: impl Into<PredicatePath>, target: &str) -> Self {
        let path = path.into();
        if self.check(name, &path) {
            self.schema.links.insert(
                name.to_string(),
                LinkSpec {
                    path,
                    target: target.to_string(),
                },
            );
        }
        self
    }

    fn variable(mut self, name: &str, path: PredicatePath, cardinality: Cardinality) -> Self {
        if self.check(name, &path) {
            self.schema
                .variables
                .insert(name.to_string(), VariableSpec { path, cardinality });
        }
        self
    }

    fn check(&mut self, name: &str, path: &PredicatePath) -> bool {
        let before = self.problems.len();
        if !is_valid_var(name) {
            self.problems.push(format!("attribute name {name:?} is not alphanumeric"));
        }
        if self.schema.variables.contains_key(name) || self.schema.links.contains_key(name) {
            self.problems.push(format!("attribute {name:?} declared twice"));
        }
        if path.is_empty() {
            self.problems.push(format!("attribute {name:?} has an empty predicate path"));
        }
        self.problems.len() == before
    }

    /// Finish the schema, or describe every invalid declaration.
    pub fn build(self) -> Result<PredicateSchema, String> {
        if self.schema.class_uri.is_empty() {
            return Err("class URI must not be empty".into());
        }
        if self.problems.is_empty() {
            Ok(self.schema)
        } else {
            Err(self.problems.join("; "))
        }
    }
}
