//! Object-to-graph mapper.
//!
//! The [`Mapper`] saves, destroys and loads [`GraphObject`]s against a
//! [`GraphStore`], driven entirely by the registered [`PredicateSchema`]s:
//!
//! - **save**: assign an identifier if needed, serialize, insert atomically
//! - **destroy**: rebuild the same triple set and remove it
//! - **find**: one targeted query with an `OPTIONAL` join per declared path,
//!   rows merged into one record, links resolved recursively
//! - **all**: every subject typed with the class IRI, each loaded via `find`

pub mod error;
pub mod serialize;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::graph::query::{SelectQuery, Slot, TriplePattern, is_valid_iri};
use crate::graph::{APPLICATION_CLASS, Bindings, GraphStore, RDF_TYPE, Term};
use crate::object::{GraphObject, Link, Model, Value};
use crate::registry::TypeRegistry;
use crate::schema::{Cardinality, LinkSpec, PredicateSchema};

use self::error::{MapperError, MapperResult};

/// Query variable bound to the object's IRI.
pub const SUBJECT_VAR: &str = "subject";
/// Query variable bound to the stored application class.
pub const CLASS_VAR: &str = "application_class";

/// Length of generated identifiers. 22 alphanumeric characters carry about
/// 131 bits of randomness.
const IDENTIFIER_LEN: usize = 22;

/// Query variable for a declared attribute or link.
fn attribute_var(name: &str) -> String {
    format!("v_{name}")
}

/// A fresh random URL-safe identifier.
pub fn generate_identifier() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(IDENTIFIER_LEN)
        .map(char::from)
        .collect()
}

/// Configuration for the [`Mapper`].
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Graph used by types whose schema does not name one.
    pub default_graph: String,
    /// How many link hops `find` resolves. Deeper links stay bare IRIs.
    pub max_link_depth: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            default_graph: "http://mu.semte.ch/application".into(),
            max_link_depth: 4,
        }
    }
}

/// Result rows of a find query merged into one record.
#[derive(Debug, Default)]
struct MergedRecord {
    found: bool,
    class: Option<String>,
    values: BTreeMap<String, Vec<Value>>,
    links: BTreeMap<String, String>,
}

impl MergedRecord {
    /// Merge rows: single-valued attributes keep the first bound value and are
    /// never overwritten, multi-valued attributes collect every distinct value.
    fn merge(schema: &PredicateSchema, rows: &[Bindings]) -> Self {
        let mut record = MergedRecord::default();
        for row in rows {
            record.found |= row.contains_key(SUBJECT_VAR);
            if record.class.is_none() {
                record.class = row.get(CLASS_VAR).map(|t| t.lexical().to_string());
            }
            for (name, spec) in schema.variables() {
                let Some(value) = row.get(&attribute_var(name)).and_then(Value::from_term) else {
                    continue;
                };
                let slot = record.values.entry(name.clone()).or_default();
                match spec.cardinality {
                    Cardinality::One if slot.is_empty() => slot.push(value),
                    Cardinality::Many if !slot.contains(&value) => slot.push(value),
                    _ => {}
                }
            }
            for name in schema.links().keys() {
                if record.links.contains_key(name) {
                    continue;
                }
                if let Some(Term::Iri(uri)) = row.get(&attribute_var(name)) {
                    record.links.insert(name.clone(), uri.clone());
                }
            }
        }
        record
    }
}

/// Generic save/load engine over a [`GraphStore`] and a [`TypeRegistry`].
#[derive(Clone)]
pub struct Mapper {
    store: Arc<dyn GraphStore>,
    registry: Arc<TypeRegistry>,
    config: MapperConfig,
}

impl Mapper {
    pub fn new(store: Arc<dyn GraphStore>, registry: Arc<TypeRegistry>, config: MapperConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Named graph holding objects of `schema`'s type.
    pub fn graph_for<'a>(&'a self, schema: &'a PredicateSchema) -> &'a str {
        schema.graph().unwrap_or(&self.config.default_graph)
    }

    /// The IRI of a saved or loaded object.
    pub fn uri_of(&self, object: &dyn GraphObject) -> MapperResult<String> {
        let schema = self.registry.schema(object.type_tag())?;
        let id = object.id().ok_or_else(|| MapperError::MissingIdentifier {
            type_tag: object.type_tag().to_string(),
        })?;
        Ok(schema.uri_for(id))
    }

    /// A resolved link pointing at `object`.
    pub fn link_to(&self, object: &dyn GraphObject) -> MapperResult<Link> {
        Ok(Link::Object {
            uri: self.uri_of(object)?,
            object: object.clone_object(),
        })
    }

    /// Persist `object`, assigning a fresh identifier if it has none and was
    /// never persisted. Returns the identifier.
    pub fn save(&self, object: &mut dyn GraphObject) -> MapperResult<String> {
        let schema = self.registry.schema(object.type_tag())?;
        if object.id().is_none() && !object.is_persisted() {
            object.identity_mut().set_id(generate_identifier());
        }
        let id = object
            .id()
            .ok_or_else(|| MapperError::MissingIdentifier {
                type_tag: object.type_tag().to_string(),
            })?
            .to_string();
        let uri = schema.uri_for(&id);
        let graph = self.graph_for(schema);
        let triples = serialize::object_triples(&*object, schema, &uri);

        self.store.insert(&triples, graph)?;
        object.identity_mut().mark_persisted();
        tracing::info!(type_tag = object.type_tag(), %uri, graph, triples = triples.len(), "saved object");
        Ok(id)
    }

    /// Remove the triples `object` would produce on save. Triples that are
    /// already absent are ignored.
    pub fn destroy(&self, object: &dyn GraphObject) -> MapperResult<()> {
        let schema = self.registry.schema(object.type_tag())?;
        let uri = self.uri_of(object)?;
        let graph = self.graph_for(schema);
        let triples = serialize::object_triples(object, schema, &uri);
        self.store.delete(&triples, graph)?;
        tracing::info!(type_tag = object.type_tag(), %uri, graph, "destroyed object");
        Ok(())
    }

    /// Load the `T` with identifier `id`.
    pub fn find<T: Model>(&self, id: &str) -> MapperResult<T> {
        downcast(self.find_dyn(T::TYPE_TAG, id)?)
    }

    /// Load the object of type `type_tag` with identifier `id`. The returned
    /// object's concrete type follows the stored application class when that
    /// names another registered type.
    pub fn find_dyn(&self, type_tag: &str, id: &str) -> MapperResult<Box<dyn GraphObject>> {
        self.load(type_tag, id, 0)
    }

    /// Load every `T` in its graph. Subjects whose stored application class
    /// names another registered type are skipped; use
    /// [`all_dyn`](Self::all_dyn) to get them too.
    pub fn all<T: Model>(&self) -> MapperResult<Vec<T>> {
        let mut objects = Vec::new();
        for object in self.all_dyn(T::TYPE_TAG)? {
            match downcast::<T>(object) {
                Ok(object) => objects.push(object),
                Err(MapperError::TypeMismatch { found, .. }) => {
                    tracing::debug!(type_tag = T::TYPE_TAG, %found, "skipping object stored as another type");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(objects)
    }

    /// Load every object typed with `type_tag`'s class IRI, each through
    /// [`find_dyn`](Self::find_dyn).
    pub fn all_dyn(&self, type_tag: &str) -> MapperResult<Vec<Box<dyn GraphObject>>> {
        let schema = self.registry.schema(type_tag)?;
        let rows = self.store.query(&Self::all_query(schema), self.graph_for(schema))?;

        let uris: BTreeSet<&str> = rows
            .iter()
            .filter_map(|row| row.get(SUBJECT_VAR).and_then(Term::as_iri))
            .collect();

        let mut objects = Vec::with_capacity(uris.len());
        for uri in uris {
            match schema.id_from_uri(uri) {
                Some(id) => objects.push(self.load(type_tag, id, 0)?),
                None => tracing::warn!(type_tag, uri, "subject outside the type's base URI, skipping"),
            }
        }
        Ok(objects)
    }

    /// Distinct subjects typed with the schema's class IRI.
    pub fn all_query(schema: &PredicateSchema) -> SelectQuery {
        SelectQuery::new().distinct().select(SUBJECT_VAR).require(TriplePattern::new(
            Slot::var(SUBJECT_VAR),
            vec![RDF_TYPE.into()],
            Slot::iri(schema.class_uri()),
        ))
    }

    /// Targeted read for one IRI: the type check is required, every declared
    /// path and the application class are optional.
    pub fn find_query(schema: &PredicateSchema, uri: &str) -> SelectQuery {
        let mut query = Self::all_query(schema)
            .select(CLASS_VAR)
            .pin(SUBJECT_VAR, vec![Term::iri(uri)]);
        for (name, path) in schema.paths() {
            let var = attribute_var(name);
            query = query.select(var.clone()).optional(vec![TriplePattern::new(
                Slot::var(SUBJECT_VAR),
                path.predicates().to_vec(),
                Slot::var(var),
            )]);
        }
        query.optional(vec![TriplePattern::new(
            Slot::var(SUBJECT_VAR),
            vec![APPLICATION_CLASS.into()],
            Slot::var(CLASS_VAR),
        )])
    }

    fn load(&self, type_tag: &str, id: &str, depth: usize) -> MapperResult<Box<dyn GraphObject>> {
        let registration = self.registry.get(type_tag)?;
        let schema = registration.schema();
        let not_found = || MapperError::NotFound {
            type_tag: type_tag.to_string(),
            id: id.to_string(),
        };
        let uri = schema.uri_for(id);
        // No stored object can carry an IRI that cannot be written.
        if !is_valid_iri(&uri) {
            return Err(not_found());
        }
        let rows = self
            .store
            .query(&Self::find_query(schema, &uri), self.graph_for(schema))?;
        let mut record = MergedRecord::merge(schema, &rows);
        if !record.found {
            return Err(not_found());
        }

        let mut object = match record.class.as_deref() {
            Some(class) if class != type_tag && self.registry.contains(class) => {
                tracing::debug!(type_tag, class, %uri, "dispatching on stored application class");
                self.registry.get(class)?.instantiate()
            }
            Some(class) if class != type_tag => {
                tracing::warn!(type_tag, class, %uri, "stored application class is not registered");
                registration.instantiate()
            }
            _ => registration.instantiate(),
        };
        object.identity_mut().set_id(id);
        object.identity_mut().mark_persisted();

        for name in schema.variables().keys() {
            if let Some(values) = record.values.remove(name) {
                object.set_values(name, values);
            }
        }
        for (name, spec) in schema.links() {
            if let Some(target) = record.links.remove(name) {
                let link = self.resolve_link(spec, target, depth)?;
                object.set_link(name, link);
            }
        }
        Ok(object)
    }

    fn resolve_link(&self, spec: &LinkSpec, uri: String, depth: usize) -> MapperResult<Link> {
        let target = self.registry.schema(&spec.target)?;
        if depth >= self.config.max_link_depth {
            return Ok(Link::Uri(uri));
        }
        let Some(id) = target.id_from_uri(&uri) else {
            tracing::warn!(link_target = %spec.target, %uri, "link target outside the type's base URI");
            return Ok(Link::Uri(uri));
        };
        match self.load(&spec.target, id, depth + 1) {
            Ok(object) => Ok(Link::Object { uri, object }),
            Err(MapperError::NotFound { .. }) => {
                tracing::warn!(link_target = %spec.target, %uri, "dangling link");
                Ok(Link::Uri(uri))
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("types", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}

fn downcast<T: Model>(object: Box<dyn GraphObject>) -> MapperResult<T> {
    let found = object.type_tag().to_string();
    object
        .into_any()
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| MapperError::TypeMismatch {
            expected: T::TYPE_TAG.to_string(),
            found,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::sparql::SparqlStore;
    use crate::object::{Identity, first_lexical, iri, text};

    const EX: &str = "http://example.org/";

    #[derive(Debug, Clone, Default)]
    struct Shelf {
        identity: Identity,
        label: Option<String>,
    }

    impl GraphObject for Shelf {
        fn type_tag(&self) -> &str {
            Self::TYPE_TAG
        }
        fn identity(&self) -> &Identity {
            &self.identity
        }
        fn identity_mut(&mut self) -> &mut Identity {
            &mut self.identity
        }
        fn values(&self, name: &str) -> Vec<Value> {
            match name {
                "label" => text(self.label.as_deref()),
                _ => Vec::new(),
            }
        }
        fn set_values(&mut self, name: &str, values: Vec<Value>) {
            if name == "label" {
                self.label = first_lexical(values);
            }
        }
        fn link(&self, _name: &str) -> Option<&Link> {
            None
        }
        fn set_link(&mut self, _name: &str, _link: Link) {}
    }

    impl Model for Shelf {
        const TYPE_TAG: &'static str = "shelf";
        fn schema() -> Result<PredicateSchema, String> {
            PredicateSchema::builder("http://example.org/Shelf")
                .base_uri("http://example.org/shelves/")
                .pred("label", "http://www.w3.org/2000/01/rdf-schema#label")
                .build()
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Book {
        identity: Identity,
        title: Option<String>,
        pages: Option<i64>,
        author_name: Option<String>,
        homepage: Option<String>,
        tags: Vec<String>,
        shelf: Option<Link>,
    }

    impl GraphObject for Book {
        fn type_tag(&self) -> &str {
            Self::TYPE_TAG
        }
        fn identity(&self) -> &Identity {
            &self.identity
        }
        fn identity_mut(&mut self) -> &mut Identity {
            &mut self.identity
        }
        fn values(&self, name: &str) -> Vec<Value> {
            match name {
                "title" => text(self.title.as_deref()),
                "pages" => self.pages.map(Value::Integer).into_iter().collect(),
                "author_name" => text(self.author_name.as_deref()),
                "homepage" => iri(self.homepage.as_deref()),
                "tags" => self.tags.iter().cloned().map(Value::Text).collect(),
                _ => Vec::new(),
            }
        }
        fn set_values(&mut self, name: &str, values: Vec<Value>) {
            match name {
                "title" => self.title = first_lexical(values),
                "pages" => {
                    self.pages = values.into_iter().find_map(|v| match v {
                        Value::Integer(n) => Some(n),
                        _ => None,
                    })
                }
                "author_name" => self.author_name = first_lexical(values),
                "homepage" => self.homepage = first_lexical(values),
                "tags" => self.tags = values.into_iter().map(|v| v.lexical()).collect(),
                _ => {}
            }
        }
        fn link(&self, name: &str) -> Option<&Link> {
            match name {
                "shelf" => self.shelf.as_ref(),
                _ => None,
            }
        }
        fn set_link(&mut self, name: &str, link: Link) {
            if name == "shelf" {
                self.shelf = Some(link);
            }
        }
    }

    impl Model for Book {
        const TYPE_TAG: &'static str = "book";
        fn schema() -> Result<PredicateSchema, String> {
            PredicateSchema::builder("http://example.org/Book")
                .base_uri("http://example.org/books/")
                .pred("title", "http://purl.org/dc/terms/title")
                .pred("pages", "http://example.org/pages")
                .pred(
                    "author_name",
                    ["http://example.org/author", "http://xmlns.com/foaf/0.1/name"],
                )
                .pred(
                    "homepage",
                    ["http://example.org/author", "http://xmlns.com/foaf/0.1/homepage"],
                )
                .pred_set("tags", "http://example.org/tag")
                .has_one("shelf", "http://example.org/shelf", "shelf")
                .build()
        }
    }

    /// Shares `Book`'s class and base IRI under its own type tag.
    #[derive(Debug, Clone, Default)]
    struct Novel {
        identity: Identity,
        title: Option<String>,
    }

    impl GraphObject for Novel {
        fn type_tag(&self) -> &str {
            Self::TYPE_TAG
        }
        fn identity(&self) -> &Identity {
            &self.identity
        }
        fn identity_mut(&mut self) -> &mut Identity {
            &mut self.identity
        }
        fn values(&self, name: &str) -> Vec<Value> {
            match name {
                "title" => text(self.title.as_deref()),
                _ => Vec::new(),
            }
        }
        fn set_values(&mut self, name: &str, values: Vec<Value>) {
            if name == "title" {
                self.title = first_lexical(values);
            }
        }
        fn link(&self, _name: &str) -> Option<&Link> {
            None
        }
        fn set_link(&mut self, _name: &str, _link: Link) {}
    }

    impl Model for Novel {
        const TYPE_TAG: &'static str = "novel";
        fn schema() -> Result<PredicateSchema, String> {
            Book::schema()
        }
    }

    fn mapper() -> Mapper {
        let registry = TypeRegistry::new()
            .with::<Book>()
            .unwrap()
            .with::<Shelf>()
            .unwrap();
        Mapper::new(
            Arc::new(SparqlStore::in_memory().unwrap()),
            Arc::new(registry),
            MapperConfig::default(),
        )
    }

    #[test]
    fn save_assigns_identifier_and_marks_persisted() {
        let mapper = mapper();
        let mut book = Book {
            title: Some("Dune".into()),
            ..Default::default()
        };
        let id = mapper.save(&mut book).unwrap();
        assert_eq!(id.len(), IDENTIFIER_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(book.id(), Some(id.as_str()));
        assert!(book.is_persisted());

        // A second save keeps the identifier.
        assert_eq!(mapper.save(&mut book).unwrap(), id);
    }

    #[test]
    fn round_trip_with_multi_hop_paths_and_links() {
        let mapper = mapper();
        let mut shelf = Shelf {
            label: Some("Sci-fi".into()),
            ..Default::default()
        };
        mapper.save(&mut shelf).unwrap();

        let mut book = Book {
            title: Some("Dune".into()),
            pages: Some(412),
            author_name: Some("Frank Herbert".into()),
            homepage: Some("http://example.org/herbert".into()),
            tags: vec!["classic".into(), "desert".into()],
            shelf: Some(mapper.link_to(&shelf).unwrap()),
            ..Default::default()
        };
        let id = mapper.save(&mut book).unwrap();

        let loaded: Book = mapper.find(&id).unwrap();
        assert!(loaded.is_persisted());
        assert_eq!(loaded.title.as_deref(), Some("Dune"));
        assert_eq!(loaded.pages, Some(412));
        assert_eq!(loaded.author_name.as_deref(), Some("Frank Herbert"));
        assert_eq!(loaded.homepage.as_deref(), Some("http://example.org/herbert"));
        let mut tags = loaded.tags.clone();
        tags.sort();
        assert_eq!(tags, vec!["classic", "desert"]);

        let link = loaded.shelf.as_ref().unwrap();
        assert_eq!(link.uri(), format!("{EX}shelves/{}", shelf.id().unwrap()));
        let linked: &Shelf = link.downcast_ref().unwrap();
        assert_eq!(linked.label.as_deref(), Some("Sci-fi"));
    }

    #[test]
    fn partial_objects_still_load() {
        let mapper = mapper();
        let mut book = Book {
            author_name: Some("Anonymous".into()),
            ..Default::default()
        };
        let id = mapper.save(&mut book).unwrap();

        let loaded: Book = mapper.find(&id).unwrap();
        assert_eq!(loaded.title, None);
        assert_eq!(loaded.author_name.as_deref(), Some("Anonymous"));
        assert!(loaded.shelf.is_none());

        let all: Vec<Book> = mapper.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id(), Some(id.as_str()));
    }

    #[test]
    fn missing_object_is_not_found() {
        let mapper = mapper();
        let err = mapper.find::<Book>("nope").unwrap_err();
        assert!(matches!(err, MapperError::NotFound { .. }));
    }

    #[test]
    fn destroy_removes_every_triple() {
        let store = Arc::new(SparqlStore::in_memory().unwrap());
        let registry = TypeRegistry::new().with::<Book>().unwrap().with::<Shelf>().unwrap();
        let mapper = Mapper::new(store.clone(), Arc::new(registry), MapperConfig::default());
        let graph = MapperConfig::default().default_graph;

        let mut book = Book {
            title: Some("Dune".into()),
            author_name: Some("Frank Herbert".into()),
            tags: vec!["classic".into()],
            ..Default::default()
        };
        let id = mapper.save(&mut book).unwrap();
        assert!(!store.is_empty(&graph).unwrap());

        mapper.destroy(&book).unwrap();
        assert!(store.is_empty(&graph).unwrap());
        assert!(matches!(
            mapper.find::<Book>(&id),
            Err(MapperError::NotFound { .. })
        ));
        // Destroying again is silent.
        mapper.destroy(&book).unwrap();
    }

    #[test]
    fn destroy_clears_chains_whose_stored_state_differs() {
        let store = Arc::new(SparqlStore::in_memory().unwrap());
        let registry = TypeRegistry::new().with::<Book>().unwrap().with::<Shelf>().unwrap();
        let mapper = Mapper::new(store.clone(), Arc::new(registry), MapperConfig::default());
        let graph = MapperConfig::default().default_graph;

        let mut book = Book {
            author_name: Some("A".into()),
            ..Default::default()
        };
        mapper.save(&mut book).unwrap();

        // homepage shares the author node but was never stored.
        book.homepage = Some("http://example.org/a".into());
        mapper.destroy(&book).unwrap();
        assert!(store.is_empty(&graph).unwrap());
    }

    #[test]
    fn find_dispatches_on_stored_application_class() {
        let registry = TypeRegistry::new()
            .with::<Book>()
            .unwrap()
            .with::<Shelf>()
            .unwrap()
            .with::<Novel>()
            .unwrap();
        let mapper = Mapper::new(
            Arc::new(SparqlStore::in_memory().unwrap()),
            Arc::new(registry),
            MapperConfig::default(),
        );
        let mut novel = Novel {
            title: Some("Dune".into()),
            ..Default::default()
        };
        let id = mapper.save(&mut novel).unwrap();

        let loaded = mapper.find_dyn(Book::TYPE_TAG, &id).unwrap();
        assert_eq!(loaded.type_tag(), Novel::TYPE_TAG);
        let loaded: Novel = downcast(loaded).unwrap();
        assert_eq!(loaded.title.as_deref(), Some("Dune"));
        assert!(loaded.is_persisted());

        assert!(matches!(
            mapper.find::<Book>(&id),
            Err(MapperError::TypeMismatch { ref found, .. }) if found == "novel"
        ));

        // Listing skips the novel instead of failing on it.
        assert!(mapper.all::<Book>().unwrap().is_empty());
        assert_eq!(mapper.all_dyn(Book::TYPE_TAG).unwrap().len(), 1);
    }

    #[test]
    fn unregistered_application_class_falls_back_to_requested_type() {
        let store: Arc<SparqlStore> = Arc::new(SparqlStore::in_memory().unwrap());
        let writer = Mapper::new(
            store.clone(),
            Arc::new(TypeRegistry::new().with::<Novel>().unwrap()),
            MapperConfig::default(),
        );
        let mut novel = Novel {
            title: Some("Dune".into()),
            ..Default::default()
        };
        let id = writer.save(&mut novel).unwrap();

        let reader = Mapper::new(
            store,
            Arc::new(TypeRegistry::new().with::<Book>().unwrap().with::<Shelf>().unwrap()),
            MapperConfig::default(),
        );
        let book: Book = reader.find(&id).unwrap();
        assert_eq!(book.title.as_deref(), Some("Dune"));
        assert_eq!(reader.all::<Book>().unwrap().len(), 1);
    }

    #[test]
    fn unwritable_identifier_is_not_found() {
        let mapper = mapper();
        assert!(matches!(
            mapper.find::<Book>("a b"),
            Err(MapperError::NotFound { .. })
        ));
        assert!(matches!(
            mapper.find::<Book>("<x>"),
            Err(MapperError::NotFound { .. })
        ));
    }

    #[test]
    fn dangling_link_stays_unresolved() {
        let mapper = mapper();
        let mut book = Book {
            title: Some("Orphan".into()),
            shelf: Some(Link::Uri(format!("{EX}shelves/gone"))),
            ..Default::default()
        };
        let id = mapper.save(&mut book).unwrap();
        let loaded: Book = mapper.find(&id).unwrap();
        let link = loaded.shelf.unwrap();
        assert!(link.object().is_none());
        assert_eq!(link.uri(), format!("{EX}shelves/gone"));
    }

    #[test]
    fn link_depth_limit_leaves_bare_uri() {
        let registry = TypeRegistry::new().with::<Book>().unwrap().with::<Shelf>().unwrap();
        let mapper = Mapper::new(
            Arc::new(SparqlStore::in_memory().unwrap()),
            Arc::new(registry),
            MapperConfig {
                max_link_depth: 0,
                ..Default::default()
            },
        );
        let mut shelf = Shelf::default();
        mapper.save(&mut shelf).unwrap();
        let mut book = Book {
            shelf: Some(mapper.link_to(&shelf).unwrap()),
            ..Default::default()
        };
        let id = mapper.save(&mut book).unwrap();
        let loaded: Book = mapper.find(&id).unwrap();
        assert!(loaded.shelf.unwrap().object().is_none());
    }

    #[test]
    fn unregistered_type_is_a_configuration_error() {
        let mapper = Mapper::new(
            Arc::new(SparqlStore::in_memory().unwrap()),
            Arc::new(TypeRegistry::new()),
            MapperConfig::default(),
        );
        let mut book = Book::default();
        assert!(matches!(
            mapper.save(&mut book),
            Err(MapperError::Configuration { .. })
        ));
        assert!(matches!(
            mapper.all::<Book>(),
            Err(MapperError::Configuration { .. })
        ));
    }

    #[test]
    fn find_query_uses_optional_joins() {
        let schema = Book::schema().unwrap();
        let sparql = Mapper::find_query(&schema, "http://example.org/books/1")
            .to_sparql("http://example.org/g")
            .unwrap();
        assert_eq!(sparql.matches("OPTIONAL").count(), schema.paths().count() + 1);
        assert!(sparql.contains("VALUES ?subject { <http://example.org/books/1> }"));
    }
}
