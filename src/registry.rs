//! Type registry: type tag ↔ schema and factory.
//!
//! The [`TypeRegistry`] is filled once at startup and shared read-only
//! afterwards (typically behind an `Arc`). The mapper consults it to find a
//! type's schema and to instantiate the concrete type named by a stored
//! application class marker.

use std::collections::HashMap;
use std::sync::Arc;

use crate::mapper::error::{MapperError, MapperResult};
use crate::object::{GraphObject, Model};
use crate::schema::PredicateSchema;

type Factory = fn() -> Box<dyn GraphObject>;

fn instantiate<T: Model>() -> Box<dyn GraphObject> {
    Box::new(T::default())
}

/// A registered type: its schema and a constructor for blank instances.
#[derive(Clone)]
pub struct Registration {
    schema: Arc<PredicateSchema>,
    factory: Factory,
}

impl Registration {
    pub fn schema(&self) -> &PredicateSchema {
        &self.schema
    }

    /// A fresh, unpersisted instance of the registered type.
    pub fn instantiate(&self) -> Box<dyn GraphObject> {
        (self.factory)()
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("class_uri", &self.schema.class_uri())
            .finish()
    }
}

/// Map from type tag to [`Registration`].
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Registration>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under [`Model::TYPE_TAG`]. Errors if the tag is taken or
    /// the schema is invalid.
    pub fn register<T: Model>(&mut self) -> MapperResult<()> {
        self.insert::<T>(None)
    }

    /// Register `T`, storing its objects in `graph` regardless of the graph
    /// its schema names.
    pub fn register_in<T: Model>(&mut self, graph: &str) -> MapperResult<()> {
        self.insert::<T>(Some(graph))
    }

    fn insert<T: Model>(&mut self, graph: Option<&str>) -> MapperResult<()> {
        let tag = T::TYPE_TAG;
        if self.types.contains_key(tag) {
            return Err(MapperError::Configuration {
                type_tag: tag.to_string(),
                message: "type registered twice".into(),
            });
        }
        let schema = T::schema().map_err(|message| MapperError::Configuration {
            type_tag: tag.to_string(),
            message,
        })?;
        let schema = match graph {
            Some(graph) => schema.in_graph(graph),
            None => schema,
        };
        tracing::debug!(type_tag = tag, class_uri = schema.class_uri(), "registered type");
        self.types.insert(
            tag.to_string(),
            Registration {
                schema: Arc::new(schema),
                factory: instantiate::<T>,
            },
        );
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T: Model>(mut self) -> MapperResult<Self> {
        self.register::<T>()?;
        Ok(self)
    }

    /// Look up a registration, failing with a configuration error.
    pub fn get(&self, tag: &str) -> MapperResult<&Registration> {
        self.types.get(tag).ok_or_else(|| MapperError::Configuration {
            type_tag: tag.to_string(),
            message: "no schema registered for this type".into(),
        })
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    /// Schema for `tag`.
    pub fn schema(&self, tag: &str) -> MapperResult<&PredicateSchema> {
        self.get(tag).map(Registration::schema)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
