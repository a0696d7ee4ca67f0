//! Graph-mapped application objects.
//!
//! [`GraphObject`] is the dynamic, object-safe view the mapper works with:
//! attribute values are read and written by name so one engine can serialize
//! any registered type. [`Model`] adds the static half (type tag and schema)
//! used when registering a concrete type.

use std::any::Any;
use std::fmt;

use crate::graph::{Literal, Term, XSD_BOOLEAN, XSD_INTEGER};
use crate::schema::PredicateSchema;

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Iri(String),
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn to_term(&self) -> Term {
        match self {
            Value::Iri(iri) => Term::Iri(iri.clone()),
            Value::Text(text) => Term::Literal(Literal::plain(text.clone())),
            Value::Integer(n) => Term::Literal(Literal::typed(n.to_string(), XSD_INTEGER)),
            Value::Boolean(b) => Term::Literal(Literal::typed(b.to_string(), XSD_BOOLEAN)),
        }
    }

    /// Read a stored term back. Blank nodes carry no value and yield `None`.
    /// Integer and boolean literals with an unparsable lexical form fall back
    /// to text.
    pub fn from_term(term: &Term) -> Option<Value> {
        match term {
            Term::Iri(iri) => Some(Value::Iri(iri.clone())),
            Term::Blank(_) => None,
            Term::Literal(literal) => Some(match literal.datatype.as_deref() {
                Some(XSD_INTEGER) => literal
                    .value
                    .parse()
                    .map(Value::Integer)
                    .unwrap_or_else(|_| Value::Text(literal.value.clone())),
                Some(XSD_BOOLEAN) => match literal.value.as_str() {
                    "true" | "1" => Value::Boolean(true),
                    "false" | "0" => Value::Boolean(false),
                    other => Value::Text(other.to_string()),
                },
                _ => Value::Text(literal.value.clone()),
            }),
        }
    }

    /// The value as a string, whatever its kind.
    pub fn lexical(&self) -> String {
        match self {
            Value::Iri(s) | Value::Text(s) => s.clone(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexical())
    }
}

/// Identity and persistence state shared by every graph object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    id: Option<String>,
    persisted: bool,
}

impl Identity {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            persisted: false,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Whether the object has a representation in the store.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Flip the persisted flag. It is never reset.
    pub(crate) fn mark_persisted(&mut self) {
        self.persisted = true;
    }
}

/// The value of a `has_one` link: either a bare IRI or the loaded object.
#[derive(Debug, Clone)]
pub enum Link {
    Uri(String),
    Object {
        uri: String,
        object: Box<dyn GraphObject>,
    },
}

impl Link {
    pub fn uri(&self) -> &str {
        match self {
            Link::Uri(uri) | Link::Object { uri, .. } => uri,
        }
    }

    /// The loaded object, if this link was resolved.
    pub fn object(&self) -> Option<&dyn GraphObject> {
        match self {
            Link::Uri(_) => None,
            Link::Object { object, .. } => Some(object.as_ref()),
        }
    }

    /// The loaded object downcast to a concrete type.
    pub fn downcast_ref<T: GraphObject + 'static>(&self) -> Option<&T> {
        self.object()?.as_any().downcast_ref::<T>()
    }
}

/// Links compare by target IRI only.
impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.uri() == other.uri()
    }
}

/// Blanket conversion to `Any` for downcasting.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Blanket boxed clone.
pub trait CloneObject {
    fn clone_object(&self) -> Box<dyn GraphObject>;
}

impl<T: GraphObject + Clone + 'static> CloneObject for T {
    fn clone_object(&self) -> Box<dyn GraphObject> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn GraphObject> {
    fn clone(&self) -> Self {
        (**self).clone_object()
    }
}

/// An application entity persisted through the mapper.
///
/// Attribute and link names are the ones declared in the type's
/// [`PredicateSchema`]. Unknown names are ignored on write and empty on read.
pub trait GraphObject: AsAny + CloneObject + Send + Sync + fmt::Debug {
    /// Registered type tag, stored as the application class marker.
    fn type_tag(&self) -> &str;

    fn identity(&self) -> &Identity;

    fn identity_mut(&mut self) -> &mut Identity;

    /// Current values of a scalar attribute. Empty means absent.
    fn values(&self, name: &str) -> Vec<Value>;

    fn set_values(&mut self, name: &str, values: Vec<Value>);

    fn link(&self, name: &str) -> Option<&Link>;

    fn set_link(&mut self, name: &str, link: Link);

    fn id(&self) -> Option<&str> {
        self.identity().id()
    }

    fn is_persisted(&self) -> bool {
        self.identity().is_persisted()
    }
}

/// A concrete, registrable graph object type.
pub trait Model: GraphObject + Default + Clone + 'static {
    /// Tag under which the type is registered and written as application class.
    const TYPE_TAG: &'static str;

    /// The type's layout. Called once, at registration.
    fn schema() -> Result<PredicateSchema, String>;
}

/// `Some(text)` as a single text value, `None` as absent.
pub fn text(value: Option<&str>) -> Vec<Value> {
    value.map(|v| Value::Text(v.to_string())).into_iter().collect()
}

/// `Some(iri)` as a single IRI value, `None` as absent.
pub fn iri(value: Option<&str>) -> Vec<Value> {
    value.map(|v| Value::Iri(v.to_string())).into_iter().collect()
}

/// The first value's lexical form.
pub fn first_lexical(values: Vec<Value>) -> Option<String> {
    values.into_iter().next().map(|v| v.lexical())
}
