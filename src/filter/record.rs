//! Persisted filter records.
//!
//! A filter record remembers which peers qualified for a search, under a
//! random key the client can hand back later. Its identifier is the key.

use std::collections::BTreeSet;

use crate::object::{GraphObject, Identity, Link, Model, Value, first_lexical, text};
use crate::peers::{DIDICAT_NS, PeerKind, PeerReference};
use crate::schema::PredicateSchema;

pub const FILTER_KEY_PREDICATE: &str = "http://didicat.semte.ch/v0.1/filterKey";
pub const KITTEN_PREDICATE: &str = "http://didicat.semte.ch/v0.1/kitten";
pub const FRIEND_PREDICATE: &str = "http://didicat.semte.ch/v0.1/friend";

/// The qualifying peers of one search, stored under `key`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRecord {
    pub identity: Identity,
    pub key: Option<String>,
    pub kitten_urls: BTreeSet<String>,
    pub friend_urls: BTreeSet<String>,
}

impl FilterRecord {
    /// A record for `key`, identified by the key itself.
    pub fn new<'a>(key: &str, qualifying: impl IntoIterator<Item = &'a PeerReference>) -> Self {
        let mut record = Self {
            identity: Identity::with_id(key),
            key: Some(key.to_string()),
            ..Self::default()
        };
        for peer in qualifying {
            match peer.kind {
                PeerKind::Kitten => record.kitten_urls.insert(peer.url.clone()),
                PeerKind::Friend => record.friend_urls.insert(peer.url.clone()),
            };
        }
        record
    }
}

fn iris(urls: &BTreeSet<String>) -> Vec<Value> {
    urls.iter().cloned().map(Value::Iri).collect()
}

fn lexical_set(values: Vec<Value>) -> BTreeSet<String> {
    values.iter().map(Value::lexical).collect()
}

impl GraphObject for FilterRecord {
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
            "key" => text(self.key.as_deref()),
            "kitten_urls" => iris(&self.kitten_urls),
            "friend_urls" => iris(&self.friend_urls),
            _ => Vec::new(),
        }
    }

    fn set_values(&mut self, name: &str, values: Vec<Value>) {
        match name {
            "key" => self.key = first_lexical(values),
            "kitten_urls" => self.kitten_urls = lexical_set(values),
            "friend_urls" => self.friend_urls = lexical_set(values),
            _ => {}
        }
    }

    fn link(&self, _name: &str) -> Option<&Link> {
        None
    }

    fn set_link(&mut self, _name: &str, _link: Link) {}
}

impl Model for FilterRecord {
    const TYPE_TAG: &'static str = "filter";

    fn schema() -> Result<PredicateSchema, String> {
        PredicateSchema::builder(format!("{DIDICAT_NS}Filter"))
            .base_uri(format!("{DIDICAT_NS}filters/"))
            .pred("key", FILTER_KEY_PREDICATE)
            .pred_set("kitten_urls", KITTEN_PREDICATE)
            .pred_set("friend_urls", FRIEND_PREDICATE)
            .build()
    }
}
