//! Peer directory: the kittens and friends a search can be federated to.
//!
//! Kittens are lightweight peers that serve catalog search at their root.
//! Friends are full peers that serve it under `/edcat`. Both are ordinary
//! graph objects; the directory only ever reads their URLs.

use std::fmt;

use crate::mapper::Mapper;
use crate::mapper::error::MapperResult;
use crate::object::{GraphObject, Identity, Link, Model, Value, first_lexical, iri};
use crate::registry::TypeRegistry;
use crate::schema::PredicateSchema;

/// didicat vocabulary namespace.
pub const DIDICAT_NS: &str = "http://didicat.semte.ch/v0.1/";

const URL_PREDICATE: &str = "http://didicat.semte.ch/v0.1/url";

/// Which kind of peer a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeerKind {
    Kitten,
    Friend,
}

impl PeerKind {
    /// Base path under which the peer serves its catalog API.
    pub fn api_root(self, url: &str) -> String {
        let url = url.trim_end_matches('/');
        match self {
            PeerKind::Kitten => url.to_string(),
            PeerKind::Friend => format!("{url}/edcat"),
        }
    }

    /// The catalog search endpoint of a peer at `url`.
    pub fn search_endpoint(self, url: &str) -> String {
        format!("{}/catalogs/search", self.api_root(url))
    }
}

impl fmt::Display for PeerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            PeerKind::Kitten => "kitten",
            PeerKind::Friend => "friend",
        })
    }
}

/// A peer's URL and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerReference {
    pub url: String,
    pub kind: PeerKind,
}

impl PeerReference {
    pub fn kitten(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: PeerKind::Kitten,
        }
    }

    pub fn friend(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: PeerKind::Friend,
        }
    }

    pub fn search_endpoint(&self) -> String {
        self.kind.search_endpoint(&self.url)
    }
}

/// A lightweight peer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kitten {
    pub identity: Identity,
    pub url: Option<String>,
}

impl Kitten {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            identity: Identity::default(),
            url: Some(url.into()),
        }
    }
}

impl GraphObject for Kitten {
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
            "url" => iri(self.url.as_deref()),
            _ => Vec::new(),
        }
    }

    fn set_values(&mut self, name: &str, values: Vec<Value>) {
        if name == "url" {
            self.url = first_lexical(values);
        }
    }

    fn link(&self, _name: &str) -> Option<&Link> {
        None
    }

    fn set_link(&mut self, _name: &str, _link: Link) {}
}

impl Model for Kitten {
    const TYPE_TAG: &'static str = "kitten";

    fn schema() -> Result<PredicateSchema, String> {
        PredicateSchema::builder(format!("{DIDICAT_NS}Kitten"))
            .base_uri(format!("{DIDICAT_NS}kittens/"))
            .pred("url", URL_PREDICATE)
            .build()
    }
}

/// A full peer, reachable under `/edcat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Friend {
    pub identity: Identity,
    pub url: Option<String>,
}

impl Friend {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            identity: Identity::default(),
            url: Some(url.into()),
        }
    }
}

impl GraphObject for Friend {
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
            "url" => iri(self.url.as_deref()),
            _ => Vec::new(),
        }
    }

    fn set_values(&mut self, name: &str, values: Vec<Value>) {
        if name == "url" {
            self.url = first_lexical(values);
        }
    }

    fn link(&self, _name: &str) -> Option<&Link> {
        None
    }

    fn set_link(&mut self, _name: &str, _link: Link) {}
}

impl Model for Friend {
    const TYPE_TAG: &'static str = "friend";

    fn schema() -> Result<PredicateSchema, String> {
        PredicateSchema::builder(format!("{DIDICAT_NS}Friend"))
            .base_uri(format!("{DIDICAT_NS}friends/"))
            .pred("url", URL_PREDICATE)
            .build()
    }
}

/// Register the peer types.
pub fn register(registry: &mut TypeRegistry) -> MapperResult<()> {
    registry.register::<Kitten>()?;
    registry.register::<Friend>()
}

/// Read-only source of known peers.
pub trait PeerDirectory: Send + Sync {
    fn kittens(&self) -> MapperResult<Vec<PeerReference>>;

    fn friends(&self) -> MapperResult<Vec<PeerReference>>;
}

/// Peer directory backed by the kitten and friend objects in the store.
#[derive(Debug, Clone)]
pub struct GraphPeerDirectory {
    mapper: Mapper,
}

impl GraphPeerDirectory {
    pub fn new(mapper: Mapper) -> Self {
        Self { mapper }
    }
}

fn references(urls: impl Iterator<Item = (Option<String>, Option<String>)>, kind: PeerKind) -> Vec<PeerReference> {
    urls.filter_map(|(id, url)| {
        if url.is_none() {
            tracing::warn!(%kind, id = id.as_deref().unwrap_or("?"), "peer without url, skipping");
        }
        url.map(|url| PeerReference { url, kind })
    })
    .collect()
}

impl PeerDirectory for GraphPeerDirectory {
    fn kittens(&self) -> MapperResult<Vec<PeerReference>> {
        let kittens = self.mapper.all::<Kitten>()?;
        Ok(references(
            kittens
                .into_iter()
                .map(|k| (k.id().map(str::to_string), k.url)),
            PeerKind::Kitten,
        ))
    }

    fn friends(&self) -> MapperResult<Vec<PeerReference>> {
        let friends = self.mapper.all::<Friend>()?;
        Ok(references(
            friends
                .into_iter()
                .map(|f| (f.id().map(str::to_string), f.url)),
            PeerKind::Friend,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::graph::sparql::SparqlStore;
    use crate::mapper::MapperConfig;

    fn mapper() -> Mapper {
        let mut registry = TypeRegistry::new();
        register(&mut registry).unwrap();
        Mapper::new(
            Arc::new(SparqlStore::in_memory().unwrap()),
            Arc::new(registry),
            MapperConfig::default(),
        )
    }

    #[test]
    fn search_endpoints_differ_by_kind() {
        assert_eq!(
            PeerReference::kitten("http://kitten.example").search_endpoint(),
            "http://kitten.example/catalogs/search"
        );
        assert_eq!(
            PeerReference::friend("http://friend.example/").search_endpoint(),
            "http://friend.example/edcat/catalogs/search"
        );
    }

    #[test]
    fn directory_lists_saved_peers() {
        let mapper = mapper();
        mapper.save(&mut Kitten::new("http://k1.example")).unwrap();
        mapper.save(&mut Kitten::new("http://k2.example")).unwrap();
        mapper.save(&mut Friend::new("http://f1.example")).unwrap();

        let directory = GraphPeerDirectory::new(mapper);
        let mut kittens = directory.kittens().unwrap();
        kittens.sort();
        assert_eq!(
            kittens,
            vec![
                PeerReference::kitten("http://k1.example"),
                PeerReference::kitten("http://k2.example"),
            ]
        );
        assert_eq!(
            directory.friends().unwrap(),
            vec![PeerReference::friend("http://f1.example")]
        );
    }

    #[test]
    fn peers_without_url_are_skipped() {
        let mapper = mapper();
        mapper.save(&mut Kitten::default()).unwrap();
        let directory = GraphPeerDirectory::new(mapper);
        assert!(directory.kittens().unwrap().is_empty());
    }

    #[test]
    fn kitten_round_trips_url_as_iri() {
        let mapper = mapper();
        let mut kitten = Kitten::new("http://k1.example");
        let id = mapper.save(&mut kitten).unwrap();
        let loaded: Kitten = mapper.find(&id).unwrap();
        assert_eq!(loaded, kitten);
    }
}
