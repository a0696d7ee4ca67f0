//! Engine facade: top-level API for didicat.
//!
//! The `Engine` owns the triple store, the type registry and the mapper,
//! and hands out per-request search filters sharing one probe pool.

use std::sync::Arc;

use crate::config::DidicatConfig;
use crate::error::DidicatResult;
use crate::filter::{
    self, CatalogProbe, EdcatSearchFilter, FilterRecord, HttpCatalogProbe, SearchContext,
};
use crate::graph::sparql::SparqlStore;
use crate::mapper::Mapper;
use crate::mapper::error::{MapperError, MapperResult};
use crate::object::GraphObject;
use crate::peers::{self, Friend, GraphPeerDirectory, Kitten, PeerDirectory, PeerKind};
use crate::registry::TypeRegistry;

/// A stored peer with its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub id: String,
    pub kind: PeerKind,
    pub url: Option<String>,
}

/// Triple counts per graph.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub object_graph: String,
    pub object_triples: usize,
    pub filter_graph: String,
    pub filter_triples: usize,
    pub persistent: bool,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "store: {}", if self.persistent { "on disk" } else { "in memory" })?;
        writeln!(f, "<{}>: {} triples", self.object_graph, self.object_triples)?;
        write!(f, "<{}>: {} triples", self.filter_graph, self.filter_triples)
    }
}

/// The didicat engine.
pub struct Engine {
    config: DidicatConfig,
    store: Arc<SparqlStore>,
    mapper: Mapper,
    search: Arc<SearchContext>,
}

impl Engine {
    /// Create an engine probing peers over HTTP.
    pub fn new(config: DidicatConfig) -> DidicatResult<Self> {
        let probe = HttpCatalogProbe::new(config.search_settings().probe_timeout);
        Self::with_probe(config, Arc::new(probe))
    }

    /// Create an engine with a custom catalog probe.
    pub fn with_probe(config: DidicatConfig, probe: Arc<dyn CatalogProbe>) -> DidicatResult<Self> {
        config.validate()?;
        let store = match config.store_dir() {
            Some(dir) => SparqlStore::open(&dir)?,
            None => SparqlStore::in_memory()?,
        };
        let store = Arc::new(store);
        let registry = Arc::new(Self::registry(&config)?);
        let mapper = Mapper::new(store.clone(), registry, config.mapper_config());
        let directory: Arc<dyn PeerDirectory> = Arc::new(GraphPeerDirectory::new(mapper.clone()));
        let search = Arc::new(SearchContext::new(
            mapper.clone(),
            directory,
            probe,
            config.search_settings(),
        )?);

        tracing::info!(
            object_graph = %config.object_graph,
            filter_graph = %config.filter_graph,
            persistent = config.data_dir.is_some(),
            "initialized didicat engine"
        );
        Ok(Self {
            config,
            store,
            mapper,
            search,
        })
    }

    /// The registry of every type the engine persists.
    pub fn registry(config: &DidicatConfig) -> MapperResult<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        peers::register(&mut registry)?;
        filter::register(&mut registry, &config.filter_graph)?;
        Ok(registry)
    }

    pub fn config(&self) -> &DidicatConfig {
        &self.config
    }

    pub fn store(&self) -> &SparqlStore {
        &self.store
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// A fresh filter for one search request.
    pub fn filter(&self) -> EdcatSearchFilter {
        EdcatSearchFilter::new(self.search.clone())
    }

    /// Store a new peer and return its identifier.
    pub fn add_peer(&self, kind: PeerKind, url: &str) -> DidicatResult<String> {
        let id = match kind {
            PeerKind::Kitten => self.mapper.save(&mut Kitten::new(url))?,
            PeerKind::Friend => self.mapper.save(&mut Friend::new(url))?,
        };
        Ok(id)
    }

    /// All stored peers of both kinds.
    pub fn peers(&self) -> DidicatResult<Vec<PeerEntry>> {
        let kittens = self.mapper.all::<Kitten>()?;
        let friends = self.mapper.all::<Friend>()?;
        let entry = |id: Option<&str>, kind, url: &Option<String>| PeerEntry {
            id: id.unwrap_or_default().to_string(),
            kind,
            url: url.clone(),
        };
        let mut entries: Vec<PeerEntry> = kittens
            .iter()
            .map(|k| entry(k.id(), PeerKind::Kitten, &k.url))
            .chain(friends.iter().map(|f| entry(f.id(), PeerKind::Friend, &f.url)))
            .collect();
        entries.sort_by(|a, b| (a.kind, &a.url).cmp(&(b.kind, &b.url)));
        Ok(entries)
    }

    /// Remove the peer `id`. Fails with `NotFound` if it does not exist.
    pub fn remove_peer(&self, kind: PeerKind, id: &str) -> DidicatResult<()> {
        match kind {
            PeerKind::Kitten => {
                let kitten: Kitten = self.mapper.find(id)?;
                self.mapper.destroy(&kitten)?;
            }
            PeerKind::Friend => {
                let friend: Friend = self.mapper.find(id)?;
                self.mapper.destroy(&friend)?;
            }
        }
        Ok(())
    }

    /// The filter record stored under `key`.
    pub fn filter_record(&self, key: &str) -> DidicatResult<Option<FilterRecord>> {
        match self.mapper.find::<FilterRecord>(key) {
            Ok(record) => Ok(Some(record)),
            Err(MapperError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn info(&self) -> DidicatResult<EngineInfo> {
        Ok(EngineInfo {
            object_graph: self.config.object_graph.clone(),
            object_triples: self.store.len(&self.config.object_graph)?,
            filter_graph: self.config.filter_graph.clone(),
            filter_triples: self.store.len(&self.config.filter_graph)?,
            persistent: self.config.data_dir.is_some(),
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("search", &self.search)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(DidicatConfig::default()).unwrap()
    }

    #[test]
    fn add_list_remove_peers() {
        let engine = engine();
        let kitten = engine.add_peer(PeerKind::Kitten, "http://k.example").unwrap();
        engine.add_peer(PeerKind::Friend, "http://f.example").unwrap();

        let peers = engine.peers().unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].kind, PeerKind::Kitten);
        assert_eq!(peers[0].id, kitten);

        engine.remove_peer(PeerKind::Kitten, &kitten).unwrap();
        assert_eq!(engine.peers().unwrap().len(), 1);
    }

    #[test]
    fn removing_unknown_peer_is_not_found() {
        let err = engine().remove_peer(PeerKind::Friend, "nope").unwrap_err();
        assert!(matches!(
            err,
            crate::error::DidicatError::Mapper(MapperError::NotFound { .. })
        ));
    }

    #[test]
    fn unknown_filter_record_is_none() {
        let engine = engine();
        assert!(engine.filter_record("missing").unwrap().is_none());
        assert!(engine.filter_record("not a key").unwrap().is_none());
    }

    #[test]
    fn info_counts_object_graph() {
        let engine = engine();
        engine.add_peer(PeerKind::Kitten, "http://k.example").unwrap();
        let info = engine.info().unwrap();
        // url, type, application class
        assert_eq!(info.object_triples, 3);
        assert_eq!(info.filter_triples, 0);
        assert!(!info.persistent);
    }
}
