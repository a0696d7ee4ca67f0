//! Catalog-search node filter.
//!
//! The first request of a search session carries no filter key. For it the
//! filter probes every known peer's catalog search endpoint with the
//! request's parameters, keeps the peers that answered with a non-empty
//! array, and persists them as a [`FilterRecord`] under a fresh key. Requests
//! that bring that key back are answered from the record without any probing.
//!
//! Probes run on a bounded rayon pool. A failing peer is logged and counted
//! as not qualifying; it never fails the filter.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rayon::prelude::*;

use crate::graph::query::{SelectQuery, Slot, TriplePattern};
use crate::graph::{Literal, Term};
use crate::mapper::{Mapper, generate_identifier};
use crate::object::Model;
use crate::peers::{PeerDirectory, PeerKind, PeerReference};

use super::error::{FilterError, FilterResult};
use super::probe::{CatalogProbe, ProbeError, qualifies};
use super::record::{FILTER_KEY_PREDICATE, FRIEND_PREDICATE, FilterRecord, KITTEN_PREDICATE};
use super::{CancelToken, NodeFilter, SearchRequest};

const FILTER_VAR: &str = "filter";
const CONTACT_VAR: &str = "contact_url";

/// Tunables for probing and key generation.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Upper bound on a single probe, enforced by the probe's HTTP agent.
    pub probe_timeout: Duration,
    /// Peers probed concurrently.
    pub max_parallel_probes: usize,
    /// Fresh keys tried before giving up on a collision streak.
    pub filter_key_attempts: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(5000),
            max_parallel_probes: 8,
            filter_key_attempts: 5,
        }
    }
}

/// Process-wide collaborators of the filter, shared by every request.
pub struct SearchContext {
    mapper: Mapper,
    directory: Arc<dyn PeerDirectory>,
    probe: Arc<dyn CatalogProbe>,
    pool: rayon::ThreadPool,
    settings: SearchSettings,
}

impl SearchContext {
    pub fn new(
        mapper: Mapper,
        directory: Arc<dyn PeerDirectory>,
        probe: Arc<dyn CatalogProbe>,
        settings: SearchSettings,
    ) -> FilterResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.max_parallel_probes.max(1))
            .thread_name(|i| format!("didicat-probe-{i}"))
            .build()
            .map_err(|e| FilterError::ProbePool {
                message: e.to_string(),
            })?;
        Ok(Self {
            mapper,
            directory,
            probe,
            pool,
            settings,
        })
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }
}

impl std::fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchContext")
            .field("settings", &self.settings)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

/// Peer URLs that qualified for a search, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualifyingPeers {
    pub kittens: BTreeSet<String>,
    pub friends: BTreeSet<String>,
}

impl QualifyingPeers {
    pub fn contains(&self, peer: &PeerReference) -> bool {
        match peer.kind {
            PeerKind::Kitten => self.kittens.contains(&peer.url),
            PeerKind::Friend => self.friends.contains(&peer.url),
        }
    }

    pub fn len(&self) -> usize {
        self.kittens.len() + self.friends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kittens.is_empty() && self.friends.is_empty()
    }

    fn from_peers(kittens: Vec<PeerReference>, friends: Vec<PeerReference>) -> Self {
        Self {
            kittens: kittens.into_iter().map(|p| p.url).collect(),
            friends: friends.into_iter().map(|p| p.url).collect(),
        }
    }
}

/// Node filter for one request.
///
/// The qualifying sets are computed on first use and memoized for the
/// lifetime of the filter, so a filter must not be shared across requests.
#[derive(Debug)]
pub struct EdcatSearchFilter {
    context: Arc<SearchContext>,
    cancel: CancelToken,
    nodes: OnceLock<QualifyingPeers>,
}

impl EdcatSearchFilter {
    pub fn new(context: Arc<SearchContext>) -> Self {
        Self::with_cancel(context, CancelToken::new())
    }

    /// A filter that stops probing once `cancel` fires.
    pub fn with_cancel(context: Arc<SearchContext>, cancel: CancelToken) -> Self {
        Self {
            context,
            cancel,
            nodes: OnceLock::new(),
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// The peers `request` may be forwarded to.
    ///
    /// Without a filter key that is the full directory. With a key it is the
    /// persisted record; an unknown key yields no peers.
    pub fn qualifying_peers(&self, request: &SearchRequest) -> FilterResult<&QualifyingPeers> {
        if let Some(nodes) = self.nodes.get() {
            return Ok(nodes);
        }
        let nodes = match request.filter_key() {
            None => QualifyingPeers::from_peers(
                self.context.directory.kittens()?,
                self.context.directory.friends()?,
            ),
            Some(key) => self.lookup(key)?,
        };
        Ok(self.nodes.get_or_init(|| nodes))
    }

    fn lookup(&self, key: &str) -> FilterResult<QualifyingPeers> {
        let nodes = QualifyingPeers {
            kittens: self.contact_urls(key, KITTEN_PREDICATE)?,
            friends: self.contact_urls(key, FRIEND_PREDICATE)?,
        };
        if nodes.is_empty() {
            tracing::debug!(filter_key = key, "filter key matches no peers");
        }
        Ok(nodes)
    }

    fn filter_graph(&self) -> FilterResult<&str> {
        let mapper = &self.context.mapper;
        let schema = mapper.registry().schema(FilterRecord::TYPE_TAG)?;
        Ok(mapper.graph_for(schema))
    }

    fn contact_urls(&self, key: &str, predicate: &str) -> FilterResult<BTreeSet<String>> {
        let query = SelectQuery::new()
            .distinct()
            .select(CONTACT_VAR)
            .require(key_pattern(key))
            .require(TriplePattern::new(
                Slot::var(FILTER_VAR),
                vec![predicate.to_string()],
                Slot::var(CONTACT_VAR),
            ));
        let rows = self
            .context
            .mapper
            .store()
            .query(&query, self.filter_graph()?)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(CONTACT_VAR))
            .filter_map(Term::as_iri)
            .map(str::to_string)
            .collect())
    }

    fn key_exists(&self, key: &str) -> FilterResult<bool> {
        let query = SelectQuery::new()
            .select(FILTER_VAR)
            .require(key_pattern(key))
            .limit(1);
        let rows = self
            .context
            .mapper
            .store()
            .query(&query, self.filter_graph()?)?;
        Ok(!rows.is_empty())
    }

    /// A random key no stored filter record uses yet.
    fn fresh_key(&self) -> FilterResult<String> {
        let attempts = self.context.settings.filter_key_attempts.max(1);
        for attempt in 1..=attempts {
            let key = generate_identifier();
            if !self.key_exists(&key)? {
                return Ok(key);
            }
            tracing::warn!(attempt, "generated filter key already in use, retrying");
        }
        Err(FilterError::KeyExhausted { attempts })
    }

    /// Probe every peer concurrently and keep the ones that qualify.
    fn probe_all(&self, peers: &[PeerReference], params: &[(String, String)]) -> FilterResult<Vec<PeerReference>> {
        let probe = self.context.probe.as_ref();
        let cancel = &self.cancel;
        let qualifying: Vec<PeerReference> = self.context.pool.install(|| {
            peers
                .par_iter()
                .filter(|peer| probe_peer(probe, cancel, peer, params))
                .cloned()
                .collect()
        });
        if self.cancel.is_cancelled() {
            tracing::info!(peers = peers.len(), "filter computation cancelled");
            return Err(FilterError::Cancelled);
        }
        Ok(qualifying)
    }
}

fn key_pattern(key: &str) -> TriplePattern {
    TriplePattern::new(
        Slot::var(FILTER_VAR),
        vec![FILTER_KEY_PREDICATE.to_string()],
        Slot::Term(Term::Literal(Literal::plain(key))),
    )
}

fn probe_peer(
    probe: &dyn CatalogProbe,
    cancel: &CancelToken,
    peer: &PeerReference,
    params: &[(String, String)],
) -> bool {
    let endpoint = peer.search_endpoint();
    let outcome = if cancel.is_cancelled() {
        Err(ProbeError::Cancelled { endpoint })
    } else {
        probe.search(&endpoint, params)
    };
    if let Err(error) = &outcome {
        tracing::warn!(peer = %peer.url, kind = %peer.kind, %error, "peer probe failed");
    }
    let qualified = qualifies(&outcome);
    tracing::debug!(peer = %peer.url, kind = %peer.kind, qualified, "probed peer");
    qualified
}

impl NodeFilter for EdcatSearchFilter {
    fn contact_friend(&self, request: &SearchRequest, friend: &PeerReference) -> FilterResult<bool> {
        Ok(self.qualifying_peers(request)?.contains(friend))
    }

    fn contact_kitten(&self, request: &SearchRequest, kitten: &PeerReference) -> FilterResult<bool> {
        Ok(self.qualifying_peers(request)?.contains(kitten))
    }

    fn make_filter_key(&self, request: &SearchRequest) -> FilterResult<String> {
        let directory = &self.context.directory;
        let peers: Vec<PeerReference> = directory
            .kittens()?
            .into_iter()
            .chain(directory.friends()?)
            .collect();

        let qualifying = self.probe_all(&peers, request.params())?;
        let key = self.fresh_key()?;
        let mut record = FilterRecord::new(&key, &qualifying);
        self.context.mapper.save(&mut record)?;

        tracing::info!(
            filter_key = %key,
            probed = peers.len(),
            qualifying = qualifying.len(),
            "created search filter"
        );
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::{Value as JsonValue, json};

    use super::*;
    use crate::graph::sparql::SparqlStore;
    use crate::mapper::MapperConfig;
    use crate::mapper::error::MapperResult;
    use crate::registry::TypeRegistry;

    const FILTER_GRAPH: &str = "http://didicat.semte.ch/v0.1/graphs/filters";

    struct StaticDirectory {
        kittens: Vec<PeerReference>,
        friends: Vec<PeerReference>,
    }

    impl PeerDirectory for StaticDirectory {
        fn kittens(&self) -> MapperResult<Vec<PeerReference>> {
            Ok(self.kittens.clone())
        }

        fn friends(&self) -> MapperResult<Vec<PeerReference>> {
            Ok(self.friends.clone())
        }
    }

    /// Answers from a fixed table and records every endpoint it was asked.
    #[derive(Default)]
    struct TableProbe {
        answers: HashMap<String, JsonValue>,
        calls: Mutex<Vec<String>>,
    }

    impl TableProbe {
        fn answer(mut self, endpoint: &str, body: JsonValue) -> Self {
            self.answers.insert(endpoint.to_string(), body);
            self
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CatalogProbe for TableProbe {
        fn search(&self, endpoint: &str, _params: &[(String, String)]) -> Result<JsonValue, ProbeError> {
            self.calls.lock().unwrap().push(endpoint.to_string());
            self.answers
                .get(endpoint)
                .cloned()
                .ok_or_else(|| ProbeError::Transport {
                    endpoint: endpoint.to_string(),
                    message: "connection refused".into(),
                })
        }
    }

    fn context(probe: Arc<TableProbe>) -> Arc<SearchContext> {
        let mut registry = TypeRegistry::new();
        crate::filter::register(&mut registry, FILTER_GRAPH).unwrap();
        let mapper = Mapper::new(
            Arc::new(SparqlStore::in_memory().unwrap()),
            Arc::new(registry),
            MapperConfig::default(),
        );
        let directory = StaticDirectory {
            kittens: vec![
                PeerReference::kitten("http://a.example"),
                PeerReference::kitten("http://b.example"),
            ],
            friends: vec![PeerReference::friend("http://c.example")],
        };
        Arc::new(
            SearchContext::new(mapper, Arc::new(directory), probe, SearchSettings::default()).unwrap(),
        )
    }

    fn probe() -> Arc<TableProbe> {
        Arc::new(
            TableProbe::default()
                .answer("http://a.example/catalogs/search", json!(["x"]))
                .answer("http://b.example/catalogs/search", json!([]))
                .answer("http://c.example/edcat/catalogs/search", json!([{"id": 1}])),
        )
    }

    #[test]
    fn without_key_every_peer_is_contacted() {
        let filter = EdcatSearchFilter::new(context(probe()));
        let request = SearchRequest::from_pairs(["q=rivers"]);
        assert!(filter.contact_kitten(&request, &PeerReference::kitten("http://a.example")).unwrap());
        assert!(filter.contact_kitten(&request, &PeerReference::kitten("http://b.example")).unwrap());
        assert!(filter.contact_friend(&request, &PeerReference::friend("http://c.example")).unwrap());
    }

    #[test]
    fn make_filter_key_persists_only_qualifying_peers() {
        let probe = probe();
        let context = context(probe.clone());
        let request = SearchRequest::from_pairs(["q=rivers"]);
        let key = EdcatSearchFilter::new(context.clone())
            .make_filter_key(&request)
            .unwrap();
        assert_eq!(key.len(), 22);
        assert_eq!(probe.calls(), 3);

        let keyed = request.with_filter_key(&key);
        let filter = EdcatSearchFilter::new(context);
        let nodes = filter.qualifying_peers(&keyed).unwrap();
        assert_eq!(nodes.kittens, BTreeSet::from(["http://a.example".to_string()]));
        assert_eq!(nodes.friends, BTreeSet::from(["http://c.example".to_string()]));
        assert!(!filter.contact_kitten(&keyed, &PeerReference::kitten("http://b.example")).unwrap());
        assert_eq!(probe.calls(), 3);
    }

    #[test]
    fn unknown_key_contacts_nobody() {
        let filter = EdcatSearchFilter::new(context(probe()));
        let request = SearchRequest::from_pairs(["filter_key=doesnotexist"]);
        assert!(filter.qualifying_peers(&request).unwrap().is_empty());
        assert!(!filter.contact_kitten(&request, &PeerReference::kitten("http://a.example")).unwrap());
    }

    #[test]
    fn failing_peers_are_not_qualifying() {
        let probe = Arc::new(TableProbe::default());
        let context = context(probe.clone());
        let key = EdcatSearchFilter::new(context.clone())
            .make_filter_key(&SearchRequest::default())
            .unwrap();
        let nodes = EdcatSearchFilter::new(context)
            .qualifying_peers(&SearchRequest::default().with_filter_key(&key))
            .unwrap()
            .clone();
        assert!(nodes.is_empty());
        assert_eq!(probe.calls(), 3);
    }

    #[test]
    fn cancelled_filter_writes_nothing() {
        let context = context(probe());
        let filter = EdcatSearchFilter::new(context.clone());
        filter.cancel_token().cancel();
        let err = filter.make_filter_key(&SearchRequest::default()).unwrap_err();
        assert!(matches!(err, FilterError::Cancelled));
        assert!(context.mapper().all::<FilterRecord>().unwrap().is_empty());
    }

    #[test]
    fn keys_are_unique_across_calls() {
        let context = context(probe());
        let first = EdcatSearchFilter::new(context.clone())
            .make_filter_key(&SearchRequest::default())
            .unwrap();
        let second = EdcatSearchFilter::new(context.clone())
            .make_filter_key(&SearchRequest::default())
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(context.mapper().all::<FilterRecord>().unwrap().len(), 2);
    }
}
