//! Node filters: which peers a search request should be forwarded to.
//!
//! A node filter answers, per peer, whether contacting it is worthwhile for a
//! given request. The [`EdcatSearchFilter`] answers by probing every known
//! peer once, persisting the qualifying set under a random filter key, and
//! serving later requests that carry the key from the persisted set.

pub mod edcat_search;
pub mod error;
pub mod probe;
pub mod record;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::mapper::error::MapperResult;
use crate::peers::PeerReference;
use crate::registry::TypeRegistry;

pub use self::edcat_search::{EdcatSearchFilter, QualifyingPeers, SearchContext, SearchSettings};
pub use self::error::{FilterError, FilterResult};
pub use self::probe::{CatalogProbe, HttpCatalogProbe, ProbeError, ProbeResult};
pub use self::record::FilterRecord;

/// Query parameter carrying a previously issued filter key.
pub const FILTER_KEY_PARAM: &str = "filter_key";

/// An incoming search request: its query parameters, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    params: Vec<(String, String)>,
}

impl SearchRequest {
    pub fn new<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse `key=value` pairs. Pairs without `=` get an empty value.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(pairs.into_iter().map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        }))
    }

    /// All parameters, forwarded verbatim to probed peers.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// The filter key, if the request carries a non-empty one.
    pub fn filter_key(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == FILTER_KEY_PARAM)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// The request with its filter key replaced by `key`.
    pub fn with_filter_key(mut self, key: &str) -> Self {
        self.params.retain(|(k, _)| k != FILTER_KEY_PARAM);
        self.params.push((FILTER_KEY_PARAM.to_string(), key.to_string()));
        self
    }
}

/// Cooperative cancellation flag shared between a request and its probes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-peer forwarding decision for search requests.
pub trait NodeFilter {
    /// Whether `friend` should receive `request`.
    fn contact_friend(&self, request: &SearchRequest, friend: &PeerReference) -> FilterResult<bool>;

    /// Whether `kitten` should receive `request`.
    fn contact_kitten(&self, request: &SearchRequest, kitten: &PeerReference) -> FilterResult<bool>;

    /// Compute the qualifying peers for `request`, persist them and return
    /// the key under which they can be retrieved.
    fn make_filter_key(&self, request: &SearchRequest) -> FilterResult<String>;
}

/// Register the filter record type, stored in `filter_graph`.
pub fn register(registry: &mut TypeRegistry, filter_graph: &str) -> MapperResult<()> {
    registry.register_in::<FilterRecord>(filter_graph)
}
