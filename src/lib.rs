// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # didicat
//!
//! A schema-driven object/graph mapper over SPARQL named graphs, and a
//! federated catalog search filter built on it.
//!
//! ## Architecture
//!
//! - **Graph store** (`graph`): triples, SELECT query builder, oxigraph backend
//! - **Schemas** (`schema`, `registry`): per-type predicate paths, class and base IRIs
//! - **Mapper** (`mapper`): save, destroy, find and list objects by schema
//! - **Peers** (`peers`): kittens and friends a search is federated to
//! - **Filters** (`filter`): probe peers once, remember who qualified under a key
//!
//! ## Library usage
//!
//! ```no_run
//! use didicat::config::DidicatConfig;
//! use didicat::engine::Engine;
//! use didicat::filter::{NodeFilter, SearchRequest};
//! use didicat::peers::PeerKind;
//!
//! let engine = Engine::new(DidicatConfig::default()).unwrap();
//! engine.add_peer(PeerKind::Kitten, "http://kitten.example").unwrap();
//! let request = SearchRequest::from_pairs(["q=rivers"]);
//! let key = engine.filter().make_filter_key(&request).unwrap();
//! println!("filter key: {key}");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod graph;
pub mod mapper;
pub mod object;
pub mod paths;
pub mod peers;
pub mod registry;
pub mod schema;
