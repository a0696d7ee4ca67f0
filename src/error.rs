//! Rich diagnostic error types for didicat.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::filter::error::FilterError;
use crate::mapper::error::MapperError;
use crate::paths::PathError;

/// Top-level error type for didicat.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum DidicatError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Mapper(#[from] MapperError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Paths(#[from] PathError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("failed to open graph store: {message}")]
    #[diagnostic(
        code(didicat::store::open),
        help(
            "The oxigraph store could not be created. Check that the data directory \
             exists, has correct permissions, and is not locked by another process."
        )
    )]
    Open { message: String },

    #[error("SPARQL query failed on graph <{graph}>: {message}")]
    #[diagnostic(
        code(didicat::store::query),
        help(
            "The read query was rejected or could not be evaluated. \
             Run with RUST_LOG=didicat=debug to see the generated query text."
        )
    )]
    Query { graph: String, message: String },

    #[error("SPARQL update failed: {message}")]
    #[diagnostic(
        code(didicat::store::update),
        help(
            "The write was rejected by the store and nothing was applied. \
             Check the store's disk space and the validity of the written IRIs."
        )
    )]
    Update { message: String },

    #[error("unexpected result form: {message}")]
    #[diagnostic(
        code(didicat::store::unexpected_result),
        help("Only SELECT queries are supported through `GraphStore::query`.")
    )]
    UnexpectedResult { message: String },

    #[error("invalid term: {message}")]
    #[diagnostic(
        code(didicat::store::invalid_term),
        help(
            "IRIs must not contain whitespace or any of <>\"{{}}|^`\\ and \
             variable names must be alphanumeric."
        )
    )]
    InvalidTerm { message: String },
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Convenience alias for functions returning didicat results.
pub type DidicatResult<T> = std::result::Result<T, DidicatError>;
