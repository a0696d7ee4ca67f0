//! Rich diagnostic error types for node filters.

use miette::Diagnostic;
use thiserror::Error;

use crate::error::StoreError;
use crate::mapper::error::MapperError;

/// Errors from evaluating or creating search filters.
///
/// Individual peer failures never show up here: they are absorbed per probe
/// and only make the peer non-qualifying.
#[derive(Debug, Error, Diagnostic)]
pub enum FilterError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Mapper(#[from] MapperError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("could not find an unused filter key after {attempts} attempts")]
    #[diagnostic(
        code(didicat::filter::key_exhausted),
        help(
            "Every generated key collided with an existing filter record. \
             This is practically impossible with a healthy random source; \
             check the filter graph for corrupted records."
        )
    )]
    KeyExhausted { attempts: usize },

    #[error("filter computation cancelled")]
    #[diagnostic(
        code(didicat::filter::cancelled),
        help("The request was abandoned before all peers answered. No filter record was written.")
    )]
    Cancelled,

    #[error("failed to start the probe pool: {message}")]
    #[diagnostic(
        code(didicat::filter::probe_pool),
        help("The worker threads for peer probing could not be spawned. Lower `max_parallel_probes`.")
    )]
    ProbePool { message: String },
}

/// Convenience alias for filter results.
pub type FilterResult<T> = std::result::Result<T, FilterError>;
