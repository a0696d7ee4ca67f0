//! Rich diagnostic error types for the object mapper.

use miette::Diagnostic;
use thiserror::Error;

use crate::error::StoreError;

/// Errors from mapping objects to and from the graph store.
#[derive(Debug, Error, Diagnostic)]
pub enum MapperError {
    #[error("configuration error for type \"{type_tag}\": {message}")]
    #[diagnostic(
        code(didicat::mapper::configuration),
        help(
            "Every type must be registered with a valid PredicateSchema before it is \
             saved, found or listed. Register it with `TypeRegistry::register` at startup."
        )
    )]
    Configuration { type_tag: String, message: String },

    #[error("no \"{type_tag}\" object with id \"{id}\"")]
    #[diagnostic(
        code(didicat::mapper::not_found),
        help(
            "The store holds no object of this type under the given identifier. \
             Check the identifier and that the object was saved into the same graph."
        )
    )]
    NotFound { type_tag: String, id: String },

    #[error("expected a \"{expected}\" object but the store holds a \"{found}\"")]
    #[diagnostic(
        code(didicat::mapper::type_mismatch),
        help(
            "The object's stored application class names another registered type. \
             Load it through `Mapper::find_dyn` to get the stored type."
        )
    )]
    TypeMismatch { expected: String, found: String },

    #[error("\"{type_tag}\" object has no identifier")]
    #[diagnostic(
        code(didicat::mapper::missing_identifier),
        help("Only objects with an identifier can be destroyed. Save or load the object first.")
    )]
    MissingIdentifier { type_tag: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for mapper results.
pub type MapperResult<T> = std::result::Result<T, MapperError>;
