//! Fatal error taxonomy for the converter.
//!
//! Every variant aborts the run: this is a one-shot batch tool and a corrupt
//! dictionary line must not silently propagate into the compiled output.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Normalization reduced a term to nothing.
    #[error("no usable key in term {term:?}")]
    EmptyKey { term: String },

    /// A line (or a definition that requires one) lacks its tab delimiter.
    #[error("missing tab delimiter in line: {line}")]
    MissingDelimiter { line: String },

    /// The rendered definition came out empty.
    #[error("no definition left for term {term:?}")]
    EmptyDefinition { term: String },

    /// A named hook implementation does not exist in the registry.
    #[error("unknown {slot} hook {name:?}")]
    UnknownHook { slot: &'static str, name: String },

    /// The character-mapping file could not be loaded or is malformed.
    #[error("failed to load mapping file {path}: {reason}")]
    Mapping { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
