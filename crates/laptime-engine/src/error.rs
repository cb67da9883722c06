use std::io;

use thiserror::Error;

use crate::template::TemplateError;

/// Errors raised while instrumenting a single callable or emitting a companion artifact.
///
/// None of these abort a round: the engine reports them to the diagnostics sink
/// and moves on to the next callable or type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid message template: {0}")]
    Template(#[from] TemplateError),

    #[error("malformed `time` attribute: {0}")]
    Marker(syn::Error),

    #[error("`{0}` is a const fn and cannot read a clock")]
    ConstFn(String),

    #[error("failed to emit companion artifact `{artifact}`: {source}")]
    Emit {
        artifact: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse source: {0}")]
    Parse(syn::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
