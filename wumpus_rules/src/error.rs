//! Errors raised while reading or applying the rules of the cave.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("unknown cell tag '{0}'")]
    UnknownTag(String),

    #[error("invalid map at line {line}: {reason}")]
    InvalidMap { line: usize, reason: String },

    #[error("unknown action symbol '{0}'")]
    UnknownAction(String),

    #[error("failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
