//! Error taxonomy for project-scoped operations.

use std::io;

use thiserror::Error;

/// Failure of a single store operation or a missing precondition.
///
/// Only [`ProjectError::NoActiveProject`] aborts an interpretation pass; the
/// other variants are reported per directive.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("no project selected (use !project <name> first)")]
    NoActiveProject,

    #[error("path escapes project root: {0}")]
    PathEscape(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    /// The command could not be spawned or waited on; a non-zero exit is not an error.
    #[error("run {command}: {message}")]
    Command { command: String, message: String },
}

impl ProjectError {
    pub fn io(op: &'static str, path: impl Into<String>, source: io::Error) -> Self {
        ProjectError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
