//! Crate-wide error type.
//!
//! Operations return [`Error`] for conditions that abort a request outright.
//! Failures the browser is expected to act on (a failed syntax check, a
//! duplicate match, a reserved code) are *not* errors; they are reported in
//! the response dictionary instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A filesystem operation failed.
    #[error("I/O operation failed on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing an mmCIF file failed.
    #[error(transparent)]
    Cif(#[from] crate::io::Error),

    /// The site configuration file could not be read or parsed.
    #[error("invalid site configuration: {0}")]
    Config(String),

    /// An external program could not be started.
    #[error("failed to start '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A request parameter is unusable (e.g. it would escape the session directory).
    #[error("invalid value for request parameter '{name}': '{value}'")]
    InvalidParameter { name: String, value: String },

    /// An HTML template references a key that was not supplied.
    #[error("template '{template}' references unknown key '{key}'")]
    Template { template: String, key: String },

    /// A tool produced JSON that could not be decoded.
    #[error("malformed JSON output: {0}")]
    Json(#[from] serde_json::Error),

    /// The entry database could not be queried.
    #[error("database query failed: {0}")]
    Database(String),

    /// The notification mailer rejected a message.
    #[error("notification failed: {0}")]
    Notify(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
