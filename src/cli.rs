//! Subcommands of the pushgp binary.

pub(crate) mod evolve;
pub(crate) mod exec;

mod problems;

use pushgp::{ConfigError, SearchError, SerializationError};
use thiserror::Error;

/// Anything a subcommand can fail with.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Bad command-line input.
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}
