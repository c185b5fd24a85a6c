use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type for config store operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which id lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    MainVariant(u32),
    SubVariant { main: u32, sub: u32 },
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::MainVariant(id) => write!(f, "main variant {id}"),
            Lookup::SubVariant { main, sub } => write!(f, "sub variant {sub} of main variant {main}"),
        }
    }
}

/// Broad failure class, used to pick the user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Load,
    Save,
}

/// Errors produced by the config store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A referenced main or sub variant id does not exist.
    #[error("{0} not found")]
    NotFound(Lookup),

    /// Config file missing or unreadable.
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not a valid ConfigFile document.
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write config to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Read { .. } | Self::Parse { .. } => ErrorKind::Load,
            Self::Serialize(_) | Self::Write { .. } => ErrorKind::Save,
        }
    }
}
