// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /* ---------------- Remote ---------------- */
    #[error("request {url} failed with status {status}")]
    RemoteRequestFailed { status: u16, url: String },

    #[error("request {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected payload from {context}: {detail}")]
    UnexpectedPayload { context: String, detail: String },

    #[error("missing API token (pass --token or set SIS_TOKEN)")]
    MissingToken,

    /* ---------------- Catalog / cache ---------------- */
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("duplicate row key '{key}' in entity '{entity}'")]
    DuplicateKey { entity: String, key: String },

    #[error("entity '{entity}' is not cached and the cache has no remote source")]
    NotCached { entity: String },

    #[error("missing cache file for '{entity}': {}", path.display())]
    MissingCacheFile { entity: String, path: PathBuf },

    #[error("corrupt cache file for '{entity}' ({}): {source}", path.display())]
    CorruptCacheFile {
        entity: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache file for '{entity}' ({}) was saved for scope '{found}', not '{expected}'", path.display())]
    CacheScopeMismatch { entity: String, path: PathBuf, expected: String, found: String },

    #[error("cache round-trip check found {differences} difference(s)")]
    CacheVerification { differences: usize },

    /* ---------------- Reports ---------------- */
    #[error("{table}: no row with key '{key}'")]
    IncompleteJoin { table: String, key: String },

    #[error("expected exactly one {what}, found {found}")]
    AmbiguousRequiredRecord { what: String, found: usize },

    /* ---------------- Config / IO ---------------- */
    #[error("output path is not a directory: {}", .0.display())]
    InvalidOutputDir(PathBuf),

    #[error("invalid profile {}: {source}", path.display())]
    Profile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Transport failures, throttling and server errors may succeed on a second try.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } => true,
            Error::RemoteRequestFailed { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Failures that mean the on-disk cache is unusable, as opposed to IO or config problems.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Error::MissingCacheFile { .. }
                | Error::CorruptCacheFile { .. }
                | Error::CacheScopeMismatch { .. }
                | Error::DuplicateKey { .. }
        )
    }
}
