//! Error taxonomy for the catalog pipeline.

use crate::catalog::EntityKind;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while resolving, fetching, caching or sampling catalog entities.
///
/// Persistence errors are never fatal to a population: they are logged by the cache and the
/// in-memory state proceeds as if the disk mirror did not exist.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The configured URL does not carry any marker recognized for the kind.
    #[error("cannot extract a {kind} id from '{url}'")]
    MalformedReference { kind: EntityKind, url: String },

    /// Transport or HTTP failure while talking to a remote Google API.
    #[error("remote catalog unavailable ({endpoint}): {reason}")]
    RemoteUnavailable { endpoint: String, reason: String },

    /// The id looked valid but no resource matched, even after every fallback.
    #[error("no {kind} found for '{id}'")]
    NotFound { kind: EntityKind, id: String },

    /// The API answered successfully with an empty list where at least one item is required.
    #[error("{kind} '{id}' has no items")]
    EmptyResult { kind: EntityKind, id: String },

    /// Ran out of continuation tokens before the requested index was reached.
    #[error("playlist '{parent_id}' ended after {consumed} items, before index {target}")]
    ExhaustedPagination {
        parent_id: String,
        target: u64,
        consumed: u64,
    },

    /// Sampling from a kind that has nothing cached.
    #[error("no {kind} entities are cached")]
    EmptyCollection { kind: EntityKind },

    #[error("cannot write disk mirror {}: {source}", path.display())]
    PersistenceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read disk mirror {}: {reason}", path.display())]
    PersistenceRead { path: PathBuf, reason: String },
}

impl CatalogError {
    pub(crate) fn remote(endpoint: &str, reason: impl std::fmt::Display) -> Self {
        Self::RemoteUnavailable {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}
