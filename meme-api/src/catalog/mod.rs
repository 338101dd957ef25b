//! The catalog core: turning configured URLs into cached YouTube entities and drawing from them.
//!
//! Data flows from a [`crate::sheets::ConfigSource`] through [`resolve_id`] and a
//! [`CatalogClient`] into the [`CatalogCache`], which the [`Sampler`] reads and the
//! [`UpdateCoordinator`] keeps current.

mod cache;
mod coordinator;
mod entity;
mod mirror;
mod remote;
mod resolver;
mod sampler;

pub use cache::{CatalogCache, Snapshot, Source};
pub use coordinator::{RefreshOutcome, UpdateCoordinator};
pub use entity::{EntityKind, ItemPage, ResolvedEntity};
pub use mirror::{DiskMirror, MirrorFile};
pub use remote::{CatalogClient, RemoteCatalog, Resource};
pub use resolver::resolve_id;
pub use sampler::{RandomSource, Sampler};
