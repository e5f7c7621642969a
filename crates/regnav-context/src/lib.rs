//! regnav Artifact Context
//!
//! Owns the navigation context: which registry is connected, which repository,
//! tag and reference are selected, and which manifest is loaded.
//!
//! # Overview
//!
//! - [`ArtifactContextStore`]: single-writer store with cascade invalidation
//! - [`ArtifactContext`]: immutable snapshot handed to readers
//! - [`ContextEvent`]: change notifications, one per changed field
//! - [`RepositoryTree`]: hierarchical view of a catalog listing
//!
//! # Example
//!
//! ```rust
//! use regnav_context::{ArtifactContextStore, Registry, Repository, Tag};
//!
//! let store = ArtifactContextStore::new();
//! store.set_registry(Some(Registry::new("ghcr.io")));
//! store.set_repository(Some(Repository::minimal("org/app")));
//! store.set_tag(Some(Tag::new("v1", "org/app")));
//! assert_eq!(store.reference().value, "v1");
//!
//! // A different registry invalidates everything below it.
//! store.set_registry(Some(Registry::new("docker.io")));
//! assert!(store.repository().is_none());
//! assert!(store.reference().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod event;
pub mod model;
pub mod store;

pub use event::ContextEvent;
pub use model::{
    ArtifactContext, ContextReference, LoadedManifest, Registry, RegistryAuth, Repository,
    RepositoryTree, SizeSummary, Tag,
};
pub use store::{ArtifactContextStore, DEFAULT_EVENT_CAPACITY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
