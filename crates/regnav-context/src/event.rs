//! Change notifications published by the store

use crate::model::{ArtifactContext, ContextReference, Registry, Repository, SizeSummary, Tag};
use regnav_client::Manifest;

/// A change to the artifact context
///
/// Each event carries the new value, so a subscriber never has to read the
/// store back to learn what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    /// Registry connected, replaced or disconnected
    RegistryChanged(Option<Registry>),
    /// Repository selected or cleared
    RepositoryChanged(Option<Repository>),
    /// Tag selected or cleared
    TagChanged(Option<Tag>),
    /// Reference text or digest flag changed
    ReferenceChanged(ContextReference),
    /// Combined notification after an atomic update
    ArtifactContextChanged(Box<ArtifactContext>),
    /// Manifest loaded, replaced or cleared
    ManifestChanged(Option<Manifest>),
    /// Size analysis finished, failed or was reset
    SizeSummaryChanged(SizeSummary),
}

impl ContextEvent {
    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegistryChanged(_) => "registry-changed",
            Self::RepositoryChanged(_) => "repository-changed",
            Self::TagChanged(_) => "tag-changed",
            Self::ReferenceChanged(_) => "reference-changed",
            Self::ArtifactContextChanged(_) => "artifact-context-changed",
            Self::ManifestChanged(_) => "manifest-changed",
            Self::SizeSummaryChanged(_) => "size-summary-changed",
        }
    }
}
