//! Collaborator traits implemented outside regnav

use crate::descriptor::{Descriptor, Manifest, ReferrerDescriptor, SizeReport};
use crate::error::RegistryError;
use async_trait::async_trait;

/// Registry operations consumed by the navigation layer
///
/// Implementations own transport, authentication and wire-format concerns.
/// Every failure must already be classified into a [`RegistryError`].
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// List repository paths in the registry catalog
    ///
    /// # Errors
    /// `RegistryError::ListingNotSupported` when the registry has no catalog.
    async fn list_repositories(&self) -> Result<Vec<String>, RegistryError>;

    /// List tag names in the registry's native order
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, RegistryError>;

    /// Resolve a tag or digest to a descriptor
    async fn resolve(&self, repository: &str, reference: &str) -> Result<Descriptor, RegistryError>;

    /// Fetch a manifest by tag or digest
    async fn fetch_manifest(
        &self,
        repository: &str,
        tag_or_digest: &str,
    ) -> Result<Manifest, RegistryError>;

    /// Delete a manifest by digest
    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<(), RegistryError>;

    /// List artifacts that refer to `subject`
    async fn fetch_referrers(
        &self,
        repository: &str,
        subject: &Descriptor,
    ) -> Result<Vec<ReferrerDescriptor>, RegistryError>;
}

/// Computes the size summary of a loaded manifest
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait SizeAnalyzer: Send + Sync {
    /// Analyze `manifest` stored in `repository`
    async fn analyze(
        &self,
        repository: &str,
        manifest: &Manifest,
    ) -> Result<SizeReport, RegistryError>;
}
