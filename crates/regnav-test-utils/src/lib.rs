//! Testing utilities for regnav workspace
//!
//! In-memory registry, canned size analyzer and manifest fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use regnav_client::{
    Descriptor, Manifest, ReferrerDescriptor, RegistryClient, RegistryError, SizeAnalyzer,
    SizeReport,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Notify;

pub const IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

pub fn descriptor(digest: &str) -> Descriptor {
    Descriptor::new(digest, IMAGE_MANIFEST, 512)
}

pub fn manifest(digest: &str) -> Manifest {
    Manifest::new(descriptor(digest), format!(r#"{{"digest":"{digest}"}}"#))
}

pub fn referrer(digest: &str, artifact_type: &str) -> ReferrerDescriptor {
    ReferrerDescriptor::new(digest, IMAGE_MANIFEST).with_artifact_type(artifact_type)
}

/// Registry backed by hash maps
///
/// Tags keep insertion order, which stands in for the registry's native
/// order. Every trait call is counted under its method name.
#[derive(Default)]
pub struct InMemoryRegistry {
    repositories: Mutex<Vec<String>>,
    tags: Mutex<HashMap<String, Vec<(String, String)>>>,
    manifests: Mutex<HashMap<String, Manifest>>,
    referrers: Mutex<HashMap<String, Vec<ReferrerDescriptor>>>,
    failing_referrers: Mutex<HashSet<String>>,
    catalog_error: Mutex<Option<RegistryError>>,
    tag_error: Mutex<Option<RegistryError>>,
    tag_gate: Mutex<Option<Arc<Notify>>>,
    deleted: Mutex<Vec<String>>,
    calls: DashMap<&'static str, usize>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a repository with `(tag, digest)` pairs in listing order
    pub fn with_repository(self, path: &str, tags: &[(&str, &str)]) -> Self {
        self.repositories.lock().push(path.to_string());
        let mut manifests = self.manifests.lock();
        for (_, digest) in tags {
            manifests
                .entry(digest.to_ascii_lowercase())
                .or_insert_with(|| manifest(digest));
        }
        drop(manifests);
        self.tags.lock().insert(
            path.to_string(),
            tags.iter()
                .map(|(tag, digest)| ((*tag).to_string(), (*digest).to_string()))
                .collect(),
        );
        self
    }

    /// Attach `referrers` to `subject`; every digest involved becomes resolvable
    pub fn with_referrers(self, subject: &str, referrers: Vec<ReferrerDescriptor>) -> Self {
        {
            let mut manifests = self.manifests.lock();
            let digests = referrers.iter().map(|r| r.digest.as_str());
            for digest in std::iter::once(subject).chain(digests) {
                manifests
                    .entry(digest.to_ascii_lowercase())
                    .or_insert_with(|| manifest(digest));
            }
        }
        self.referrers
            .lock()
            .insert(subject.to_ascii_lowercase(), referrers);
        self
    }

    /// Make referrer discovery for `subject` fail
    pub fn with_failing_referrers(self, subject: &str) -> Self {
        self.failing_referrers
            .lock()
            .insert(subject.to_ascii_lowercase());
        self
    }

    /// Answer catalog requests the way registries without a catalog do
    pub fn without_catalog(self) -> Self {
        *self.catalog_error.lock() = Some(RegistryError::ListingNotSupported);
        self
    }

    pub fn with_catalog_error(self, error: RegistryError) -> Self {
        *self.catalog_error.lock() = Some(error);
        self
    }

    pub fn with_tag_error(self, error: RegistryError) -> Self {
        *self.tag_error.lock() = Some(error);
        self
    }

    /// Hold every tag listing until `gate` is notified
    pub fn with_tag_gate(self, gate: Arc<Notify>) -> Self {
        *self.tag_gate.lock() = Some(gate);
        self
    }

    /// Number of calls made to `method`
    pub fn calls(&self, method: &str) -> usize {
        self.calls.get(method).map_or(0, |count| *count)
    }

    /// Digests removed through `delete_manifest`
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    fn record(&self, method: &'static str) {
        *self.calls.entry(method).or_insert(0) += 1;
    }

    fn lookup(&self, repository: &str, reference: &str) -> Result<Manifest, RegistryError> {
        let digest = if reference.contains(':') {
            reference.to_string()
        } else {
            self.tags
                .lock()
                .get(repository)
                .and_then(|tags| tags.iter().find(|(tag, _)| tag == reference))
                .map(|(_, digest)| digest.clone())
                .ok_or_else(|| RegistryError::NotFound(format!("{repository}:{reference}")))?
        };
        self.manifests
            .lock()
            .get(&digest.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("{repository}@{digest}")))
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn list_repositories(&self) -> Result<Vec<String>, RegistryError> {
        self.record("list_repositories");
        if let Some(error) = self.catalog_error.lock().clone() {
            return Err(error);
        }
        Ok(self.repositories.lock().clone())
    }

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, RegistryError> {
        self.record("list_tags");
        let gate = self.tag_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(error) = self.tag_error.lock().clone() {
            return Err(error);
        }
        self.tags
            .lock()
            .get(repository)
            .map(|tags| tags.iter().map(|(tag, _)| tag.clone()).collect())
            .ok_or_else(|| RegistryError::NotFound(repository.to_string()))
    }

    async fn resolve(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<Descriptor, RegistryError> {
        self.record("resolve");
        self.lookup(repository, reference).map(|m| m.descriptor)
    }

    async fn fetch_manifest(
        &self,
        repository: &str,
        tag_or_digest: &str,
    ) -> Result<Manifest, RegistryError> {
        self.record("fetch_manifest");
        self.lookup(repository, tag_or_digest)
    }

    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<(), RegistryError> {
        self.record("delete_manifest");
        self.lookup(repository, digest)?;
        self.manifests.lock().remove(&digest.to_ascii_lowercase());
        self.deleted.lock().push(digest.to_string());
        Ok(())
    }

    async fn fetch_referrers(
        &self,
        _repository: &str,
        subject: &Descriptor,
    ) -> Result<Vec<ReferrerDescriptor>, RegistryError> {
        self.record("fetch_referrers");
        let key = subject.digest.to_ascii_lowercase();
        if self.failing_referrers.lock().contains(&key) {
            return Err(RegistryError::ServerError {
                status: 500,
                message: format!("referrers of {}", subject.digest),
            });
        }
        Ok(self.referrers.lock().get(&key).cloned().unwrap_or_default())
    }
}

/// Size analyzer that returns the same report for every manifest
#[derive(Debug, Clone)]
pub struct StaticSizeAnalyzer {
    result: Result<SizeReport, RegistryError>,
}

impl StaticSizeAnalyzer {
    pub fn new(total_size: u64) -> Self {
        Self {
            result: Ok(SizeReport {
                total_size,
                summary: format!("{total_size} B"),
                platforms: Vec::new(),
            }),
        }
    }

    pub fn failing(error: RegistryError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl SizeAnalyzer for StaticSizeAnalyzer {
    async fn analyze(
        &self,
        _repository: &str,
        _manifest: &Manifest,
    ) -> Result<SizeReport, RegistryError> {
        self.result.clone()
    }
}
