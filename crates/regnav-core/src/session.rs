//! Navigator session
//!
//! Wires store, broker, coordinator and referrer builder around one registry
//! client and runs the end-to-end load flow.

use crate::broker::{LoadIntent, LoadRequestBroker, LoadSource};
use crate::config::NavigatorConfig;
use crate::coordinator::{CoordinationOutcome, NavigationCoordinator, RegistryTagLoader, TagLoader};
use crate::error::NavigationError;
use crate::referrers::{ReferrerGraphBuilder, ReferrerNode, ReferrerProgress};
use regnav_client::{
    with_cancel, CancellationToken, OperationOutcome, RegistryClient, SizeAnalyzer,
};
use regnav_context::{ArtifactContextStore, Registry};
use regnav_reference::ArtifactReference;
use std::sync::Arc;

/// Result of [`NavigatorSession::load_reference`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The broker turned the request away
    Skipped,
    /// Manifest fetched and stored
    Loaded {
        /// Reference as loaded
        reference: String,
        /// Digest of the fetched manifest
        digest: String,
        /// What the coordinator did afterwards
        coordination: CoordinationOutcome,
    },
}

/// One user's navigation state against one registry client
pub struct NavigatorSession {
    config: NavigatorConfig,
    client: Arc<dyn RegistryClient>,
    store: Arc<ArtifactContextStore>,
    broker: LoadRequestBroker,
    coordinator: Arc<NavigationCoordinator>,
    referrers: ReferrerGraphBuilder,
}

impl NavigatorSession {
    /// Create new session without size analysis
    #[must_use]
    pub fn new(client: Arc<dyn RegistryClient>, config: NavigatorConfig) -> Self {
        Self::assemble(client, None, config)
    }

    /// Create new session that computes manifest sizes with `analyzer`
    #[must_use]
    pub fn with_size_analyzer(
        client: Arc<dyn RegistryClient>,
        analyzer: Arc<dyn SizeAnalyzer>,
        config: NavigatorConfig,
    ) -> Self {
        Self::assemble(client, Some(analyzer), config)
    }

    fn assemble(
        client: Arc<dyn RegistryClient>,
        analyzer: Option<Arc<dyn SizeAnalyzer>>,
        config: NavigatorConfig,
    ) -> Self {
        let capacity = config.event_capacity;
        let mut store = ArtifactContextStore::with_capacity(capacity);
        if let Some(analyzer) = analyzer {
            store = store.with_size_analyzer(analyzer);
        }
        let store = Arc::new(store);

        let tag_loader: Arc<dyn TagLoader> = Arc::new(
            RegistryTagLoader::new(Arc::clone(&client))
                .with_resolve_digests(config.resolve_tag_digests),
        );
        let coordinator = Arc::new(NavigationCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&client),
            tag_loader,
            capacity,
        ));
        let referrers = ReferrerGraphBuilder::new(Arc::clone(&client))
            .with_max_depth(config.max_referrer_depth);

        Self {
            broker: LoadRequestBroker::new(capacity),
            config,
            client,
            store,
            coordinator,
            referrers,
        }
    }

    /// Session configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Context store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<ArtifactContextStore> {
        &self.store
    }

    /// Load request broker
    #[inline]
    #[must_use]
    pub fn broker(&self) -> &LoadRequestBroker {
        &self.broker
    }

    /// Navigation coordinator
    #[inline]
    #[must_use]
    pub fn coordinator(&self) -> &Arc<NavigationCoordinator> {
        &self.coordinator
    }

    /// Connect to `registry`
    ///
    /// A different registry drops the current selection and re-arms the
    /// circuit breaker.
    pub fn connect(&self, registry: Registry) -> bool {
        let changed = self.store.set_registry(Some(registry));
        if changed {
            self.broker.clear_circuit_breaker();
        }
        changed
    }

    /// Load the manifest addressed by `text`
    ///
    /// Runs broker admission, parses, fetches the manifest, stores it,
    /// records completion and finally lets the coordinator align repository
    /// and tag selection. The coordinator result is reported, not raised,
    /// except for cancellation: a load cancelled while coordinating puts the
    /// previous manifest back and fails with [`NavigationError::Cancelled`].
    ///
    /// # Errors
    /// Parse failures, a missing or different registry, fetch failures and
    /// cancellation. A failed load re-arms the circuit breaker so the same
    /// reference can be retried.
    pub async fn load_reference(
        &self,
        text: &str,
        source: LoadSource,
        force_reload: bool,
        cancel: &CancellationToken,
    ) -> Result<LoadOutcome, NavigationError> {
        let text = text.trim();
        if !self.broker.try_request_load(text, source, force_reload) {
            return Ok(LoadOutcome::Skipped);
        }

        match self.load_admitted(text, source, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                tracing::debug!(reference = text, %error, "load failed, re-arming circuit breaker");
                self.broker.clear_circuit_breaker();
                Err(error)
            }
        }
    }

    async fn load_admitted(
        &self,
        text: &str,
        source: LoadSource,
        cancel: &CancellationToken,
    ) -> Result<LoadOutcome, NavigationError> {
        let parsed = ArtifactReference::parse(text)?;
        let registry = self.store.registry().ok_or(NavigationError::NoRegistry)?;
        if !registry.matches_host(parsed.registry()) {
            return Err(NavigationError::CrossRegistry {
                expected: registry.host().to_string(),
                actual: parsed.registry().to_string(),
            });
        }

        let manifest = with_cancel(
            cancel,
            self.client
                .fetch_manifest(parsed.repository(), parsed.tag_or_digest()),
        )
        .await?;
        let digest = manifest.digest().to_string();
        tracing::info!(reference = text, %digest, %source, "manifest loaded");

        let previous = self.store.snapshot().loaded_manifest().cloned();
        self.store.set_manifest(Some(manifest), parsed.repository()).await;
        if cancel.is_cancelled() {
            self.store.restore_manifest(previous);
            return Err(NavigationError::Cancelled);
        }
        self.broker.notify_load_completed(text, source);

        let coordination = self
            .coordinator
            .handle_load_completed(&LoadIntent::new(text, source), cancel)
            .await;
        if coordination == CoordinationOutcome::Aborted(NavigationError::Cancelled) {
            tracing::info!(reference = text, "coordination cancelled, restoring previous manifest");
            self.store.restore_manifest(previous);
            return Err(NavigationError::Cancelled);
        }

        Ok(LoadOutcome::Loaded {
            reference: text.to_string(),
            digest,
            coordination,
        })
    }

    /// Open the manifest of `digest` in the current repository
    ///
    /// # Errors
    /// [`NavigationError::NoRegistry`] or [`NavigationError::NoRepository`]
    /// when there is nothing to compose the reference from, otherwise as
    /// [`load_reference`](Self::load_reference).
    pub async fn request_digest_manifest(
        &self,
        digest: &str,
        cancel: &CancellationToken,
    ) -> Result<LoadOutcome, NavigationError> {
        let snapshot = self.store.snapshot();
        let registry = snapshot.registry().ok_or(NavigationError::NoRegistry)?;
        let repository = snapshot.repository().ok_or(NavigationError::NoRepository)?;
        let reference =
            ArtifactReference::with_digest(registry.host(), &repository.full_path, digest.trim());
        self.load_reference(&reference.to_string(), LoadSource::ReferenceBox, false, cancel)
            .await
    }

    /// Current selection as `registry/repository:tag`
    ///
    /// Uses the selected tag, or the reference text when it is a tag name.
    #[must_use]
    pub fn reference_with_tag(&self) -> Option<String> {
        let snapshot = self.store.snapshot();
        let registry = snapshot.registry()?;
        let repository = snapshot.repository()?;
        let tag = match snapshot.tag() {
            Some(tag) => tag.name.clone(),
            None if !snapshot.is_digest() && !snapshot.reference().is_empty() => {
                snapshot.reference().to_string()
            }
            None => return None,
        };
        Some(ArtifactReference::with_tag(registry.host(), &repository.full_path, tag).to_string())
    }

    /// Current selection as `registry/repository@digest`
    ///
    /// Uses the loaded manifest's digest, or the reference text when it is a
    /// digest.
    #[must_use]
    pub fn reference_with_digest(&self) -> Option<String> {
        let snapshot = self.store.snapshot();
        let registry = snapshot.registry()?;
        let repository = snapshot.repository()?;
        let digest = match snapshot.manifest() {
            Some(manifest) => manifest.digest().to_string(),
            None if snapshot.is_digest() => snapshot.reference().to_string(),
            None => return None,
        };
        Some(
            ArtifactReference::with_digest(registry.host(), &repository.full_path, digest)
                .to_string(),
        )
    }

    /// Referrer tree of the loaded manifest
    ///
    /// Empty when no manifest is loaded.
    ///
    /// # Errors
    /// [`NavigationError::NoRepository`] without a selected repository, or
    /// [`NavigationError::Cancelled`].
    pub async fn referrer_tree(
        &self,
        progress: &ReferrerProgress,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReferrerNode>, NavigationError> {
        let snapshot = self.store.snapshot();
        let repository = snapshot.repository().ok_or(NavigationError::NoRepository)?;
        let Some(manifest) = snapshot.manifest() else {
            return Ok(Vec::new());
        };
        self.referrers
            .build_referrer_tree(&repository.full_path, manifest.digest(), progress, cancel)
            .await
    }

    /// Delete the loaded manifest from the registry
    ///
    /// On success the circuit breaker is re-armed so the reference can be
    /// loaded again.
    pub async fn delete_current_manifest(&self, cancel: &CancellationToken) -> OperationOutcome {
        let outcome = self
            .store
            .delete_current_manifest(self.client.as_ref(), cancel)
            .await;
        if outcome.success {
            self.broker.clear_circuit_breaker();
        }
        outcome
    }
}
