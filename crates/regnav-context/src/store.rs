//! Artifact context store
//!
//! The single owner of the current (registry, repository, tag, reference,
//! manifest) tuple. Every mutation runs under one write lock and publishes its
//! notifications before the lock is released, so a subscriber can never
//! observe a half-applied update.

use crate::event::ContextEvent;
use crate::model::{
    ArtifactContext, ContextReference, LoadedManifest, Registry, RegistryAuth, Repository,
    RepositorySelection, SizeSummary, Tag,
};
use parking_lot::RwLock;
use regnav_client::{
    with_cancel, CancellationToken, Manifest, OperationOutcome, RegistryClient, SizeAnalyzer,
};
use regnav_reference::digests_equal;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default buffer of the notification channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Navigation fields compared before and after a mutation
#[derive(PartialEq)]
struct NavigationView {
    registry: Option<Registry>,
    repository: Option<Repository>,
    tag: Option<Tag>,
    reference: ContextReference,
    manifest: Option<Manifest>,
}

impl NavigationView {
    fn of(ctx: &ArtifactContext) -> Self {
        Self {
            registry: ctx.registry().cloned(),
            repository: ctx.repository().cloned(),
            tag: ctx.tag().cloned(),
            reference: ctx.context_reference(),
            manifest: ctx.manifest().cloned(),
        }
    }
}

/// Single source of truth for the navigation context
///
/// Share it as `Arc<ArtifactContextStore>`; readers take [`snapshot`](Self::snapshot)s
/// and writers go through the setters, which enforce:
/// - no repository ⇒ no tag and an empty reference
/// - a different registry clears the repository
/// - a different repository (by full path) clears tag and reference
/// - selecting a tag makes its name the reference
/// - assigning an unchanged value is a no-op without notification
pub struct ArtifactContextStore {
    state: RwLock<ArtifactContext>,
    events: broadcast::Sender<ContextEvent>,
    size_analyzer: Option<Arc<dyn SizeAnalyzer>>,
}

impl fmt::Debug for ArtifactContextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactContextStore")
            .field("state", &*self.state.read())
            .field("subscribers", &self.events.receiver_count())
            .field("size_analyzer", &self.size_analyzer.is_some())
            .finish()
    }
}

impl Default for ArtifactContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactContextStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty store with a specific notification buffer
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(ArtifactContext::default()),
            events,
            size_analyzer: None,
        }
    }

    /// Attach the collaborator that computes manifest sizes
    #[inline]
    #[must_use]
    pub fn with_size_analyzer(mut self, analyzer: Arc<dyn SizeAnalyzer>) -> Self {
        self.size_analyzer = Some(analyzer);
        self
    }

    /// Subscribe to change notifications
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.events.subscribe()
    }

    /// Consistent copy of the whole context
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> ArtifactContext {
        self.state.read().clone()
    }

    /// Connected registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> Option<Registry> {
        self.state.read().registry().cloned()
    }

    /// Selected repository
    #[inline]
    #[must_use]
    pub fn repository(&self) -> Option<Repository> {
        self.state.read().repository().cloned()
    }

    /// Selected tag
    #[inline]
    #[must_use]
    pub fn tag(&self) -> Option<Tag> {
        self.state.read().tag().cloned()
    }

    /// Current reference
    #[inline]
    #[must_use]
    pub fn reference(&self) -> ContextReference {
        self.state.read().context_reference()
    }

    /// Loaded manifest
    #[inline]
    #[must_use]
    pub fn manifest(&self) -> Option<Manifest> {
        self.state.read().manifest().cloned()
    }

    /// Connect, replace or disconnect the registry
    ///
    /// Any different value clears the repository, and with it tag and reference.
    pub fn set_registry(&self, registry: Option<Registry>) -> bool {
        self.apply(false, |ctx| {
            if ctx.registry != registry {
                ctx.registry = registry;
                ctx.selection = None;
            }
        })
    }

    /// Select or clear the repository
    ///
    /// Repositories are compared by full path; a different one clears tag and
    /// reference.
    pub fn set_repository(&self, repository: Option<Repository>) -> bool {
        self.apply(false, |ctx| {
            let unchanged = match (ctx.repository(), repository.as_ref()) {
                (Some(current), Some(new)) => current.same_path(new),
                (None, None) => true,
                _ => false,
            };
            if !unchanged {
                ctx.selection = repository.map(RepositorySelection::new);
            }
        })
    }

    /// Select or clear the tag
    ///
    /// Rejected (returns `false`) when no repository is selected.
    pub fn set_tag(&self, tag: Option<Tag>) -> bool {
        self.apply(false, |ctx| {
            let Some(selection) = ctx.selection.as_mut() else {
                if let Some(tag) = &tag {
                    tracing::warn!(tag = %tag.name, "ignoring tag selection without a repository");
                }
                return;
            };
            if selection.tag == tag {
                return;
            }
            match tag {
                Some(tag) => {
                    selection.reference = ContextReference::new(tag.name.clone(), false);
                    selection.tag = Some(tag);
                }
                None => {
                    selection.tag = None;
                    selection.reference = ContextReference::default();
                }
            }
        })
    }

    /// Set the reference text
    ///
    /// Rejected (returns `false`) when no repository is selected.
    pub fn set_reference(&self, value: impl Into<String>, is_digest: bool) -> bool {
        let value = value.into();
        self.apply(false, |ctx| {
            let Some(selection) = ctx.selection.as_mut() else {
                if !value.is_empty() {
                    tracing::warn!(reference = %value, "ignoring reference without a repository");
                }
                return;
            };
            let is_digest = is_digest && !value.is_empty();
            selection.reference = ContextReference::new(value, is_digest);
        })
    }

    /// Replace registry, repository and reference in one step
    ///
    /// All deltas are computed against the current state and applied together.
    /// One notification per changed field is published, followed by a single
    /// [`ContextEvent::ArtifactContextChanged`] carrying the complete new tuple.
    /// The selected tag survives only when the repository is unchanged and the
    /// new reference is that tag's name.
    pub fn set_artifact_context_atomic(
        &self,
        registry: Option<Registry>,
        repository: Option<Repository>,
        reference: &str,
        is_digest: bool,
    ) -> bool {
        self.apply(true, |ctx| {
            let registry_changed = ctx.registry != registry;
            let keep_selection = !registry_changed
                && matches!(
                    (ctx.repository(), repository.as_ref()),
                    (Some(current), Some(new)) if current.same_path(new)
                );

            ctx.registry = registry;
            let selection = repository.map(|repository| {
                let mut selection = match ctx.selection.take() {
                    Some(current) if keep_selection => current,
                    _ => RepositorySelection::new(repository),
                };
                let reference =
                    ContextReference::new(reference, is_digest && !reference.is_empty());
                if selection
                    .tag
                    .as_ref()
                    .is_some_and(|tag| reference.is_digest || tag.name != reference.value)
                {
                    selection.tag = None;
                }
                selection.reference = reference;
                selection
            });
            ctx.selection = selection;
        })
    }

    /// Load, replace or clear the manifest
    ///
    /// `repository_path` is recorded as the manifest's origin. When both the
    /// manifest and `repository_path` are present and a size analyzer is
    /// attached, the size summary is computed afterwards. A failed analysis
    /// leaves [`SizeSummary::Error`] in place of stale figures; a result for a
    /// manifest that has since been replaced is dropped.
    pub async fn set_manifest(&self, manifest: Option<Manifest>, repository_path: &str) -> bool {
        let repository_path = repository_path.trim().trim_matches('/');
        let analyzer = self
            .size_analyzer
            .as_ref()
            .filter(|_| manifest.is_some() && !repository_path.is_empty());

        {
            let mut state = self.state.write();
            let current = state
                .manifest
                .as_ref()
                .map(|loaded| (&loaded.manifest, loaded.repository.as_str()));
            if current == manifest.as_ref().map(|m| (m, repository_path)) {
                return false;
            }
            let size = if analyzer.is_some() {
                SizeSummary::Pending
            } else {
                SizeSummary::NotComputed
            };
            state.manifest = manifest.clone().map(|manifest| LoadedManifest {
                manifest,
                repository: repository_path.to_string(),
                size,
            });
            self.emit(ContextEvent::ManifestChanged(manifest.clone()));
        }

        if let (Some(analyzer), Some(manifest)) = (analyzer, manifest) {
            self.refresh_size(&**analyzer, repository_path, manifest)
                .await;
        }
        true
    }

    async fn refresh_size(
        &self,
        analyzer: &dyn SizeAnalyzer,
        repository: &str,
        manifest: Manifest,
    ) {
        let summary = match analyzer.analyze(repository, &manifest).await {
            Ok(report) => SizeSummary::Computed(report),
            Err(error) => {
                tracing::warn!(%error, digest = manifest.digest(), "size analysis failed");
                SizeSummary::Error(error.user_message())
            }
        };

        let mut state = self.state.write();
        match state.manifest.as_mut() {
            Some(loaded) if digests_equal(loaded.manifest.digest(), manifest.digest()) => {
                loaded.size = summary.clone();
                self.emit(ContextEvent::SizeSummaryChanged(summary));
            }
            _ => tracing::debug!(
                digest = manifest.digest(),
                "discarding size analysis for a manifest that is no longer loaded"
            ),
        }
    }

    /// Put back a manifest taken from an earlier snapshot
    ///
    /// Size data is restored as it was; no analysis is started.
    pub fn restore_manifest(&self, previous: Option<LoadedManifest>) -> bool {
        let mut state = self.state.write();
        if state.manifest == previous {
            return false;
        }
        let manifest = previous.as_ref().map(|loaded| loaded.manifest.clone());
        state.manifest = previous;
        self.emit(ContextEvent::ManifestChanged(manifest));
        true
    }

    /// Reset everything
    pub fn clear(&self) -> bool {
        self.apply(false, |ctx| {
            ctx.registry = None;
            ctx.selection = None;
            ctx.manifest = None;
        })
    }

    /// Drop the credentials of the connected registry
    ///
    /// Idempotent. Repository, tag and reference are kept.
    pub fn clear_auth(&self) -> bool {
        let mut connected = true;
        let changed = self.apply(false, |ctx| match ctx.registry.as_mut() {
            Some(registry) => registry.auth = RegistryAuth::Anonymous,
            None => connected = false,
        });
        if !connected {
            tracing::warn!("clear_auth called without a connected registry");
        }
        changed
    }

    /// Delete the loaded manifest from the registry
    ///
    /// Requires a manifest, a repository and a registry, checked in that
    /// order without calling `client`, and refuses a manifest that was
    /// fetched from a repository other than the selected one. On success the
    /// manifest is cleared from the context; on failure the context is left
    /// untouched.
    pub async fn delete_current_manifest(
        &self,
        client: &dyn RegistryClient,
        cancel: &CancellationToken,
    ) -> OperationOutcome {
        let snapshot = self.snapshot();
        let Some(loaded) = snapshot.loaded_manifest() else {
            return OperationOutcome::failed("No manifest loaded");
        };
        let Some(repository) = snapshot.repository() else {
            return OperationOutcome::failed("No repository selected");
        };
        if snapshot.registry().is_none() {
            return OperationOutcome::failed("No registry connected");
        }
        if loaded.repository != repository.full_path {
            tracing::warn!(
                selected = %repository.full_path,
                origin = %loaded.repository,
                "refusing to delete a manifest from another repository"
            );
            return OperationOutcome::failed("Loaded manifest belongs to another repository");
        }

        let digest = loaded.manifest.digest().to_string();
        match with_cancel(cancel, client.delete_manifest(&repository.full_path, &digest)).await {
            Ok(()) => {
                tracing::info!(repository = %repository.full_path, %digest, "manifest deleted");
                self.apply(false, |ctx| {
                    if ctx
                        .manifest()
                        .is_some_and(|m| digests_equal(m.digest(), &digest))
                    {
                        ctx.manifest = None;
                    }
                });
                OperationOutcome::succeeded(format!("Deleted manifest {digest}"))
            }
            Err(error) => {
                tracing::warn!(
                    repository = %repository.full_path,
                    %digest,
                    %error,
                    "manifest deletion failed"
                );
                OperationOutcome::from_error(&error)
            }
        }
    }

    /// Run `mutate` under the write lock and publish what changed
    fn apply(&self, combined: bool, mutate: impl FnOnce(&mut ArtifactContext)) -> bool {
        let mut state = self.state.write();
        let before = NavigationView::of(&state);
        mutate(&mut state);
        let after = NavigationView::of(&state);
        if before == after {
            return false;
        }

        if before.registry != after.registry {
            self.emit(ContextEvent::RegistryChanged(after.registry.clone()));
        }
        if before.repository != after.repository {
            self.emit(ContextEvent::RepositoryChanged(after.repository.clone()));
        }
        if before.tag != after.tag {
            self.emit(ContextEvent::TagChanged(after.tag.clone()));
        }
        if before.reference != after.reference {
            self.emit(ContextEvent::ReferenceChanged(after.reference.clone()));
        }
        if before.manifest != after.manifest {
            self.emit(ContextEvent::ManifestChanged(after.manifest.clone()));
        }
        if combined {
            self.emit(ContextEvent::ArtifactContextChanged(Box::new(state.clone())));
        }
        true
    }

    fn emit(&self, event: ContextEvent) {
        tracing::trace!(kind = event.kind(), "context event");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
