//! Navigation coordinator
//!
//! After a reference typed by the user has been loaded, the rest of the UI has
//! to catch up: the repository must be selected (and may need to be found or
//! synthesized), its tags listed, and the right tag or digest highlighted.
//! The coordinator runs that sequence for one load at a time:
//!
//! ```text
//! Idle ──LoadCompleted(ReferenceBox)──▶ Coordinating ──done/abort──▶ Idle
//!                                            │
//!                     LoadCompleted ─────────┘ dropped, not queued
//! ```

use crate::broker::{BrokerEvent, LoadIntent, LoadSource};
use crate::error::NavigationError;
use crate::flight::SingleFlight;
use async_trait::async_trait;
use futures::future::join_all;
use regnav_client::{with_cancel, CancellationToken, RegistryClient, RegistryError};
use regnav_context::{ArtifactContextStore, Repository, RepositoryTree, Tag};
use regnav_reference::{digests_equal, ArtifactReference};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Requests the coordinator sends to the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// Select this repository in the repository list
    RepositorySelectionRequested(Repository),
    /// Tag list of `repository` was (re)loaded
    TagsLoaded {
        /// Full path of the repository
        repository: String,
        /// Tags in registry order
        tags: Vec<Tag>,
    },
    /// Highlight this tag
    TagSelectionRequested(Tag),
    /// Show this digest, highlighting `matching_tag` when one points at it
    DigestSelectionRequested {
        /// Resolved manifest digest
        digest: String,
        /// First tag whose digest matches
        matching_tag: Option<Tag>,
    },
}

/// How a load-completed signal was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinationOutcome {
    /// Source needs no coordination
    Ignored,
    /// Another coordination was in flight
    Dropped,
    /// Sequence stopped early; steps already committed stay committed
    Aborted(NavigationError),
    /// All steps ran
    Completed,
}

impl CoordinationOutcome {
    /// Check for a full run
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Loads the tags of a repository
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagLoader: Send + Sync {
    /// Tags of `repository` in registry order
    async fn load_tags(&self, repository: &str) -> Result<Vec<Tag>, RegistryError>;
}

/// [`TagLoader`] backed by a [`RegistryClient`]
///
/// Lists tag names, then resolves each tag's digest. A tag whose digest cannot
/// be resolved is still listed, without a digest.
pub struct RegistryTagLoader {
    client: Arc<dyn RegistryClient>,
    resolve_digests: bool,
}

impl RegistryTagLoader {
    /// Create new loader that resolves digests
    #[must_use]
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self {
            client,
            resolve_digests: true,
        }
    }

    /// Switch digest resolution on or off
    #[inline]
    #[must_use]
    pub fn with_resolve_digests(mut self, resolve: bool) -> Self {
        self.resolve_digests = resolve;
        self
    }
}

#[async_trait]
impl TagLoader for RegistryTagLoader {
    async fn load_tags(&self, repository: &str) -> Result<Vec<Tag>, RegistryError> {
        let names = self.client.list_tags(repository).await?;
        if !self.resolve_digests {
            return Ok(names
                .into_iter()
                .map(|name| Tag::new(name, repository))
                .collect());
        }

        let client = &self.client;
        let tags = join_all(names.into_iter().map(|name| async move {
            let tag = Tag::new(name, repository);
            match client.resolve(repository, &tag.name).await {
                Ok(descriptor) => tag.with_digest(descriptor.digest),
                Err(error) => {
                    tracing::debug!(repository, tag = %tag.name, %error, "tag digest unresolved");
                    tag
                }
            }
        }))
        .await;
        Ok(tags)
    }
}

/// First tag whose resolved digest equals `digest`, ignoring case
#[must_use]
pub fn find_tag_for_digest<'a>(tags: &'a [Tag], digest: &str) -> Option<&'a Tag> {
    tags.iter().find(|tag| {
        tag.digest
            .as_deref()
            .is_some_and(|candidate| digests_equal(candidate, digest))
    })
}

/// Brings repository and tag selection in line with a loaded reference
pub struct NavigationCoordinator {
    store: Arc<ArtifactContextStore>,
    client: Arc<dyn RegistryClient>,
    tag_loader: Arc<dyn TagLoader>,
    flight: SingleFlight,
    events: broadcast::Sender<NavigationEvent>,
}

impl NavigationCoordinator {
    /// Create new coordinator
    #[must_use]
    pub fn new(
        store: Arc<ArtifactContextStore>,
        client: Arc<dyn RegistryClient>,
        tag_loader: Arc<dyn TagLoader>,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            store,
            client,
            tag_loader,
            flight: SingleFlight::new(),
            events,
        }
    }

    /// Subscribe to navigation requests
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.events.subscribe()
    }

    /// Whether a coordination is running
    #[inline]
    #[must_use]
    pub fn is_coordinating(&self) -> bool {
        self.flight.is_busy()
    }

    /// React to a completed load
    ///
    /// Only free-text loads are coordinated. A signal that arrives while a
    /// coordination is running is dropped.
    pub async fn handle_load_completed(
        &self,
        intent: &LoadIntent,
        cancel: &CancellationToken,
    ) -> CoordinationOutcome {
        if intent.source != LoadSource::ReferenceBox {
            return CoordinationOutcome::Ignored;
        }
        let Some(_guard) = self.flight.try_acquire() else {
            tracing::debug!(
                reference = %intent.reference,
                "coordination in progress, dropping load signal"
            );
            return CoordinationOutcome::Dropped;
        };

        match self.coordinate(&intent.reference, cancel).await {
            Ok(()) => {
                tracing::debug!(reference = %intent.reference, "coordination completed");
                CoordinationOutcome::Completed
            }
            Err(NavigationError::Cancelled) => {
                tracing::info!(reference = %intent.reference, "coordination cancelled");
                CoordinationOutcome::Aborted(NavigationError::Cancelled)
            }
            Err(error) => {
                tracing::warn!(reference = %intent.reference, %error, "coordination aborted");
                CoordinationOutcome::Aborted(error)
            }
        }
    }

    /// Coordinate every `LoadCompleted` published on `rx`
    ///
    /// Each signal gets its own task so that overlapping ones reach the
    /// single-flight check and are dropped rather than queued behind the
    /// running one. Stops when `cancel` fires or the broker goes away.
    pub fn spawn_listener(
        self: Arc<Self>,
        mut rx: broadcast::Receiver<BrokerEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    () = cancel.cancelled() => break,
                    event = rx.recv() => event,
                };
                match event {
                    Ok(BrokerEvent::LoadCompleted(intent)) => {
                        let coordinator = Arc::clone(&self);
                        let token = cancel.child_token();
                        tokio::spawn(async move {
                            coordinator.handle_load_completed(&intent, &token).await;
                        });
                    }
                    Ok(BrokerEvent::LoadRequested(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "coordinator lagged behind broker events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn coordinate(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<(), NavigationError> {
        let parsed = ArtifactReference::parse(reference)?;

        let registry = self.store.registry().ok_or(NavigationError::NoRegistry)?;
        if !registry.matches_host(parsed.registry()) {
            return Err(NavigationError::CrossRegistry {
                expected: registry.host().to_string(),
                actual: parsed.registry().to_string(),
            });
        }

        // Everything cancellable happens before the first commit.
        let repository = self.ensure_repository(parsed.repository(), cancel).await?;
        let loaded = with_cancel(cancel, self.tag_loader.load_tags(&repository.full_path)).await;
        let tags = match loaded {
            Err(RegistryError::Cancelled) => return Err(NavigationError::Cancelled),
            other => other,
        };
        if cancel.is_cancelled() {
            return Err(NavigationError::Cancelled);
        }

        self.store.set_artifact_context_atomic(
            Some(registry),
            Some(repository.clone()),
            parsed.tag_or_digest(),
            parsed.is_digest(),
        );
        self.emit(NavigationEvent::RepositorySelectionRequested(repository.clone()));

        let tags = tags?;
        tracing::debug!(repository = %repository.full_path, count = tags.len(), "tags loaded");
        self.emit(NavigationEvent::TagsLoaded {
            repository: repository.full_path.clone(),
            tags: tags.clone(),
        });

        match parsed.digest() {
            None => {
                let name = parsed.tag_or_digest();
                let tag = tags
                    .iter()
                    .find(|tag| tag.name == name)
                    .cloned()
                    .unwrap_or_else(|| Tag::new(name, repository.full_path.as_str()));
                self.emit(NavigationEvent::TagSelectionRequested(tag));
            }
            Some(parsed_digest) => {
                let digest = self
                    .store
                    .manifest()
                    .map_or_else(|| parsed_digest.to_string(), |m| m.digest().to_string());
                let matching_tag = find_tag_for_digest(&tags, &digest).cloned();
                self.emit(NavigationEvent::DigestSelectionRequested {
                    digest,
                    matching_tag,
                });
            }
        }
        Ok(())
    }

    /// Find `path` in the registry, or stand in for it
    ///
    /// Fails only on cancellation.
    async fn ensure_repository(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Repository, NavigationError> {
        if let Some(current) = self.store.repository() {
            if current.full_path == path {
                return Ok(current);
            }
        }

        match with_cancel(cancel, self.client.list_repositories()).await {
            Ok(paths) => {
                let listed = paths.iter().any(|p| p.trim_matches('/') == path);
                let tree = RepositoryTree::from_paths(&paths);
                match tree.get(path).filter(|_| listed) {
                    Some(repository) => Ok(repository.clone()),
                    None => {
                        tracing::info!(
                            repository = path,
                            "repository not in catalog, using minimal entry"
                        );
                        Ok(Repository::minimal(path))
                    }
                }
            }
            Err(RegistryError::Cancelled) => Err(NavigationError::Cancelled),
            Err(error) if error.is_listing_unsupported() => {
                tracing::info!(
                    repository = path,
                    "catalog listing not supported, using minimal entry"
                );
                Ok(Repository::minimal(path))
            }
            Err(error) => {
                tracing::warn!(
                    repository = path,
                    %error,
                    "catalog listing failed, using minimal entry"
                );
                Ok(Repository::minimal(path))
            }
        }
    }

    fn emit(&self, event: NavigationEvent) {
        let _ = self.events.send(event);
    }
}
