//! Referrer graph builder
//!
//! Walks the artifacts that refer to a digest (signatures, SBOMs,
//! attestations), then the artifacts that refer to those, and so on. Each
//! level is grouped by artifact type. Referrer graphs may contain cycles; a
//! digest is expanded at most once per build.

use crate::error::NavigationError;
use futures::future::BoxFuture;
use futures::FutureExt;
use regnav_client::{
    with_cancel, CancellationToken, ReferrerDescriptor, RegistryClient, RegistryError,
};
use regnav_reference::normalize_digest;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Label of the synthetic group holding a referrer's annotations
pub const ANNOTATIONS_LABEL: &str = "[annotations]";

/// Descriptor data attached to an artifact node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerInfo {
    /// Referrer manifest digest
    pub digest: String,
    /// Referrer manifest media type
    pub media_type: String,
    /// Declared artifact type, possibly empty
    pub artifact_type: String,
    /// Manifest annotations by key
    pub annotations: BTreeMap<String, String>,
}

impl From<&ReferrerDescriptor> for ReferrerInfo {
    fn from(descriptor: &ReferrerDescriptor) -> Self {
        Self {
            digest: descriptor.digest.clone(),
            media_type: descriptor.media_type.clone(),
            artifact_type: descriptor.artifact_type.clone(),
            annotations: descriptor.annotations.clone(),
        }
    }
}

/// One node of a referrer tree
///
/// Synthetic nodes (artifact-type groups, the annotations group and its
/// entries) have `is_group` set and no `info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerNode {
    /// Path-derived id, unique within one tree
    pub id: String,
    /// Text shown for the node
    pub display_label: String,
    /// Synthetic node without descriptor data
    pub is_group: bool,
    /// Descriptor data, `None` on synthetic nodes
    pub info: Option<ReferrerInfo>,
    /// Annotations group first, then artifact-type groups
    pub children: Vec<ReferrerNode>,
}

impl ReferrerNode {
    fn group(id: String, label: impl Into<String>, children: Vec<ReferrerNode>) -> Self {
        Self {
            id,
            display_label: label.into(),
            is_group: true,
            info: None,
            children,
        }
    }

    /// Artifact digest, `None` for synthetic nodes
    #[inline]
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.info.as_ref().map(|info| info.digest.as_str())
    }

    /// Depth-first iterator over this node and its descendants
    pub fn walk(&self) -> impl Iterator<Item = &ReferrerNode> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Shared counter of referrers discovered so far
#[derive(Debug, Default)]
pub struct ReferrerProgress {
    discovered: AtomicUsize,
}

impl ReferrerProgress {
    /// Create a zeroed counter
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Referrers discovered so far
    #[inline]
    #[must_use]
    pub fn discovered(&self) -> usize {
        self.discovered.load(Ordering::Relaxed)
    }

    fn add(&self, count: usize) {
        self.discovered.fetch_add(count, Ordering::Relaxed);
    }
}

/// Builds referrer trees through a [`RegistryClient`]
pub struct ReferrerGraphBuilder {
    client: Arc<dyn RegistryClient>,
    max_depth: Option<usize>,
}

/// State shared by every level of one build
struct Walk<'a> {
    repository: &'a str,
    progress: &'a ReferrerProgress,
    cancel: &'a CancellationToken,
}

impl ReferrerGraphBuilder {
    /// Create new builder without a depth limit
    #[must_use]
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self {
            client,
            max_depth: None,
        }
    }

    /// Stop expanding below `depth` levels of referrers
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Build the grouped referrer tree of `root_digest`
    ///
    /// Returns the top-level artifact-type groups. `progress` is bumped once
    /// per referrer listed. Fetch failures produce empty subtrees. A depth
    /// limit of zero yields an empty tree without calling the registry.
    ///
    /// # Errors
    /// Only [`NavigationError::Cancelled`].
    pub async fn build_referrer_tree(
        &self,
        repository: &str,
        root_digest: &str,
        progress: &ReferrerProgress,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReferrerNode>, NavigationError> {
        if self.max_depth == Some(0) {
            return Ok(Vec::new());
        }

        let walk = Walk {
            repository,
            progress,
            cancel,
        };
        let root = normalize_digest(root_digest);
        let mut visited = HashSet::from([root.clone()]);

        let tree = self
            .build_level(&walk, root_digest.trim().to_string(), root, 1, &mut visited)
            .await?;
        tracing::debug!(
            repository,
            root_digest,
            discovered = progress.discovered(),
            expanded = visited.len(),
            "referrer tree built"
        );
        Ok(tree)
    }

    fn build_level<'a>(
        &'a self,
        walk: &'a Walk<'a>,
        digest: String,
        parent_id: String,
        depth: usize,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Result<Vec<ReferrerNode>, NavigationError>> {
        async move {
            let referrers = self.fetch_direct(walk, &digest).await?;
            walk.progress.add(referrers.len());

            let mut groups: BTreeMap<(String, String), Vec<ReferrerDescriptor>> = BTreeMap::new();
            for referrer in referrers {
                let key = referrer.group_key().to_string();
                groups
                    .entry((key.to_lowercase(), key))
                    .or_default()
                    .push(referrer);
            }

            let expand = self.max_depth.map_or(true, |max| depth < max);
            let mut nodes = Vec::with_capacity(groups.len());
            for ((_, key), mut members) in groups {
                members.sort_by(|a, b| {
                    a.digest
                        .to_lowercase()
                        .cmp(&b.digest.to_lowercase())
                        .then_with(|| a.digest.cmp(&b.digest))
                });

                let group_id = format!("{parent_id}/{key}");
                let mut children = Vec::with_capacity(members.len());
                for member in members {
                    let node_id = format!("{group_id}/{}", normalize_digest(&member.digest));
                    let mut grandchildren = annotation_group(&node_id, &member);
                    // Inserted before recursing so a cycle back here stops.
                    if visited.insert(normalize_digest(&member.digest)) && expand {
                        let nested = self
                            .build_level(
                                walk,
                                member.digest.clone(),
                                node_id.clone(),
                                depth + 1,
                                visited,
                            )
                            .await?;
                        grandchildren.extend(nested);
                    }
                    children.push(ReferrerNode {
                        id: node_id,
                        display_label: member.digest.clone(),
                        is_group: false,
                        info: Some(ReferrerInfo::from(&member)),
                        children: grandchildren,
                    });
                }
                nodes.push(ReferrerNode::group(group_id, key, children));
            }
            Ok(nodes)
        }
        .boxed()
    }

    /// Referrers of one digest, without duplicates
    ///
    /// A failed fetch yields an empty list; only cancellation is an error.
    async fn fetch_direct(
        &self,
        walk: &Walk<'_>,
        digest: &str,
    ) -> Result<Vec<ReferrerDescriptor>, NavigationError> {
        let fetched = async {
            let subject = self.client.resolve(walk.repository, digest).await?;
            self.client.fetch_referrers(walk.repository, &subject).await
        };
        match with_cancel(walk.cancel, fetched).await {
            Ok(mut referrers) => {
                let mut seen = HashSet::new();
                referrers.retain(|r| seen.insert(normalize_digest(&r.digest)));
                Ok(referrers)
            }
            Err(RegistryError::Cancelled) => Err(NavigationError::Cancelled),
            Err(error) => {
                tracing::debug!(
                    repository = walk.repository,
                    digest,
                    %error,
                    "referrer fetch failed"
                );
                Ok(Vec::new())
            }
        }
    }
}

/// Leading `[annotations]` child of an artifact node, if it has any
fn annotation_group(node_id: &str, referrer: &ReferrerDescriptor) -> Vec<ReferrerNode> {
    if referrer.annotations.is_empty() {
        return Vec::new();
    }
    let group_id = format!("{node_id}/{ANNOTATIONS_LABEL}");
    let entries = referrer
        .annotations
        .iter()
        .map(|(key, value)| {
            ReferrerNode::group(
                format!("{group_id}/{key}"),
                format!("{key}: {value}"),
                Vec::new(),
            )
        })
        .collect();
    vec![ReferrerNode::group(group_id, ANNOTATIONS_LABEL, entries)]
}
