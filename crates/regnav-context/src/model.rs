//! Navigation model: registry, repository, tag, reference and manifest
//!
//! These are plain values. The store owns the current combination of them and
//! is the only place where they are combined and invalidated.

use regnav_client::{Manifest, SizeReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Credentials used to talk to a registry
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegistryAuth {
    /// No credentials
    #[default]
    Anonymous,
    /// Username and password
    Basic {
        /// Account name
        username: String,
        /// Account password
        password: String,
    },
    /// Bearer token
    Token {
        /// Token value
        token: String,
    },
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Token { .. } => f.debug_struct("Token").field("token", &"<redacted>").finish(),
        }
    }
}

/// A connected registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Registry URL as entered (scheme optional)
    pub url: String,
    /// Whether TLS is used
    pub is_secure: bool,
    /// Credentials
    pub auth: RegistryAuth,
}

impl Registry {
    /// Create a secure, anonymous registry handle
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_secure: true,
            auth: RegistryAuth::Anonymous,
        }
    }

    /// Mark as plain HTTP
    #[inline]
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.is_secure = false;
        self
    }

    /// With credentials
    #[inline]
    #[must_use]
    pub fn with_auth(mut self, auth: RegistryAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Host (and port) with scheme and trailing slashes removed
    #[must_use]
    pub fn host(&self) -> &str {
        let url = self.url.trim();
        let without_scheme = url
            .split_once("://")
            .map_or(url, |(_, rest)| rest);
        without_scheme.trim_end_matches('/')
    }

    /// Check whether a parsed reference registry addresses this registry
    #[inline]
    #[must_use]
    pub fn matches_host(&self, registry: &str) -> bool {
        self.host().eq_ignore_ascii_case(registry.trim().trim_end_matches('/'))
    }

    /// Check if no credentials are attached
    #[inline]
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self.auth, RegistryAuth::Anonymous)
    }
}

/// A repository within a registry
///
/// Tree links are stored as full paths so that a repository value carries no
/// references into other values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Last path segment
    pub name: String,
    /// Full path below the registry, e.g. `ns/app`
    pub full_path: String,
    /// Full path of the parent namespace
    pub parent: Option<String>,
    /// Full paths of child nodes
    pub children: Vec<String>,
    /// Whether this node has no children
    pub is_leaf: bool,
}

impl Repository {
    /// Stand-in built directly from a path
    ///
    /// Used when the registry refuses to list its catalog but still serves
    /// the repository itself.
    #[must_use]
    pub fn minimal(full_path: &str) -> Self {
        let full_path = full_path.trim_matches('/');
        let (parent, name) = match full_path.rsplit_once('/') {
            Some((parent, name)) => (Some(parent.to_string()), name),
            None => (None, full_path),
        };
        Self {
            name: name.to_string(),
            full_path: full_path.to_string(),
            parent,
            children: Vec::new(),
            is_leaf: true,
        }
    }

    /// Check identity (full path)
    #[inline]
    #[must_use]
    pub fn same_path(&self, other: &Self) -> bool {
        self.full_path == other.full_path
    }
}

/// Hierarchical view of a flat repository listing
///
/// Intermediate namespaces become non-leaf nodes; every node knows its parent
/// and children by full path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryTree {
    nodes: BTreeMap<String, Repository>,
}

impl RepositoryTree {
    /// Build from catalog paths
    #[must_use]
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut nodes: BTreeMap<String, Repository> = BTreeMap::new();

        for path in paths {
            let path = path.as_ref().trim_matches('/');
            if path.is_empty() {
                continue;
            }

            let mut current = String::new();
            let mut parent: Option<String> = None;
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                if !current.is_empty() {
                    current.push('/');
                }
                current.push_str(segment);

                nodes
                    .entry(current.clone())
                    .or_insert_with(|| Repository::minimal(&current));
                if let Some(parent_path) = &parent {
                    if let Some(parent_node) = nodes.get_mut(parent_path) {
                        if !parent_node.children.contains(&current) {
                            parent_node.children.push(current.clone());
                        }
                    }
                }
                parent = Some(current.clone());
            }
        }

        for node in nodes.values_mut() {
            node.children.sort();
            node.is_leaf = node.children.is_empty();
        }

        Self { nodes }
    }

    /// Look up a node by full path
    #[inline]
    #[must_use]
    pub fn get(&self, full_path: &str) -> Option<&Repository> {
        self.nodes.get(full_path.trim_matches('/'))
    }

    /// Top-level nodes
    #[must_use]
    pub fn roots(&self) -> Vec<&Repository> {
        self.nodes.values().filter(|r| r.parent.is_none()).collect()
    }

    /// Number of nodes, namespaces included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the listing was empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A tag in a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    pub name: String,
    /// Full path of the owning repository
    pub repository: String,
    /// Resolved manifest digest, when known
    pub digest: Option<String>,
}

impl Tag {
    /// Create new tag with unknown digest
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            digest: None,
        }
    }

    /// With resolved digest
    #[inline]
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }
}

/// Current textual reference: a tag name or a digest
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextReference {
    /// Tag name or digest string
    pub value: String,
    /// Whether `value` is a digest
    pub is_digest: bool,
}

impl ContextReference {
    /// Create new reference
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>, is_digest: bool) -> Self {
        Self {
            value: value.into(),
            is_digest,
        }
    }

    /// Check if no reference is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// State of the size computation for the loaded manifest
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeSummary {
    /// No analysis was requested
    #[default]
    NotComputed,
    /// Analysis is running
    Pending,
    /// Analysis finished
    Computed(SizeReport),
    /// Analysis failed; the message replaces any stale figures
    Error(String),
}

impl SizeSummary {
    /// Per-platform breakdown, empty unless computed
    #[must_use]
    pub fn platforms(&self) -> &[regnav_client::PlatformSize] {
        match self {
            Self::Computed(report) => &report.platforms,
            _ => &[],
        }
    }

    /// Check for the error marker
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// The loaded manifest plus derived size data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedManifest {
    /// Manifest as fetched
    pub manifest: Manifest,
    /// Repository path the manifest was fetched from
    pub repository: String,
    /// Size analysis state
    pub size: SizeSummary,
}

/// Repository plus everything that only makes sense inside it
///
/// Nesting tag and reference here means "no repository" cannot carry either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RepositorySelection {
    pub(crate) repository: Repository,
    pub(crate) tag: Option<Tag>,
    pub(crate) reference: ContextReference,
}

impl RepositorySelection {
    pub(crate) fn new(repository: Repository) -> Self {
        Self {
            repository,
            tag: None,
            reference: ContextReference::default(),
        }
    }
}

/// Immutable snapshot of the navigation context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactContext {
    pub(crate) registry: Option<Registry>,
    pub(crate) selection: Option<RepositorySelection>,
    pub(crate) manifest: Option<LoadedManifest>,
}

impl ArtifactContext {
    /// Connected registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    /// Selected repository
    #[inline]
    #[must_use]
    pub fn repository(&self) -> Option<&Repository> {
        self.selection.as_ref().map(|s| &s.repository)
    }

    /// Selected tag
    #[inline]
    #[must_use]
    pub fn tag(&self) -> Option<&Tag> {
        self.selection.as_ref().and_then(|s| s.tag.as_ref())
    }

    /// Current reference text (empty without a repository)
    #[inline]
    #[must_use]
    pub fn reference(&self) -> &str {
        self.selection
            .as_ref()
            .map_or("", |s| s.reference.value.as_str())
    }

    /// Whether the current reference is a digest
    #[inline]
    #[must_use]
    pub fn is_digest(&self) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|s| s.reference.is_digest)
    }

    /// Current reference as a value
    #[must_use]
    pub fn context_reference(&self) -> ContextReference {
        self.selection
            .as_ref()
            .map(|s| s.reference.clone())
            .unwrap_or_default()
    }

    /// Loaded manifest with size data
    #[inline]
    #[must_use]
    pub fn loaded_manifest(&self) -> Option<&LoadedManifest> {
        self.manifest.as_ref()
    }

    /// Loaded manifest
    #[inline]
    #[must_use]
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref().map(|m| &m.manifest)
    }

    /// Size analysis state of the loaded manifest
    #[must_use]
    pub fn size_summary(&self) -> SizeSummary {
        self.manifest
            .as_ref()
            .map(|m| m.size.clone())
            .unwrap_or_default()
    }
}
