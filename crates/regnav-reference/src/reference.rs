//! Structured registry references
//!
//! Provides [`ArtifactReference`] for addressing a manifest by tag or digest.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A parsed `registry/repository:tag` or `registry/repository@digest` address
///
/// # Examples
/// - `registry:5000/repo:tag` → registry `registry:5000`, repository `repo`, tag `tag`
/// - `registry/ns/repo@sha256:...` → registry `registry`, repository `ns/repo`,
///   digest `sha256:...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactReference {
    registry: String,
    repository: String,
    tag_or_digest: String,
    is_digest: bool,
}

impl ArtifactReference {
    /// Parse a free-form reference
    ///
    /// Leading and trailing whitespace is ignored.
    ///
    /// # Errors
    /// - `ReferenceError::Empty` for blank input
    /// - `ReferenceError::MissingRepository` when there is no `/` after the registry
    /// - `ReferenceError::MissingTag` when neither `@` nor a trailing `:tag` is present
    /// - `ReferenceError::MissingDigest` for `...@` with nothing after it
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ReferenceError::Empty);
        }

        // Digest form takes precedence; the digest itself contains a colon.
        if let Some((location, digest)) = text.split_once('@') {
            if digest.is_empty() {
                return Err(ReferenceError::MissingDigest(text.to_string()));
            }
            let (registry, repository) = split_location(location, text)?;
            return Ok(Self {
                registry: registry.to_string(),
                repository: repository.to_string(),
                tag_or_digest: digest.to_string(),
                is_digest: true,
            });
        }

        let (registry, remainder) = split_location(text, text)?;

        // Any port colon lives in `registry`, so the last colon of the
        // remainder is the tag separator unless a slash follows it.
        let Some((repository, tag)) = remainder.rsplit_once(':') else {
            return Err(ReferenceError::MissingTag(text.to_string()));
        };
        if tag.is_empty() || tag.contains('/') {
            return Err(ReferenceError::MissingTag(text.to_string()));
        }
        if repository.is_empty() {
            return Err(ReferenceError::MissingRepository(text.to_string()));
        }

        Ok(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag_or_digest: tag.to_string(),
            is_digest: false,
        })
    }

    /// Compose a tag reference
    #[inline]
    #[must_use]
    pub fn with_tag(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            repository: repository.into(),
            tag_or_digest: tag.into(),
            is_digest: false,
        }
    }

    /// Compose a digest reference
    #[inline]
    #[must_use]
    pub fn with_digest(
        registry: impl Into<String>,
        repository: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            repository: repository.into(),
            tag_or_digest: digest.into(),
            is_digest: true,
        }
    }

    /// Registry host, including the port when one was given
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Repository path below the registry (may contain `/`)
    #[inline]
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Tag name or digest string, verbatim
    #[inline]
    #[must_use]
    pub fn tag_or_digest(&self) -> &str {
        &self.tag_or_digest
    }

    /// Tag name, if this is a tag reference
    #[inline]
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        (!self.is_digest).then_some(self.tag_or_digest.as_str())
    }

    /// Digest, if this is a digest reference
    #[inline]
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.is_digest.then_some(self.tag_or_digest.as_str())
    }

    /// Whether the reference addresses a digest
    #[inline]
    #[must_use]
    pub fn is_digest(&self) -> bool {
        self.is_digest
    }

    /// Last segment of the repository path
    #[inline]
    #[must_use]
    pub fn repository_name(&self) -> &str {
        self.repository
            .rsplit('/')
            .next()
            .unwrap_or(&self.repository)
    }

    /// Registry host without a port
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        self.registry
            .split_once(':')
            .map_or(self.registry.as_str(), |(host, _)| host)
    }
}

/// Split `registry/repository...` on the first slash
fn split_location<'a>(
    location: &'a str,
    original: &str,
) -> Result<(&'a str, &'a str), ReferenceError> {
    let Some((registry, repository)) = location.split_once('/') else {
        return Err(ReferenceError::MissingRepository(original.to_string()));
    };
    if registry.is_empty() {
        return Err(ReferenceError::MissingRegistry(original.to_string()));
    }
    if repository.is_empty() {
        return Err(ReferenceError::MissingRepository(original.to_string()));
    }
    Ok((registry, repository))
}

impl Display for ArtifactReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let separator = if self.is_digest { '@' } else { ':' };
        write!(
            f,
            "{}/{}{}{}",
            self.registry, self.repository, separator, self.tag_or_digest
        )
    }
}

impl FromStr for ArtifactReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors raised while parsing a reference
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// Blank input
    #[error("reference is empty")]
    Empty,

    /// Nothing before the first `/`
    #[error("reference '{0}' has no registry")]
    MissingRegistry(String),

    /// No `/` separating registry and repository, or an empty repository
    #[error("reference '{0}' has no repository (expected registry/repository)")]
    MissingRepository(String),

    /// No `@digest` and no trailing `:tag`
    #[error("reference '{0}' has neither a tag nor a digest")]
    MissingTag(String),

    /// `@` with nothing after it
    #[error("reference '{0}' has an empty digest")]
    MissingDigest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> ArtifactReference {
        ArtifactReference::parse(text).unwrap()
    }

    #[test]
    fn tag_reference_with_port() {
        let r = parsed("registry:5000/repo:tag");
        assert_eq!(r.registry(), "registry:5000");
        assert_eq!(r.repository(), "repo");
        assert_eq!(r.tag(), Some("tag"));
        assert!(!r.is_digest());
    }

    #[test]
    fn tag_reference_with_port_and_namespace() {
        let r = parsed("registry:5000/ns/repo:v1");
        assert_eq!(r.registry(), "registry:5000");
        assert_eq!(r.repository(), "ns/repo");
        assert_eq!(r.tag_or_digest(), "v1");
        assert_eq!(r.host(), "registry");
    }

    #[test]
    fn digest_reference_with_namespace() {
        let r = parsed("registry/ns/repo@sha256:0123abcd");
        assert_eq!(r.registry(), "registry");
        assert_eq!(r.repository(), "ns/repo");
        assert_eq!(r.digest(), Some("sha256:0123abcd"));
        assert!(r.is_digest());
        assert_eq!(r.tag(), None);
    }

    #[test]
    fn digest_reference_with_port() {
        let r = parsed("localhost:5000/app@sha512:ff");
        assert_eq!(r.registry(), "localhost:5000");
        assert_eq!(r.repository(), "app");
        assert_eq!(r.tag_or_digest(), "sha512:ff");
    }

    #[test]
    fn digest_split_on_first_at() {
        let r = parsed("ghcr.io/org/app@sha256:ab@cd");
        assert_eq!(r.repository(), "org/app");
        assert_eq!(r.tag_or_digest(), "sha256:ab@cd");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let r = parsed("  ghcr.io/org/app:latest \n");
        assert_eq!(r.registry(), "ghcr.io");
        assert_eq!(r.tag(), Some("latest"));
    }

    #[test]
    fn bare_repository_fails() {
        assert_eq!(
            ArtifactReference::parse("registry/repo"),
            Err(ReferenceError::MissingTag("registry/repo".into()))
        );
    }

    #[test]
    fn port_without_tag_fails() {
        assert!(matches!(
            ArtifactReference::parse("registry:5000/repo"),
            Err(ReferenceError::MissingTag(_))
        ));
    }

    #[test]
    fn colon_followed_by_slash_is_not_a_tag() {
        assert!(matches!(
            ArtifactReference::parse("registry/ns:odd/repo"),
            Err(ReferenceError::MissingTag(_))
        ));
    }

    #[test]
    fn digest_without_slash_fails() {
        assert!(matches!(
            ArtifactReference::parse("repo@sha256:abcd"),
            Err(ReferenceError::MissingRepository(_))
        ));
    }

    #[test]
    fn host_only_fails() {
        assert!(matches!(
            ArtifactReference::parse("localhost:5000"),
            Err(ReferenceError::MissingRepository(_))
        ));
    }

    #[test]
    fn empty_parts_fail() {
        assert_eq!(ArtifactReference::parse("   "), Err(ReferenceError::Empty));
        assert!(matches!(
            ArtifactReference::parse("/repo:tag"),
            Err(ReferenceError::MissingRegistry(_))
        ));
        assert!(matches!(
            ArtifactReference::parse("registry/:tag"),
            Err(ReferenceError::MissingRepository(_))
        ));
        assert!(matches!(
            ArtifactReference::parse("registry/repo:"),
            Err(ReferenceError::MissingTag(_))
        ));
        assert!(matches!(
            ArtifactReference::parse("registry/repo@"),
            Err(ReferenceError::MissingDigest(_))
        ));
    }

    #[test]
    fn display_composes_canonical_text() {
        let tag = ArtifactReference::with_tag("registry:5000", "ns/repo", "v1");
        assert_eq!(tag.to_string(), "registry:5000/ns/repo:v1");

        let digest = ArtifactReference::with_digest("ghcr.io", "org/app", "sha256:abcd");
        assert_eq!(digest.to_string(), "ghcr.io/org/app@sha256:abcd");
    }

    #[test]
    fn from_str_delegates_to_parse() {
        let r: ArtifactReference = "ghcr.io/org/app:1.0".parse().unwrap();
        assert_eq!(r.repository_name(), "app");
    }
}
