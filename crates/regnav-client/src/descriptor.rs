//! Content descriptors exchanged with the registry client

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Digest, media type and size of a manifest or blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    /// Content digest (`algorithm:hex`)
    pub digest: String,
    /// Media type of the content
    pub media_type: String,
    /// Content length in bytes
    pub size: u64,
}

impl Descriptor {
    /// Create new descriptor
    #[inline]
    #[must_use]
    pub fn new(digest: impl Into<String>, media_type: impl Into<String>, size: u64) -> Self {
        Self {
            digest: digest.into(),
            media_type: media_type.into(),
            size,
        }
    }
}

/// A fetched manifest: its descriptor plus the raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Descriptor of the manifest itself
    pub descriptor: Descriptor,
    /// Raw manifest content
    pub content: Vec<u8>,
}

impl Manifest {
    /// Create new manifest
    #[inline]
    #[must_use]
    pub fn new(descriptor: Descriptor, content: impl Into<Vec<u8>>) -> Self {
        Self {
            descriptor,
            content: content.into(),
        }
    }

    /// Manifest digest
    #[inline]
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.descriptor.digest
    }

    /// Manifest media type
    #[inline]
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.descriptor.media_type
    }

    /// Manifest content as UTF-8 text, if it is valid UTF-8
    #[inline]
    #[must_use]
    pub fn content_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// An artifact that refers to another digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerDescriptor {
    /// Digest of the referrer manifest
    pub digest: String,
    /// Media type of the referrer manifest
    pub media_type: String,
    /// Declared artifact type (may be empty)
    #[serde(default)]
    pub artifact_type: String,
    /// Manifest annotations, ordered by key
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl ReferrerDescriptor {
    /// Create new referrer descriptor
    #[inline]
    #[must_use]
    pub fn new(digest: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            media_type: media_type.into(),
            artifact_type: String::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// With artifact type
    #[inline]
    #[must_use]
    pub fn with_artifact_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = artifact_type.into();
        self
    }

    /// With an annotation
    #[inline]
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Grouping key: the artifact type, or the media type when that is blank
    #[inline]
    #[must_use]
    pub fn group_key(&self) -> &str {
        if self.artifact_type.trim().is_empty() {
            &self.media_type
        } else {
            &self.artifact_type
        }
    }
}

/// Size of one platform entry of an image index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSize {
    /// Platform label, e.g. `linux/amd64`
    pub platform: String,
    /// Total bytes for this platform
    pub size: u64,
}

/// Output of a [`crate::SizeAnalyzer`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SizeReport {
    /// Total bytes across config and layers
    pub total_size: u64,
    /// Short human-readable summary
    pub summary: String,
    /// Per-platform breakdown (empty for single-platform manifests)
    pub platforms: Vec<PlatformSize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_key_falls_back_to_media_type() {
        let plain =
            ReferrerDescriptor::new("sha256:a", "application/vnd.oci.image.manifest.v1+json");
        assert_eq!(plain.group_key(), "application/vnd.oci.image.manifest.v1+json");

        let blank = plain.clone().with_artifact_type("   ");
        assert_eq!(blank.group_key(), "application/vnd.oci.image.manifest.v1+json");

        let typed = plain.with_artifact_type("application/vnd.dev.cosign");
        assert_eq!(typed.group_key(), "application/vnd.dev.cosign");
    }

    #[test]
    fn manifest_accessors() {
        let manifest = Manifest::new(Descriptor::new("sha256:abc", "application/json", 2), "{}");
        assert_eq!(manifest.digest(), "sha256:abc");
        assert_eq!(manifest.media_type(), "application/json");
        assert_eq!(manifest.content_text(), Some("{}"));
    }
}
