//! Digest helpers
//!
//! Digests are compared case-insensitively everywhere in regnav: registries
//! are free to echo the hex part in either case.

/// Substrings that mark a reference as digest-addressed
pub const DIGEST_MARKERS: [&str; 2] = ["@sha256:", "@sha512:"];

/// Check whether a free-form reference addresses a digest
///
/// This is a cheap substring test used where a full parse is not wanted
/// (e.g. when recording a load intent).
#[inline]
#[must_use]
pub fn is_digest_reference(reference: &str) -> bool {
    DIGEST_MARKERS
        .iter()
        .any(|marker| reference.contains(marker))
}

/// Compare two digests ignoring ASCII case
#[inline]
#[must_use]
pub fn digests_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Canonical form used as a set key for digests
#[inline]
#[must_use]
pub fn normalize_digest(digest: &str) -> String {
    digest.trim().to_ascii_lowercase()
}
