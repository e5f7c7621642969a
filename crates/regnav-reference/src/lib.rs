//! regnav Reference Grammar
//!
//! Parses and composes the textual addresses a user types to navigate a
//! registry.
//!
//! # Grammar
//!
//! - `registry[:port]/repository/path:tag`
//! - `registry[:port]/repository/path@algorithm:hex`
//!
//! A digest reference wins over a tag reference: the text is split on the
//! first `@` before any colon is considered. The registry segment ends at the
//! first `/`, so a port colon never competes with the tag separator.
//!
//! # Example
//!
//! ```rust
//! use regnav_reference::ArtifactReference;
//!
//! let reference = ArtifactReference::parse("registry:5000/ns/repo:v1").unwrap();
//! assert_eq!(reference.registry(), "registry:5000");
//! assert_eq!(reference.repository(), "ns/repo");
//! assert_eq!(reference.tag_or_digest(), "v1");
//! assert!(!reference.is_digest());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod digest;
mod reference;

pub use digest::{digests_equal, is_digest_reference, normalize_digest, DIGEST_MARKERS};
pub use reference::{ArtifactReference, ReferenceError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
