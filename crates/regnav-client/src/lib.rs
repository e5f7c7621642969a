//! regnav Registry Client Contract
//!
//! The wire protocol (fetch/list/delete over HTTP) lives outside regnav. This
//! crate defines what the navigation layer needs from it:
//!
//! - [`RegistryClient`]: list, resolve, fetch, delete and referrer discovery
//! - [`SizeAnalyzer`]: size breakdown of a loaded manifest
//! - [`RegistryError`]: transport failures classified by status
//! - [`OperationOutcome`]: structured `(success, message)` result for display
//! - [`with_cancel`]: races a collaborator call against a cancellation token

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod cancel;
mod client;
mod descriptor;
mod error;
mod outcome;

pub use cancel::with_cancel;
pub use client::{RegistryClient, SizeAnalyzer};
#[cfg(any(test, feature = "mock"))]
pub use client::{MockRegistryClient, MockSizeAnalyzer};
pub use descriptor::{Descriptor, Manifest, PlatformSize, ReferrerDescriptor, SizeReport};
pub use error::RegistryError;
pub use outcome::OperationOutcome;

/// Re-exported so collaborators share one token type
pub use tokio_util::sync::CancellationToken;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
