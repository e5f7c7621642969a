//! regnav Core - navigation coordination for content registries
//!
//! The layer between a registry browser UI and its registry client:
//! - Admits or rejects manifest loads ([`LoadRequestBroker`])
//! - Aligns repository and tag selection with a typed reference
//!   ([`NavigationCoordinator`])
//! - Builds cycle-safe, grouped referrer trees ([`ReferrerGraphBuilder`])
//! - Ties them to one context store ([`NavigatorSession`])
//!
//! # Example
//!
//! ```rust,ignore
//! use regnav_core::prelude::*;
//!
//! # async fn example(
//! #     client: std::sync::Arc<dyn regnav_client::RegistryClient>,
//! # ) -> Result<(), NavigationError> {
//! let session = NavigatorSession::new(client, NavigatorConfig::new());
//! session.connect(Registry::new("ghcr.io"));
//!
//! let cancel = CancellationToken::new();
//! let outcome = session
//!     .load_reference("ghcr.io/org/app:v1", LoadSource::ReferenceBox, false, &cancel)
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod broker;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod flight;
pub mod referrers;
pub mod session;

pub use broker::{BrokerEvent, LoadIntent, LoadRequestBroker, LoadSource};
pub use config::NavigatorConfig;
pub use coordinator::{
    find_tag_for_digest, CoordinationOutcome, NavigationCoordinator, NavigationEvent,
    RegistryTagLoader, TagLoader,
};
pub use error::{ConfigError, NavigationError};
pub use flight::{FlightGuard, SingleFlight};
pub use referrers::{
    ReferrerGraphBuilder, ReferrerInfo, ReferrerNode, ReferrerProgress, ANNOTATIONS_LABEL,
};
pub use session::{LoadOutcome, NavigatorSession};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with regnav core
    pub use crate::{
        CoordinationOutcome, LoadOutcome, LoadSource, NavigationError, NavigationEvent,
        NavigatorConfig, NavigatorSession, ReferrerNode, ReferrerProgress,
    };
    pub use regnav_client::CancellationToken;
    pub use regnav_context::{ArtifactContextStore, ContextEvent, Registry};
    pub use regnav_reference::ArtifactReference;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
