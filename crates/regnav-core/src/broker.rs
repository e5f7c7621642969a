//! Load request broker
//!
//! Admits or rejects manifest load requests. A reference that was just loaded
//! is not loaded again unless the caller forces it (the circuit breaker),
//! which stops selection feedback loops between UI and coordinator.

use parking_lot::Mutex;
use regnav_reference::is_digest_reference;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Where a load request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadSource {
    /// A tag was picked from the tag list
    #[default]
    TagSelection,
    /// Free text typed into the reference box
    ReferenceBox,
    /// Back/forward navigation
    History,
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TagSelection => "tag-selection",
            Self::ReferenceBox => "reference-box",
            Self::History => "history",
        })
    }
}

/// A reference to load and the source that asked for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadIntent {
    /// Full reference text
    pub reference: String,
    /// Origin of the request
    pub source: LoadSource,
}

impl LoadIntent {
    /// Create new intent
    #[inline]
    #[must_use]
    pub fn new(reference: impl Into<String>, source: LoadSource) -> Self {
        Self {
            reference: reference.into(),
            source,
        }
    }
}

/// Broker notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// A load was admitted
    LoadRequested(LoadIntent),
    /// A load finished
    LoadCompleted(LoadIntent),
}

#[derive(Debug, Default)]
struct BrokerState {
    last_loaded_reference: String,
    current_source: LoadSource,
    current_reference_is_digest: bool,
}

/// Gatekeeper for manifest loads
#[derive(Debug)]
pub struct LoadRequestBroker {
    state: Mutex<BrokerState>,
    events: broadcast::Sender<BrokerEvent>,
}

impl Default for LoadRequestBroker {
    fn default() -> Self {
        Self::new(regnav_context::DEFAULT_EVENT_CAPACITY)
    }
}

impl LoadRequestBroker {
    /// Create new broker
    #[must_use]
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            state: Mutex::new(BrokerState::default()),
            events,
        }
    }

    /// Subscribe to broker notifications
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BrokerEvent> {
        self.events.subscribe()
    }

    /// Ask to load `reference`
    ///
    /// Returns `false` without notifying when the reference is blank, or when
    /// it equals the last admitted or completed load and `force_reload` is not
    /// set. An admitted reference is recorded immediately, so an echo of the
    /// same request arriving before completion is turned away.
    pub fn try_request_load(
        &self,
        reference: &str,
        source: LoadSource,
        force_reload: bool,
    ) -> bool {
        if reference.trim().is_empty() {
            tracing::debug!(%source, "ignoring blank load request");
            return false;
        }

        let mut state = self.state.lock();
        if !force_reload && state.last_loaded_reference == reference {
            tracing::debug!(reference, %source, "circuit breaker: reference already loaded");
            return false;
        }

        state.last_loaded_reference = reference.to_string();
        state.current_source = source;
        state.current_reference_is_digest = is_digest_reference(reference);
        tracing::debug!(reference, %source, force_reload, "load requested");
        let _ = self
            .events
            .send(BrokerEvent::LoadRequested(LoadIntent::new(reference, source)));
        true
    }

    /// Record a finished load and notify subscribers
    pub fn notify_load_completed(&self, reference: &str, source: LoadSource) {
        let mut state = self.state.lock();
        state.last_loaded_reference = reference.to_string();
        state.current_source = source;
        state.current_reference_is_digest = is_digest_reference(reference);
        tracing::debug!(reference, %source, "load completed");
        let _ = self
            .events
            .send(BrokerEvent::LoadCompleted(LoadIntent::new(reference, source)));
    }

    /// Whether the UI should keep its hands off the tag list
    ///
    /// True after history navigation and for digest references, where picking
    /// a tag would trigger another load.
    #[must_use]
    pub fn should_suppress_tag_auto_selection(&self) -> bool {
        let state = self.state.lock();
        state.current_source == LoadSource::History || state.current_reference_is_digest
    }

    /// Allow the last loaded reference to be requested again
    pub fn clear_circuit_breaker(&self) {
        self.state.lock().last_loaded_reference.clear();
    }

    /// Reference of the last admitted or completed load
    #[must_use]
    pub fn last_loaded_reference(&self) -> String {
        self.state.lock().last_loaded_reference.clone()
    }

    /// Source of the most recent request or completion
    #[must_use]
    pub fn current_source(&self) -> LoadSource {
        self.state.lock().current_source
    }

    /// Whether the most recent reference was a digest
    #[must_use]
    pub fn current_reference_is_digest(&self) -> bool {
        self.state.lock().current_reference_is_digest
    }
}
