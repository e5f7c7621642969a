//! Single-flight token
//!
//! At most one holder at a time. Acquisition never waits: a second caller is
//! turned away, which is how overlapping coordinations get dropped.

use std::sync::atomic::{AtomicBool, Ordering};

/// Non-blocking exclusive token
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

impl SingleFlight {
    /// Create an idle token
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the token if it is idle
    ///
    /// The returned guard releases it on drop, including on panic or when the
    /// owning future is dropped mid-await.
    #[must_use]
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flight: self })
    }

    /// Whether a holder exists
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the [`SingleFlight`] when dropped
#[derive(Debug)]
pub struct FlightGuard<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.busy.store(false, Ordering::Release);
    }
}
