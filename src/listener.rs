//! Observer the simulator notifies when the layout changed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Weak;

/// Receives a notification after every tick that moved nodes.
///
/// Called from the tick thread. Implementations must return quickly and must
/// not call back into the simulation while blocking, e.g. set a flag or send
/// on a channel and let the render loop pick it up.
pub trait SimulationListener: Send + Sync {
    fn redraw_requested(&self);
}

/// A listener that records pending redraws for a polling render loop.
#[derive(Debug, Default)]
pub struct RedrawFlag {
    pending: AtomicBool,
    requests: AtomicUsize,
}

impl RedrawFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a redraw was requested since the last call and clears
    /// the request.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Total number of redraws requested so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Acquire)
    }
}

impl SimulationListener for RedrawFlag {
    fn redraw_requested(&self) {
        self.requests.fetch_add(1, Ordering::AcqRel);
        self.pending.store(true, Ordering::Release);
    }
}

/// A listener handle that never delivers anything.
pub fn detached() -> Weak<dyn SimulationListener> {
    Weak::<RedrawFlag>::new()
}
