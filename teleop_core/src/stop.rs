//! Cooperative stop request shared between a signal handler and the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once by an interrupt handler, observed by the control loop.
///
/// Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Safe to call from a signal handler thread.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let a = StopSignal::new();
        let b = a.clone();
        assert!(!b.is_triggered());
        a.trigger();
        assert!(b.is_triggered());
    }

    #[test]
    fn trigger_from_another_thread_is_seen() {
        let stop = StopSignal::new();
        let remote = stop.clone();
        std::thread::spawn(move || remote.trigger())
            .join()
            .expect("join");
        assert!(stop.is_triggered());
    }
}
