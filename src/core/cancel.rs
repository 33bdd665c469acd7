//! CW-015: Cooperative cancellation shared by the CLI and the orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};

/// Set once; observed between target stages.
#[derive(Debug, Default)]
pub struct CancellationSignal {
    cancelled: AtomicBool,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cw015_cancel_is_sticky() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
        signal.cancel();
        signal.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_cw015_visible_across_threads() {
        let signal = CancellationSignal::new();
        std::thread::scope(|s| {
            s.spawn(|| signal.cancel());
        });
        assert!(signal.is_cancelled());
    }
}
