//! Network activity hook.

use std::sync::atomic::{AtomicBool, Ordering};

/// Receives `true` when a call starts and `false` when it completes.
pub trait ActivityIndicator: Send + Sync {
    fn set_active(&self, active: bool);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIndicator;

impl ActivityIndicator for NoopIndicator {
    fn set_active(&self, _active: bool) {}
}

/// Keeps the last reported state, for hosts that poll instead of listening.
#[derive(Debug, Default)]
pub struct ActivityFlag(AtomicBool);

impl ActivityFlag {
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl ActivityIndicator for ActivityFlag {
    fn set_active(&self, active: bool) {
        self.0.store(active, Ordering::SeqCst);
    }
}
