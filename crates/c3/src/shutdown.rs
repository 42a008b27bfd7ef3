//! Cross-service shutdown signalling (§4.3, §11.4): the state service
//! requests a reset by recording its kind here; the main loop observes the
//! flag, stops every `ServiceRunner`, and decides what to do with the
//! requested kind (persist, clear the store, pick an exit code).

use c3_core::state::ResetKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    kind: Arc<Mutex<ResetKind>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            kind: Arc::new(Mutex::new(ResetKind::NoStop)),
        }
    }

    pub fn request(&self, kind: ResetKind) {
        *self.kind.lock().unwrap() = kind;
        self.requested.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    pub fn kind(&self) -> ResetKind {
        *self.kind.lock().unwrap()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}
