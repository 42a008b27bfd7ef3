//! Runs a `c3_core::Service` on its own OS thread (§5: "each service is a
//! cooperative loop running concurrently with the OS scheduler").
//!
//! `c3_core::Service` only describes one loop iteration; the start/stop/
//! is_running capability around it belongs to the binary, since only the
//! binary knows how services are laid out relative to each other and to the
//! watchdog-petter loop (§9 "Service capability" redesign direction).

use c3_core::log::{LogContext, LogMetadata};
use c3_core::Service;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct ServiceRunner {
    name: &'static str,
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ServiceRunner {
    /// Spawns `service`'s loop on a dedicated thread, running until `stop()`
    /// is called.
    pub fn start(mut service: Box<dyn Service + Send>) -> Self {
        let name = service.name();
        let stop = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let failed = Arc::new(AtomicBool::new(false));

        let stop_flag = stop.clone();
        let running_flag = running.clone();
        let failed_flag = failed.clone();

        let handle = thread::spawn(move || {
            let meta = LogContext { service: name, node: None }.meta();
            while !stop_flag.load(Ordering::Relaxed) {
                if let Err(e) = service.on_loop() {
                    log::error!("[{meta}] service loop iteration failed: {e}");
                    failed_flag.store(true, Ordering::Relaxed);
                }
                thread::sleep(service.poll_interval());
            }
            running_flag.store(false, Ordering::Relaxed);
        });

        Self { name, stop, running, failed, handle: Some(handle) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the loop thread is still scheduled to run (false once `stop`
    /// has been called and the thread has observed it).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Whether `on_loop` has ever returned an error (sticky). Used by the
    /// watchdog-petter to decide whether flight-mode cadence throttling
    /// should be suppressed (§10.5).
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    /// Signals the loop to stop and blocks until the thread exits.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for ServiceRunner {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
