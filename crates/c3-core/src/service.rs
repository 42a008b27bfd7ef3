//! The `Service` capability shared by every long-running task (§5):
//! state, beacon, node manager, EDL, radios. Each is a cooperative loop with
//! explicit sleeps running concurrently with the OS scheduler rather than a
//! single shared scheduler tick, so the trait only needs to describe one
//! iteration of that loop plus how long to wait before the next one.

use std::time::Duration;

/// One cooperatively-scheduled long-running task.
pub trait Service {
    /// Human-readable name, used in log context and the node manager's
    /// per-node heartbeat bookkeeping.
    fn name(&self) -> &'static str;

    /// Runs one iteration of the service's loop body. Implementations should
    /// not block longer than necessary — any waiting belongs in
    /// `poll_interval`, not inside `on_loop`.
    fn on_loop(&mut self) -> Result<(), crate::error::C3Error>;

    /// How long to sleep before the next `on_loop` call. Services that are
    /// event-driven (e.g. EDL, woken by datagram arrival) return a short idle
    /// poll interval instead of a fixed tick period.
    fn poll_interval(&self) -> Duration;
}
