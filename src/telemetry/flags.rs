//! Atomic flags shared with side tasks
//!
//! Status-signaling tasks (e.g. a blink indicator while data is flowing)
//! run on their own scheduling lane and must never touch the transport or
//! the aggregation buffer. These flags are the only state they share with
//! the collector.

use core::sync::atomic::{AtomicBool, Ordering};

/// "Telemetry data is flowing" indicator flag
///
/// Written by the collector, read by indicator tasks.
#[derive(Debug)]
pub struct DataFlowFlag(AtomicBool);

impl DataFlowFlag {
    /// Create a flag, initially not flowing
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Update the flag
    pub fn set(&self, flowing: bool) {
        self.0.store(flowing, Ordering::Relaxed);
    }

    /// Whether data was flowing at the last collector pass
    pub fn is_flowing(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for DataFlowFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Graceful-shutdown request flag
///
/// Set from outside the collector loop; the loop finishes its current
/// pass, flushes the transport, and exits.
#[derive(Debug)]
pub struct StopFlag(AtomicBool);

impl StopFlag {
    /// Create a flag, initially not set
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Request shutdown
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether shutdown has been requested
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}
