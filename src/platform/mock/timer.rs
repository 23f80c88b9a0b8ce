//! Mock Timer implementation for testing

use crate::platform::{traits::TimerInterface, Result};

/// Mock Timer implementation
///
/// Uses simulated time: delays advance the clock instead of sleeping, so
/// timeout logic can be tested deterministically and instantly.
#[derive(Debug)]
pub struct MockTimer {
    now_us: u64,
}

impl MockTimer {
    /// Create a new mock timer starting at t=0
    pub fn new() -> Self {
        Self { now_us: 0 }
    }

    /// Advance simulated time (for test setup)
    pub fn advance_ms(&mut self, ms: u64) {
        self.now_us = self.now_us.wrapping_add(ms * 1000);
    }
}

impl Default for MockTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerInterface for MockTimer {
    fn delay_us(&mut self, us: u32) -> Result<()> {
        self.now_us = self.now_us.wrapping_add(us as u64);
        Ok(())
    }

    fn now_us(&self) -> u64 {
        self.now_us
    }
}
