//! Platform abstraction layer
//!
//! This module provides hardware abstraction for the serial transport and
//! monotonic time source. All platform-specific code must be isolated to
//! implementations of these traits.

pub mod error;
pub mod traits;

// Mock implementations for host-side tests and SITL harnesses
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{PlatformError, Result, TimerError, UartError};
pub use traits::{TimerInterface, UartConfig, UartInterface};
