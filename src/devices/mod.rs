//! Device drivers
//!
//! This module contains device drivers that use platform abstraction traits.
//!
//! ## Modules
//!
//! - `gnss`: u-blox GNSS receiver protocol handling (UBX + NMEA)

pub mod gnss;
