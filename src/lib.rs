#![cfg_attr(not(any(test, feature = "mock")), no_std)]

//! mow_trail - GNSS positioning core for an autonomous mower prototype
//!
//! This library configures a u-blox receiver over a serial channel (UBX
//! CFG-VALSET with ACK/NACK round-trips), decodes the mixed UBX + NMEA byte
//! stream coming back, and fuses both message families into complete
//! telemetry records for an external sink.

// Platform abstraction layer (UART transport, monotonic time, mocks)
pub mod platform;

// Receiver protocol handling built on the platform abstraction
pub mod devices;

// Logging abstraction
pub mod logging;

// Telemetry fusion and the continuous collection loop
pub mod telemetry;
