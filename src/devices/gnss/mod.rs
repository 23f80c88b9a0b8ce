//! u-blox GNSS receiver protocol handling
//!
//! The receiver speaks two protocols over one serial channel:
//!
//! - **UBX**: the binary protocol used both for configuration (CFG-VALSET
//!   with ACK/NACK round-trips) and for relative-position output
//!   (NAV-RELPOSNED from a moving-base setup).
//! - **NMEA**: the text protocol carrying the standard navigation
//!   sentences (GGA, RMC).
//!
//! ## Modules
//!
//! - `frame`: UBX framing and checksum (stateless codec)
//! - `nmea`: NMEA sentence parsing and coordinate conversion (pure)
//! - `messages`: typed decode of the UBX messages this system consumes
//! - `valset`: CFG-VALSET configuration command construction
//! - `init`: command/acknowledgement exchange and receiver bring-up
//! - `receiver`: demultiplexing of the interleaved UBX/NMEA byte stream

pub mod frame;
pub mod init;
pub mod messages;
pub mod nmea;
pub mod receiver;
pub mod valset;

pub use frame::{FrameError, RawFrame};
pub use init::{AckResult, InitError, ReceiverConfig};
pub use messages::{GnssMessage, RelativePosition};
pub use nmea::{NavSentence, PositionFix};
pub use receiver::{DecodeStats, GnssReceiver};
pub use valset::ValSet;
