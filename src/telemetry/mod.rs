//! Telemetry fusion and collection
//!
//! Merges the two independently-arriving message families (NMEA fixes and
//! UBX relative position) into complete telemetry records and runs the
//! continuous collection loop that feeds an external sink.
//!
//! ## Modules
//!
//! - `aggregator`: stateful record fusion with an explicit flush policy
//! - `collector`: the transport read loop with graceful shutdown
//! - `flags`: atomic flags shared with status-signaling side tasks

pub mod aggregator;
pub mod collector;
pub mod flags;

pub use aggregator::{FlushPolicy, TelemetryAggregator, TelemetryRecord};
pub use collector::{RecordSink, TelemetryCollector};
pub use flags::{DataFlowFlag, StopFlag};
