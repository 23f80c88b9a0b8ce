//! Telemetry record fusion
//!
//! Positions arrive over NMEA, relative-position vectors over UBX, at
//! independent rates. The aggregator merges both into one record stream
//! under an explicit flush policy chosen at construction time.

use crate::devices::gnss::messages::RelativePosition;
use crate::devices::gnss::nmea::PositionFix;

/// When the aggregator emits a record
///
/// The two policies correspond to the two logging modes the mower runs
/// in; the choice is deliberate and fixed per aggregator instance, never
/// mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlushPolicy {
    /// Emit only when every tracked field is populated, then reset all
    /// fields. Every record is complete; rate is bounded by the slowest
    /// message family.
    Complete,
    /// Emit at most once per period with whatever is populated. Fields
    /// not refreshed since the last emission carry forward (stale data is
    /// visible as repeated values, by contract).
    Interval {
        /// Minimum milliseconds between emissions
        period_ms: u64,
    },
}

/// One fused telemetry record
///
/// The timestamp is stamped at emission time, never at field arrival, and
/// is always present. Field options are all `Some` for records emitted by
/// [`FlushPolicy::Complete`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    /// Emission timestamp, milliseconds on the platform's monotonic clock
    pub timestamp_ms: u64,
    /// Latitude in degrees, signed
    pub latitude: Option<f64>,
    /// Longitude in degrees, signed
    pub longitude: Option<f64>,
    /// Speed over ground in m/s
    pub speed_mps: Option<f32>,
    /// Relative north in meters
    pub rel_north_m: Option<f32>,
    /// Relative east in meters
    pub rel_east_m: Option<f32>,
    /// Relative down in meters
    pub rel_down_m: Option<f32>,
    /// Heading in degrees, [0, 360)
    pub heading_deg: Option<f32>,
}

/// In-progress record buffer
#[derive(Debug, Clone, Copy, Default)]
struct Pending {
    latitude: Option<f64>,
    longitude: Option<f64>,
    speed_mps: Option<f32>,
    rel_north_m: Option<f32>,
    rel_east_m: Option<f32>,
    rel_down_m: Option<f32>,
    heading_deg: Option<f32>,
}

impl Pending {
    fn is_complete(&self) -> bool {
        self.latitude.is_some()
            && self.longitude.is_some()
            && self.speed_mps.is_some()
            && self.rel_north_m.is_some()
            && self.rel_east_m.is_some()
            && self.rel_down_m.is_some()
            && self.heading_deg.is_some()
    }

    fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.speed_mps.is_none()
            && self.rel_north_m.is_none()
            && self.rel_east_m.is_none()
            && self.rel_down_m.is_none()
            && self.heading_deg.is_none()
    }

    fn to_record(self, timestamp_ms: u64) -> TelemetryRecord {
        TelemetryRecord {
            timestamp_ms,
            latitude: self.latitude,
            longitude: self.longitude,
            speed_mps: self.speed_mps,
            rel_north_m: self.rel_north_m,
            rel_east_m: self.rel_east_m,
            rel_down_m: self.rel_down_m,
            heading_deg: self.heading_deg,
        }
    }
}

/// Merges both message families into telemetry records
///
/// Exclusively owns the in-progress buffer; nothing else reads or writes
/// partial state.
#[derive(Debug)]
pub struct TelemetryAggregator {
    policy: FlushPolicy,
    pending: Pending,
    last_emit_ms: Option<u64>,
    emitted: u32,
}

impl TelemetryAggregator {
    /// Create an aggregator with the given flush policy
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            pending: Pending::default(),
            last_emit_ms: None,
            emitted: 0,
        }
    }

    /// The configured flush policy
    pub fn policy(&self) -> FlushPolicy {
        self.policy
    }

    /// Records emitted so far
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    /// Whether the in-progress buffer holds no fields
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Merge a position fix (and speed, when the sentence carried one)
    ///
    /// Does not touch the relative-position fields.
    pub fn on_position_fix(&mut self, fix: PositionFix, speed_mps: Option<f32>) {
        self.pending.latitude = Some(fix.latitude);
        self.pending.longitude = Some(fix.longitude);
        if let Some(speed) = speed_mps {
            self.pending.speed_mps = Some(speed);
        }
    }

    /// Merge a relative-position update
    ///
    /// A heading of exactly 0.0 is the receiver's "not resolved" sentinel
    /// and is recomputed from the offset vector instead; a zero-offset
    /// pair then yields an indeterminate 0.0, which is accepted.
    pub fn on_relative_position(&mut self, rel: &RelativePosition) {
        self.pending.rel_north_m = Some(rel.north_m);
        self.pending.rel_east_m = Some(rel.east_m);
        self.pending.rel_down_m = Some(rel.down_m);

        let heading = if rel.heading_deg == 0.0 {
            derive_heading(rel.east_m, rel.north_m)
        } else {
            rel.heading_deg
        };
        self.pending.heading_deg = Some(heading);
    }

    /// Evaluate the flush policy
    ///
    /// `now_ms` comes from the platform's monotonic clock and becomes the
    /// record timestamp when one is emitted.
    pub fn poll(&mut self, now_ms: u64) -> Option<TelemetryRecord> {
        match self.policy {
            FlushPolicy::Complete => {
                if !self.pending.is_complete() {
                    return None;
                }
                let record = self.pending.to_record(now_ms);
                self.pending = Pending::default();
                self.last_emit_ms = Some(now_ms);
                self.emitted += 1;
                Some(record)
            }
            FlushPolicy::Interval { period_ms } => {
                if self.pending.is_empty() {
                    return None;
                }
                let due = match self.last_emit_ms {
                    Some(last) => now_ms.saturating_sub(last) >= period_ms,
                    None => true,
                };
                if !due {
                    return None;
                }
                let record = self.pending.to_record(now_ms);
                self.last_emit_ms = Some(now_ms);
                self.emitted += 1;
                Some(record)
            }
        }
    }
}

/// Heading of the relative-position vector, degrees in [0, 360)
fn derive_heading(east_m: f32, north_m: f32) -> f32 {
    let heading = libm::atan2(east_m as f64, north_m as f64).to_degrees();
    let heading = if heading < 0.0 { heading + 360.0 } else { heading };
    // atan2 output is within (-180, 180], so one wrap suffices.
    heading as f32
}
