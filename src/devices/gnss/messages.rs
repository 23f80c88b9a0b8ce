//! Typed decode of the UBX messages this system consumes
//!
//! Only NAV-RELPOSNED is decoded into fields; every other frame class/id
//! surfaces as [`GnssMessage::Unknown`] so callers can count or log what
//! the receiver is actually sending.

use super::frame::RawFrame;
use super::nmea::{GgaData, RmcData};

/// UBX class: navigation results
pub const CLASS_NAV: u8 = 0x01;
/// UBX class: acknowledgements
pub const CLASS_ACK: u8 = 0x05;
/// UBX class: configuration
pub const CLASS_CFG: u8 = 0x06;

/// NAV-RELPOSNED message id
pub const ID_RELPOSNED: u8 = 0x3C;
/// ACK-ACK message id
pub const ID_ACK: u8 = 0x01;
/// ACK-NAK message id
pub const ID_NAK: u8 = 0x00;
/// CFG-VALSET message id
pub const ID_VALSET: u8 = 0x8A;

/// One demultiplexed receiver message
#[derive(Debug, Clone, PartialEq)]
pub enum GnssMessage {
    /// NMEA fix data
    Gga(GgaData),
    /// NMEA recommended minimum navigation data
    Rmc(RmcData),
    /// UBX relative position (moving-base)
    RelPosNed(RelativePosition),
    /// Structurally valid frame of a type this system does not consume
    Unknown {
        /// UBX message class
        class: u8,
        /// UBX message id
        id: u8,
    },
}

/// Decoded NAV-RELPOSNED: offset and heading between the two receivers
///
/// North/east/down come from centimeter-scaled integers; heading from a
/// 1e-5 degree integer. A heading of exactly 0.0 is how the receiver
/// reports "not resolved", not a measured due-north reading.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RelativePosition {
    /// GPS time of week of the solution, milliseconds
    pub itow_ms: u32,
    /// Relative north component in meters
    pub north_m: f32,
    /// Relative east component in meters
    pub east_m: f32,
    /// Relative down component in meters
    pub down_m: f32,
    /// Heading of the relative position vector in degrees
    pub heading_deg: f32,
    /// `relPosValid` flag bit
    pub rel_pos_valid: bool,
    /// `relPosHeadingValid` flag bit (version 1 payloads only)
    pub heading_valid: bool,
}

/// Version 0 payload size (no heading fields)
const RELPOSNED_V0_LEN: usize = 40;
/// Version 1 payload size
const RELPOSNED_V1_LEN: usize = 64;

impl RelativePosition {
    /// Decode a NAV-RELPOSNED frame
    ///
    /// Accepts version 0 (40-byte) and version 1 (64-byte) payloads;
    /// version 0 carries no heading, which maps to the 0.0 sentinel.
    /// Returns `None` for wrong class/id or a malformed payload length.
    pub fn from_frame(frame: &RawFrame) -> Option<Self> {
        if frame.class != CLASS_NAV || frame.id != ID_RELPOSNED {
            return None;
        }

        let p = &frame.payload;
        let version = *p.first()?;
        let (heading_deg, flags) = match (version, p.len()) {
            (0, RELPOSNED_V0_LEN) => (0.0, read_u32(p, 36)?),
            (1, RELPOSNED_V1_LEN) => {
                let heading = read_i32(p, 24)? as f32 * 1e-5;
                (heading, read_u32(p, 60)?)
            }
            _ => return None,
        };

        Some(Self {
            itow_ms: read_u32(p, 4)?,
            north_m: read_i32(p, 8)? as f32 / 100.0,
            east_m: read_i32(p, 12)? as f32 / 100.0,
            down_m: read_i32(p, 16)? as f32 / 100.0,
            heading_deg,
            rel_pos_valid: flags & 0x04 != 0,
            heading_valid: flags & 0x100 != 0,
        })
    }
}

fn read_u32(payload: &[u8], offset: usize) -> Option<u32> {
    let bytes = payload.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_i32(payload: &[u8], offset: usize) -> Option<i32> {
    read_u32(payload, offset).map(|v| v as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a version 1 NAV-RELPOSNED payload with the given NED
    /// centimeters and heading in 1e-5 degrees.
    fn relposned_v1_payload(
        itow_ms: u32,
        n_cm: i32,
        e_cm: i32,
        d_cm: i32,
        heading_1e5: i32,
        flags: u32,
    ) -> std::vec::Vec<u8> {
        let mut p = vec![0u8; RELPOSNED_V1_LEN];
        p[0] = 1; // version
        p[4..8].copy_from_slice(&itow_ms.to_le_bytes());
        p[8..12].copy_from_slice(&n_cm.to_le_bytes());
        p[12..16].copy_from_slice(&e_cm.to_le_bytes());
        p[16..20].copy_from_slice(&d_cm.to_le_bytes());
        p[24..28].copy_from_slice(&heading_1e5.to_le_bytes());
        p[60..64].copy_from_slice(&flags.to_le_bytes());
        p
    }

    #[test]
    fn test_relposned_v1_decode() {
        let payload = relposned_v1_payload(123456, 1234, -567, 89, 4_500_000, 0x0104);
        let frame = RawFrame::new(CLASS_NAV, ID_RELPOSNED, &payload).unwrap();

        let rel = RelativePosition::from_frame(&frame).expect("decodes");
        assert_eq!(rel.itow_ms, 123456);
        assert!((rel.north_m - 12.34).abs() < 0.001);
        assert!((rel.east_m + 5.67).abs() < 0.001);
        assert!((rel.down_m - 0.89).abs() < 0.001);
        assert!((rel.heading_deg - 45.0).abs() < 0.001);
        assert!(rel.rel_pos_valid);
        assert!(rel.heading_valid);
    }

    #[test]
    fn test_relposned_v0_has_sentinel_heading() {
        let mut payload = vec![0u8; RELPOSNED_V0_LEN];
        payload[8..12].copy_from_slice(&500i32.to_le_bytes());
        payload[36..40].copy_from_slice(&0x04u32.to_le_bytes());

        let frame = RawFrame::new(CLASS_NAV, ID_RELPOSNED, &payload).unwrap();
        let rel = RelativePosition::from_frame(&frame).expect("v0 decodes");
        assert!((rel.north_m - 5.0).abs() < 0.001);
        assert_eq!(rel.heading_deg, 0.0);
        assert!(!rel.heading_valid);
    }

    #[test]
    fn test_relposned_rejects_wrong_identity() {
        let payload = relposned_v1_payload(0, 0, 0, 0, 0, 0);
        let frame = RawFrame::new(CLASS_ACK, ID_RELPOSNED, &payload).unwrap();
        assert!(RelativePosition::from_frame(&frame).is_none());
    }

    #[test]
    fn test_relposned_rejects_truncated_payload() {
        let frame = RawFrame::new(CLASS_NAV, ID_RELPOSNED, &[1u8; 16]).unwrap();
        assert!(RelativePosition::from_frame(&frame).is_none());
    }
}
