//! UBX-CFG-VALSET command construction
//!
//! Generation 9 receivers are configured through key/value items: each key
//! is a 32-bit identifier whose size nibble (bits 28..30) encodes the
//! value width. A VALSET payload is
//!
//! ```text
//! version (0x00) | layers | reserved (2) | key (u32 LE) value | key value | ...
//! ```

use super::frame::RawFrame;
use super::messages::{CLASS_CFG, ID_VALSET};
use heapless::Vec;

/// Apply to the RAM layer (active immediately, lost on power cycle)
pub const LAYER_RAM: u8 = 0x01;
/// Apply to battery-backed RAM
pub const LAYER_BBR: u8 = 0x02;
/// Apply to flash (persistent)
pub const LAYER_FLASH: u8 = 0x04;

/// Configuration keys (from the u-blox gen-9 interface description)
///
/// Key layout: `[size:3][group:13][reserved:4][item:12]`.
pub mod keys {
    /// U4: UART1 baud rate
    pub const CFG_UART1_BAUDRATE: u32 = 0x4052_0001;
    /// U2: measurement period in ms
    pub const CFG_RATE_MEAS: u32 = 0x3021_0001;
    /// U2: navigation rate in measurement cycles
    pub const CFG_RATE_NAV: u32 = 0x3021_0002;
    /// U1: NMEA GGA output rate on UART1
    pub const CFG_MSGOUT_NMEA_GGA_UART1: u32 = 0x2091_00bb;
    /// U1: NMEA RMC output rate on UART1
    pub const CFG_MSGOUT_NMEA_RMC_UART1: u32 = 0x2091_00ac;
    /// U1: UBX NAV-RELPOSNED output rate on UART1
    pub const CFG_MSGOUT_RELPOSNED_UART1: u32 = 0x2091_008e;
}

/// Largest VALSET payload this builder produces
///
/// The receiver itself caps a VALSET transaction at 64 key/value items;
/// the commands this system sends stay far below that.
const MAX_VALSET_PAYLOAD: usize = 128;

/// VALSET construction failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValSetError {
    /// Too many key/value items for one command
    CapacityExceeded,
    /// Value width does not match the key's size nibble
    WidthMismatch,
}

/// Builder for one CFG-VALSET configuration command
#[derive(Debug, Clone)]
pub struct ValSet {
    payload: Vec<u8, MAX_VALSET_PAYLOAD>,
}

impl ValSet {
    /// Start a command targeting the given layer bitfield
    pub fn new(layers: u8) -> Self {
        let mut payload = Vec::new();
        // version, layers, reserved
        let _ = payload.extend_from_slice(&[0x00, layers, 0x00, 0x00]);
        Self { payload }
    }

    /// Add a 1-byte item (U1/E1/L keys)
    pub fn set_u8(self, key: u32, value: u8) -> Result<Self, ValSetError> {
        self.push_item(key, 1, &[value])
    }

    /// Add a 2-byte item (U2 keys), little-endian
    pub fn set_u16(self, key: u32, value: u16) -> Result<Self, ValSetError> {
        self.push_item(key, 2, &value.to_le_bytes())
    }

    /// Add a 4-byte item (U4 keys), little-endian
    pub fn set_u32(self, key: u32, value: u32) -> Result<Self, ValSetError> {
        self.push_item(key, 4, &value.to_le_bytes())
    }

    /// Finish into a sendable frame
    pub fn into_frame(self) -> RawFrame {
        RawFrame {
            class: CLASS_CFG,
            id: ID_VALSET,
            payload: Vec::from_slice(&self.payload).unwrap_or_default(),
        }
    }

    fn push_item(mut self, key: u32, width: usize, value: &[u8]) -> Result<Self, ValSetError> {
        if key_width(key) != Some(width) {
            return Err(ValSetError::WidthMismatch);
        }
        if self.payload.extend_from_slice(&key.to_le_bytes()).is_err()
            || self.payload.extend_from_slice(value).is_err()
        {
            return Err(ValSetError::CapacityExceeded);
        }
        Ok(self)
    }
}

/// Value width in bytes encoded by a key's size nibble
fn key_width(key: u32) -> Option<usize> {
    match key >> 28 {
        0x1 | 0x2 => Some(1),
        0x3 => Some(2),
        0x4 => Some(4),
        0x5 => Some(8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valset_baudrate_layout() {
        let frame = ValSet::new(LAYER_RAM)
            .set_u32(keys::CFG_UART1_BAUDRATE, 115200)
            .unwrap()
            .into_frame();

        assert_eq!(frame.class, 0x06);
        assert_eq!(frame.id, 0x8A);

        // version, layers, reserved
        assert_eq!(&frame.payload[..4], &[0x00, 0x01, 0x00, 0x00]);
        // key, little-endian
        assert_eq!(&frame.payload[4..8], &[0x01, 0x00, 0x52, 0x40]);
        // value, little-endian
        assert_eq!(&frame.payload[8..12], &115200u32.to_le_bytes());
        assert_eq!(frame.payload.len(), 12);
    }

    #[test]
    fn test_valset_multiple_items() {
        let frame = ValSet::new(LAYER_RAM | LAYER_BBR | LAYER_FLASH)
            .set_u16(keys::CFG_RATE_MEAS, 1000)
            .unwrap()
            .set_u16(keys::CFG_RATE_NAV, 1)
            .unwrap()
            .into_frame();

        assert_eq!(frame.payload[1], 0x07);
        // 4 header + 2 * (4 key + 2 value)
        assert_eq!(frame.payload.len(), 16);
        assert_eq!(&frame.payload[4..8], &[0x01, 0x00, 0x21, 0x30]);
        assert_eq!(&frame.payload[8..10], &1000u16.to_le_bytes());
        assert_eq!(&frame.payload[10..14], &[0x02, 0x00, 0x21, 0x30]);
        assert_eq!(&frame.payload[14..16], &1u16.to_le_bytes());
    }

    #[test]
    fn test_valset_msgout_rate() {
        let frame = ValSet::new(LAYER_RAM)
            .set_u8(keys::CFG_MSGOUT_RELPOSNED_UART1, 1)
            .unwrap()
            .into_frame();

        assert_eq!(&frame.payload[4..8], &[0x8e, 0x00, 0x91, 0x20]);
        assert_eq!(frame.payload[8], 1);
    }

    #[test]
    fn test_valset_width_checked_against_key() {
        let err = ValSet::new(LAYER_RAM)
            .set_u8(keys::CFG_UART1_BAUDRATE, 1)
            .unwrap_err();
        assert_eq!(err, ValSetError::WidthMismatch);

        let err = ValSet::new(LAYER_RAM)
            .set_u32(keys::CFG_RATE_MEAS, 1000)
            .unwrap_err();
        assert_eq!(err, ValSetError::WidthMismatch);
    }

    #[test]
    fn test_valset_encodes_to_valid_frame() {
        use crate::devices::gnss::frame;

        let cmd = ValSet::new(LAYER_RAM)
            .set_u16(keys::CFG_RATE_MEAS, 100)
            .unwrap()
            .into_frame();
        let bytes = cmd.to_bytes();

        let scan = frame::decode(&bytes);
        let decoded = scan.outcome.expect("round-trips");
        assert_eq!(decoded, cmd);
    }
}
