//! Interleaved UBX/NMEA stream demultiplexing
//!
//! The receiver interleaves binary frames and text sentences on one
//! serial channel. [`GnssReceiver`] owns the transport handle and a
//! bounded accumulation buffer, and turns the raw byte stream into typed
//! [`GnssMessage`] values, resynchronizing over garbage and counting
//! everything it has to throw away.

use super::frame::{self, FrameError};
use super::messages::{GnssMessage, RelativePosition};
use super::nmea::{self, NavSentence};
use crate::platform::{Result, UartInterface};
use heapless::Vec;

/// Accumulation buffer size
const RX_BUFFER: usize = 512;

/// Bytes pulled from the transport per poll
const READ_CHUNK: usize = 64;

/// Longest sentence line kept before giving up on a terminator
const MAX_SENTENCE: usize = 120;

/// Counters for discarded input, for diagnosability
///
/// Framing and parsing failures are recoverable; these counters make sure
/// they are observable instead of silently swallowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeStats {
    /// Valid UBX frames decoded
    pub frames: u32,
    /// Valid NMEA sentences decoded
    pub sentences: u32,
    /// UBX frames dropped for checksum mismatch
    pub bad_checksum: u32,
    /// UBX frames dropped for an oversized length field
    pub oversized: u32,
    /// NMEA lines discarded (unrecognized type or undecodable field)
    pub discarded_lines: u32,
    /// Structurally valid frames of types this system does not consume
    pub unknown_frames: u32,
    /// Raw bytes dropped: inter-message garbage and buffer overflow
    pub dropped_bytes: u32,
}

/// Demultiplexer for the receiver's mixed byte stream
///
/// Exclusively owns the transport handle. Configuration exchanges must
/// complete before this starts consuming the stream.
pub struct GnssReceiver<U: UartInterface> {
    uart: U,
    buf: Vec<u8, RX_BUFFER>,
    stats: DecodeStats,
}

impl<U: UartInterface> GnssReceiver<U> {
    /// Create a receiver over a configured transport
    pub fn new(uart: U) -> Self {
        Self {
            uart,
            buf: Vec::new(),
            stats: DecodeStats::default(),
        }
    }

    /// Get mutable reference to the transport
    ///
    /// Used for vendor-specific initialization before streaming starts.
    pub fn uart_mut(&mut self) -> &mut U {
        &mut self.uart
    }

    /// Consume the receiver, returning the transport
    pub fn release(self) -> U {
        self.uart
    }

    /// Discard counters so far
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Pull pending transport bytes into the accumulation buffer
    ///
    /// Returns the number of bytes read. When the buffer would overflow,
    /// the oldest bytes are dropped (and counted) so a stalled consumer
    /// cannot wedge the stream.
    pub fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.uart.read(&mut chunk)?;

        if n > 0 {
            let overflow = (self.buf.len() + n).saturating_sub(RX_BUFFER);
            if overflow > 0 {
                self.consume(overflow);
                self.stats.dropped_bytes += overflow as u32;
            }
            let _ = self.buf.extend_from_slice(&chunk[..n]);
        }

        Ok(n)
    }

    /// Read from the transport and return the next message, if any
    pub fn poll(&mut self) -> Result<Option<GnssMessage>> {
        self.fill()?;
        Ok(self.next_message())
    }

    /// Extract the next complete message from the accumulation buffer
    ///
    /// Demultiplexes on whichever protocol marker appears first in the
    /// buffer. Returns `None` once nothing complete is left; call again
    /// after the next [`fill`](Self::fill).
    pub fn next_message(&mut self) -> Option<GnssMessage> {
        loop {
            let ubx_at = find_ubx_sync(&self.buf);
            let nmea_at = self.buf.iter().position(|&b| b == b'$');

            match (ubx_at, nmea_at) {
                (Some(u), Some(n)) if u < n => {
                    if let Some(msg) = self.take_frame(u)? {
                        return Some(msg);
                    }
                }
                (Some(u), None) => {
                    if let Some(msg) = self.take_frame(u)? {
                        return Some(msg);
                    }
                }
                (_, Some(n)) => {
                    if let Some(msg) = self.take_sentence(n)? {
                        return Some(msg);
                    }
                }
                (None, None) => {
                    // Nothing but garbage; keep a possible trailing sync prefix.
                    let keep = if self.buf.last() == Some(&frame::SYNC1) { 1 } else { 0 };
                    let garbage = self.buf.len() - keep;
                    if garbage > 0 {
                        self.consume(garbage);
                        self.stats.dropped_bytes += garbage as u32;
                    }
                    return None;
                }
            }
        }
    }

    /// Try to decode a UBX frame starting at `start`
    ///
    /// Outer `None` means "wait for more bytes"; inner `None` means "keep
    /// scanning the buffer".
    fn take_frame(&mut self, start: usize) -> Option<Option<GnssMessage>> {
        if start > 0 {
            self.consume(start);
            self.stats.dropped_bytes += start as u32;
        }

        let scan = frame::decode(&self.buf);
        let consumed = scan.consumed;
        match scan.outcome {
            Ok(raw) => {
                self.consume(consumed);
                self.stats.frames += 1;
                match RelativePosition::from_frame(&raw) {
                    Some(rel) => Some(Some(GnssMessage::RelPosNed(rel))),
                    None => {
                        self.stats.unknown_frames += 1;
                        Some(Some(GnssMessage::Unknown {
                            class: raw.class,
                            id: raw.id,
                        }))
                    }
                }
            }
            Err(FrameError::Incomplete) => {
                self.consume(consumed);
                None
            }
            Err(FrameError::Checksum(_)) => {
                crate::log_debug!("gnss rx: frame checksum mismatch");
                self.consume(consumed);
                self.stats.bad_checksum += 1;
                Some(None)
            }
            Err(FrameError::Oversized(len)) => {
                crate::log_debug!("gnss rx: oversized frame length {}", len);
                self.consume(consumed);
                self.stats.oversized += 1;
                Some(None)
            }
        }
    }

    /// Try to extract and parse an NMEA line starting at `start`
    fn take_sentence(&mut self, start: usize) -> Option<Option<GnssMessage>> {
        if start > 0 {
            self.consume(start);
            self.stats.dropped_bytes += start as u32;
        }

        let terminator = self.buf.iter().position(|&b| b == b'\n');
        let end = match terminator {
            Some(i) => i,
            None if self.buf.len() > MAX_SENTENCE => {
                // Unterminated over-long line: drop the marker and rescan.
                self.consume(1);
                self.stats.discarded_lines += 1;
                return Some(None);
            }
            None => return None,
        };

        let parsed = core::str::from_utf8(&self.buf[..end])
            .ok()
            .and_then(nmea::parse);
        self.consume(end + 1);

        match parsed {
            Some(NavSentence::Gga(gga)) => {
                self.stats.sentences += 1;
                Some(Some(GnssMessage::Gga(gga)))
            }
            Some(NavSentence::Rmc(rmc)) => {
                self.stats.sentences += 1;
                Some(Some(GnssMessage::Rmc(rmc)))
            }
            None => {
                self.stats.discarded_lines += 1;
                Some(None)
            }
        }
    }

    /// Drop `n` bytes from the front of the accumulation buffer
    fn consume(&mut self, n: usize) {
        let len = self.buf.len();
        let n = n.min(len);
        self.buf.copy_within(n.., 0);
        self.buf.truncate(len - n);
    }
}

/// Find a UBX sync marker (or a trailing possible one)
fn find_ubx_sync(buf: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == frame::SYNC1 && buf[i + 1] == frame::SYNC2 {
            return Some(i);
        }
        i += 1;
    }
    None
}
