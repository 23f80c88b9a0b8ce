//! Receiver configuration: command/acknowledgement exchange and bring-up
//!
//! Every CFG-VALSET command is answered by the receiver with ACK-ACK or
//! ACK-NAK. The exchange owns the serial channel for its duration: the
//! channel is half-duplex for configuration purposes, so commands are
//! strictly sequential and the telemetry read loop must not run while
//! configuration is in progress.

use super::frame::{self, FrameError, RawFrame};
use super::messages::{CLASS_ACK, ID_ACK, ID_NAK};
use super::valset::{self, keys, ValSet, ValSetError};
use crate::platform::{PlatformError, Result, TimerInterface, UartInterface};

/// Wire size of an ACK-ACK / ACK-NAK frame (header + 2-byte payload + checksum)
pub const ACK_FRAME_LEN: usize = 10;

/// Poll interval while waiting for acknowledgement bytes
const ACK_POLL_MS: u32 = 5;

/// Outcome of one configuration command round-trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckResult {
    /// Receiver accepted the command
    Acknowledged,
    /// Receiver rejected the command (a completed round-trip, not retried)
    NotAcknowledged,
    /// No bytes arrived within the timeout window
    Timeout,
    /// Bytes arrived but were not a well-formed acknowledgement
    Malformed,
}

/// Receiver bring-up settings
///
/// Defaults match the mower's survey setup: the module boots at 38400
/// baud and is moved to 230400 for the 1 Hz telemetry streams.
#[derive(Debug, Clone, Copy)]
pub struct ReceiverConfig {
    /// Baud rate the module is currently listening at
    pub current_baud: u32,
    /// Baud rate to move the module (and host) to
    pub target_baud: u32,
    /// Measurement period in milliseconds
    pub meas_rate_ms: u16,
    /// Navigation solutions per measurement cycle
    pub nav_rate_cycles: u16,
    /// Enable NMEA GGA output on UART1
    pub enable_gga: bool,
    /// Enable NMEA RMC output on UART1
    pub enable_rmc: bool,
    /// Enable UBX NAV-RELPOSNED output on UART1
    pub enable_relposned: bool,
    /// Total attempts per command (first try included)
    pub max_retries: u8,
    /// Acknowledgement wait per attempt, milliseconds
    pub ack_timeout_ms: u32,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            current_baud: 38400,
            target_baud: 230400,
            meas_rate_ms: 1000,
            nav_rate_cycles: 1,
            enable_gga: true,
            enable_rmc: true,
            enable_relposned: true,
            max_retries: 3,
            ack_timeout_ms: 500,
        }
    }
}

/// Receiver bring-up failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// Transport failed
    Platform(PlatformError),
    /// A command did not complete with an acknowledgement
    CommandFailed {
        /// Which bring-up step failed
        step: &'static str,
        /// Final round-trip outcome
        result: AckResult,
    },
    /// Command construction failed
    BadCommand(ValSetError),
}

impl From<PlatformError> for InitError {
    fn from(e: PlatformError) -> Self {
        InitError::Platform(e)
    }
}

impl From<ValSetError> for InitError {
    fn from(e: ValSetError) -> Self {
        InitError::BadCommand(e)
    }
}

/// Send one configuration command and await its acknowledgement
///
/// Each attempt discards any pending transport bytes in both directions,
/// writes the encoded frame, then reads the fixed-size acknowledgement
/// within the timeout window. `Timeout` and `Malformed` outcomes are
/// retried up to `max_retries` total attempts; `NotAcknowledged` is a
/// completed round-trip and is returned immediately.
///
/// # Errors
///
/// Returns `PlatformError` only for transport failures; protocol-level
/// outcomes are reported through [`AckResult`].
pub fn send_with_ack<U, T>(
    uart: &mut U,
    timer: &mut T,
    command: &RawFrame,
    max_retries: u8,
    timeout_ms: u32,
) -> Result<AckResult>
where
    U: UartInterface,
    T: TimerInterface,
{
    let bytes = command.to_bytes();
    let mut outcome = AckResult::Timeout;

    for attempt in 1..=max_retries.max(1) {
        // Drop ambiguous in-flight bytes from a previous round-trip.
        uart.clear_input()?;
        uart.clear_output()?;
        uart.write(&bytes)?;

        outcome = read_ack(uart, timer, timeout_ms)?;
        match outcome {
            AckResult::Acknowledged | AckResult::NotAcknowledged => return Ok(outcome),
            AckResult::Timeout | AckResult::Malformed => {
                crate::log_warn!(
                    "gnss init: command 0x{:02x}/0x{:02x} attempt {}/{} failed: {:?}",
                    command.class,
                    command.id,
                    attempt,
                    max_retries,
                    outcome
                );
            }
        }
    }

    Ok(outcome)
}

/// Read and classify one acknowledgement frame
fn read_ack<U, T>(uart: &mut U, timer: &mut T, timeout_ms: u32) -> Result<AckResult>
where
    U: UartInterface,
    T: TimerInterface,
{
    let mut buf = [0u8; ACK_FRAME_LEN];
    let mut filled = 0;
    let deadline = timer.now_ms() + timeout_ms as u64;

    while filled < ACK_FRAME_LEN {
        let n = uart.read(&mut buf[filled..])?;
        filled += n;

        if filled < ACK_FRAME_LEN {
            if timer.now_ms() >= deadline {
                break;
            }
            timer.delay_ms(ACK_POLL_MS)?;
        }
    }

    if filled == 0 {
        return Ok(AckResult::Timeout);
    }

    let scan = frame::decode(&buf[..filled]);
    match scan.outcome {
        Ok(ack) if ack.class == CLASS_ACK && ack.id == ID_ACK => Ok(AckResult::Acknowledged),
        Ok(ack) if ack.class == CLASS_ACK && ack.id == ID_NAK => Ok(AckResult::NotAcknowledged),
        Ok(other) => {
            crate::log_warn!(
                "gnss init: unexpected response 0x{:02x}/0x{:02x}",
                other.class,
                other.id
            );
            Ok(AckResult::Malformed)
        }
        Err(FrameError::Incomplete) | Err(FrameError::Checksum(_)) | Err(FrameError::Oversized(_)) => {
            crate::log_warn!("gnss init: undecodable response, {} bytes: {:?}", filled, &buf[..filled]);
            Ok(AckResult::Malformed)
        }
    }
}

/// Bring up the receiver for the mower's telemetry streams
///
/// Sequence (each step is an acknowledged exchange):
/// 1. Move UART1 to the target baud rate, commanded at the current rate,
///    then switch the host side over.
/// 2. Set the measurement and navigation rates.
/// 3. Enable GGA / RMC / NAV-RELPOSNED output on UART1 as configured.
///
/// Aborts on the first command that does not come back acknowledged.
pub fn initialize<U, T>(uart: &mut U, timer: &mut T, config: &ReceiverConfig) -> core::result::Result<(), InitError>
where
    U: UartInterface,
    T: TimerInterface,
{
    uart.set_baud_rate(config.current_baud)?;

    if config.target_baud != config.current_baud {
        let cmd = ValSet::new(valset::LAYER_RAM)
            .set_u32(keys::CFG_UART1_BAUDRATE, config.target_baud)?
            .into_frame();
        exchange(uart, timer, &cmd, config, "uart1-baudrate")?;

        // Let the module retune before talking at the new rate.
        uart.set_baud_rate(config.target_baud)?;
        timer.delay_ms(100)?;
    }

    let cmd = ValSet::new(valset::LAYER_RAM)
        .set_u16(keys::CFG_RATE_MEAS, config.meas_rate_ms)?
        .set_u16(keys::CFG_RATE_NAV, config.nav_rate_cycles)?
        .into_frame();
    exchange(uart, timer, &cmd, config, "nav-rate")?;

    let outputs = [
        (config.enable_gga, keys::CFG_MSGOUT_NMEA_GGA_UART1, "msgout-gga"),
        (config.enable_rmc, keys::CFG_MSGOUT_NMEA_RMC_UART1, "msgout-rmc"),
        (
            config.enable_relposned,
            keys::CFG_MSGOUT_RELPOSNED_UART1,
            "msgout-relposned",
        ),
    ];
    for (enabled, key, step) in outputs {
        let rate = if enabled { 1 } else { 0 };
        let cmd = ValSet::new(valset::LAYER_RAM).set_u8(key, rate)?.into_frame();
        exchange(uart, timer, &cmd, config, step)?;
    }

    crate::log_info!("gnss init: receiver configured");
    Ok(())
}

fn exchange<U, T>(
    uart: &mut U,
    timer: &mut T,
    command: &RawFrame,
    config: &ReceiverConfig,
    step: &'static str,
) -> core::result::Result<(), InitError>
where
    U: UartInterface,
    T: TimerInterface,
{
    let result = send_with_ack(uart, timer, command, config.max_retries, config.ack_timeout_ms)?;
    if result != AckResult::Acknowledged {
        return Err(InitError::CommandFailed { step, result });
    }
    Ok(())
}
