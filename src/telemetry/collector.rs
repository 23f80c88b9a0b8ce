//! Continuous telemetry collection loop
//!
//! Wires the stream demultiplexer into the aggregator and pushes emitted
//! records to an external sink. Configuration exchanges own the channel
//! exclusively; start this loop only after [`initialize`] has completed.
//!
//! [`initialize`]: crate::devices::gnss::init::initialize

use super::aggregator::{TelemetryAggregator, TelemetryRecord};
use super::flags::{DataFlowFlag, StopFlag};
use crate::devices::gnss::messages::GnssMessage;
use crate::devices::gnss::nmea::PositionFix;
use crate::devices::gnss::receiver::{DecodeStats, GnssReceiver};
use crate::platform::{Result, TimerInterface, UartInterface};

// =============================================================================
// Embassy Operations Module
// =============================================================================

#[cfg(feature = "embassy")]
mod embassy_ops {
    use embassy_time::{Duration, Instant, Timer};

    /// Async delay for retry backoff and idle polling
    pub async fn delay_millis(ms: u64) {
        Timer::after(Duration::from_millis(ms)).await;
    }

    /// Milliseconds on the embassy monotonic clock
    pub fn now_ms() -> u64 {
        Instant::now().as_millis()
    }
}

// =============================================================================
// Host Test Stubs
// =============================================================================

#[cfg(not(feature = "embassy"))]
mod stub_ops {
    /// No-op delay for host tests
    pub async fn delay_millis(_ms: u64) {
        // No actual delay in host tests
    }
}

#[cfg(feature = "embassy")]
use embassy_ops::delay_millis;
#[cfg(not(feature = "embassy"))]
use stub_ops::delay_millis;

/// Idle sleep between passes when the transport had nothing for us
const IDLE_POLL_MS: u32 = 5;

/// Destination for emitted records
///
/// Persistence (CSV file, network, ...) lives behind this seam; the
/// collector guarantees each emitted record reaches the sink exactly once.
pub trait RecordSink {
    /// Accept one emitted record
    fn record(&mut self, record: &TelemetryRecord);
}

/// The transport-to-sink collection pipeline
pub struct TelemetryCollector<U: UartInterface> {
    receiver: GnssReceiver<U>,
    aggregator: TelemetryAggregator,
}

impl<U: UartInterface> TelemetryCollector<U> {
    /// Maximum retry attempts for transport errors
    const MAX_RETRIES: u8 = 3;

    /// Create a collector over a configured receiver and aggregator
    pub fn new(receiver: GnssReceiver<U>, aggregator: TelemetryAggregator) -> Self {
        Self {
            receiver,
            aggregator,
        }
    }

    /// Discard counters from the underlying receiver
    pub fn stats(&self) -> DecodeStats {
        self.receiver.stats()
    }

    /// The aggregator (for policy and emission introspection)
    pub fn aggregator(&self) -> &TelemetryAggregator {
        &self.aggregator
    }

    /// Get mutable reference to the receiver
    pub fn receiver_mut(&mut self) -> &mut GnssReceiver<U> {
        &mut self.receiver
    }

    /// One collection pass: drain the transport, demultiplex, fuse, emit
    ///
    /// Returns whether the transport produced any bytes this pass (the
    /// "data is flowing" signal).
    pub fn service<S: RecordSink>(&mut self, now_ms: u64, sink: &mut S) -> Result<bool> {
        let mut total = 0;

        loop {
            let n = self.receiver.fill()?;
            total += n;

            while let Some(message) = self.receiver.next_message() {
                self.dispatch(message);
                if let Some(record) = self.aggregator.poll(now_ms) {
                    sink.record(&record);
                }
            }

            if n == 0 {
                break;
            }
        }

        // Time-gated policies can become due without fresh messages.
        if let Some(record) = self.aggregator.poll(now_ms) {
            sink.record(&record);
        }

        Ok(total > 0)
    }

    /// Collection pass with retry on transport errors
    ///
    /// Retries up to 3 times with exponential backoff (100ms, 200ms,
    /// 400ms) before giving the error to the caller.
    pub async fn service_with_retry<S: RecordSink>(
        &mut self,
        now_ms: u64,
        sink: &mut S,
    ) -> Result<bool> {
        let mut retry_count = 0;

        loop {
            match self.service(now_ms, sink) {
                Ok(active) => return Ok(active),
                Err(e) => {
                    retry_count += 1;

                    if retry_count > Self::MAX_RETRIES {
                        crate::log_error!(
                            "telemetry: transport error after {} retries",
                            Self::MAX_RETRIES
                        );
                        return Err(e);
                    }

                    crate::log_warn!(
                        "telemetry: transport error, retrying ({}/{})",
                        retry_count,
                        Self::MAX_RETRIES
                    );

                    let delay_ms = 100 * (1 << (retry_count - 1));
                    delay_millis(delay_ms).await;
                }
            }
        }
    }

    /// Blocking collection loop with graceful shutdown
    ///
    /// Runs passes until `stop` is set. The stop check happens after each
    /// pass, so a record already handed to the sink is never lost, and the
    /// loop never re-emits it. On exit the transport output is flushed.
    pub fn run<T, S>(
        &mut self,
        timer: &mut T,
        stop: &StopFlag,
        data_flow: &DataFlowFlag,
        sink: &mut S,
    ) -> Result<()>
    where
        T: TimerInterface,
        S: RecordSink,
    {
        crate::log_info!("telemetry: starting continuous collection");

        loop {
            let now_ms = timer.now_ms();
            let active = self.service(now_ms, sink)?;
            data_flow.set(active);

            if stop.is_set() {
                break;
            }
            if !active {
                timer.delay_ms(IDLE_POLL_MS)?;
            }
        }

        data_flow.set(false);
        self.receiver.uart_mut().flush()?;
        crate::log_info!("telemetry: collection stopped");
        Ok(())
    }

    /// Async collection loop for Embassy targets
    ///
    /// Same contract as [`run`](Self::run), driven by the embassy clock.
    #[cfg(feature = "embassy")]
    pub async fn run_loop<S: RecordSink>(
        &mut self,
        stop: &StopFlag,
        data_flow: &DataFlowFlag,
        sink: &mut S,
    ) -> Result<()> {
        crate::log_info!("telemetry: starting continuous collection");

        loop {
            let now_ms = embassy_ops::now_ms();
            let active = self.service_with_retry(now_ms, sink).await?;
            data_flow.set(active);

            if stop.is_set() {
                break;
            }
            if !active {
                delay_millis(IDLE_POLL_MS as u64).await;
            }
        }

        data_flow.set(false);
        self.receiver.uart_mut().flush()?;
        crate::log_info!("telemetry: collection stopped");
        Ok(())
    }

    /// Route one demultiplexed message into the aggregator
    fn dispatch(&mut self, message: GnssMessage) {
        match message {
            GnssMessage::Gga(gga) => {
                if let (Some(latitude), Some(longitude)) = (gga.latitude, gga.longitude) {
                    self.aggregator.on_position_fix(
                        PositionFix {
                            latitude,
                            longitude,
                        },
                        None,
                    );
                }
            }
            GnssMessage::Rmc(rmc) => {
                if let (Some(latitude), Some(longitude)) = (rmc.latitude, rmc.longitude) {
                    self.aggregator.on_position_fix(
                        PositionFix {
                            latitude,
                            longitude,
                        },
                        rmc.speed_mps,
                    );
                }
            }
            GnssMessage::RelPosNed(rel) => {
                self.aggregator.on_relative_position(&rel);
            }
            GnssMessage::Unknown { class, id } => {
                crate::log_debug!("telemetry: ignoring frame 0x{:02x}/0x{:02x}", class, id);
            }
        }
    }
}
