//! Mock UART implementation for testing

use crate::platform::{
    traits::{UartConfig, UartInterface},
    Result,
};
use core::cell::RefCell;
use std::collections::VecDeque;
use std::vec::Vec;

/// Mock UART implementation
///
/// Provides in-memory buffers for transmit and receive data,
/// allowing unit tests to verify UART operations without hardware.
///
/// Besides direct injection via [`inject_rx_data`](MockUart::inject_rx_data),
/// the mock supports scripted request/response exchanges: each queued
/// response is moved into the receive buffer when the next `write` occurs,
/// which models a device that only answers after being commanded. An empty
/// scripted response models a device that stays silent for one round-trip.
///
/// # Example
///
/// ```
/// use mow_trail::platform::mock::MockUart;
/// use mow_trail::platform::traits::UartInterface;
///
/// let mut uart = MockUart::new(Default::default());
///
/// // Write data
/// uart.write(b"Hello").unwrap();
///
/// // Verify transmitted data
/// assert_eq!(uart.tx_buffer(), b"Hello");
///
/// // Inject received data for testing
/// uart.inject_rx_data(b"World");
/// let mut buf = [0u8; 5];
/// uart.read(&mut buf).unwrap();
/// assert_eq!(&buf, b"World");
/// ```
#[derive(Debug)]
pub struct MockUart {
    config: UartConfig,
    tx_buffer: RefCell<Vec<u8>>,
    rx_buffer: RefCell<Vec<u8>>,
    responses: RefCell<VecDeque<Vec<u8>>>,
    input_clears: u32,
    output_clears: u32,
}

impl MockUart {
    /// Create a new mock UART
    pub fn new(config: UartConfig) -> Self {
        Self {
            config,
            tx_buffer: RefCell::new(Vec::new()),
            rx_buffer: RefCell::new(Vec::new()),
            responses: RefCell::new(VecDeque::new()),
            input_clears: 0,
            output_clears: 0,
        }
    }

    /// Get transmitted data (for test verification)
    pub fn tx_buffer(&self) -> Vec<u8> {
        self.tx_buffer.borrow().clone()
    }

    /// Clear transmit buffer
    pub fn clear_tx_buffer(&mut self) {
        self.tx_buffer.borrow_mut().clear();
    }

    /// Inject receive data (for test setup)
    pub fn inject_rx_data(&mut self, data: &[u8]) {
        self.rx_buffer.borrow_mut().extend_from_slice(data);
    }

    /// Queue a scripted response, delivered on the next write
    ///
    /// Pass an empty slice to model a device that does not answer that
    /// round-trip at all.
    pub fn queue_response(&mut self, data: &[u8]) {
        self.responses.borrow_mut().push_back(data.to_vec());
    }

    /// Number of times `clear_input` was called
    pub fn input_clears(&self) -> u32 {
        self.input_clears
    }

    /// Number of times `clear_output` was called
    pub fn output_clears(&self) -> u32 {
        self.output_clears
    }

    /// Get current baud rate
    pub fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }
}

impl UartInterface for MockUart {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.tx_buffer.borrow_mut().extend_from_slice(data);
        if let Some(response) = self.responses.borrow_mut().pop_front() {
            self.rx_buffer.borrow_mut().extend_from_slice(&response);
        }
        Ok(data.len())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut rx = self.rx_buffer.borrow_mut();
        let to_read = core::cmp::min(buffer.len(), rx.len());

        buffer[..to_read].copy_from_slice(&rx[..to_read]);
        rx.drain(..to_read);

        Ok(to_read)
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<()> {
        self.config.baud_rate = baud;
        Ok(())
    }

    fn available(&self) -> bool {
        !self.rx_buffer.borrow().is_empty()
    }

    fn flush(&mut self) -> Result<()> {
        // Mock implementation - nothing pending in hardware
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.rx_buffer.borrow_mut().clear();
        self.input_clears += 1;
        Ok(())
    }

    fn clear_output(&mut self) -> Result<()> {
        self.tx_buffer.borrow_mut().clear();
        self.output_clears += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_uart_write() {
        let mut uart = MockUart::new(UartConfig::default());
        let written = uart.write(b"Hello, World!").unwrap();
        assert_eq!(written, 13);
        assert_eq!(uart.tx_buffer(), b"Hello, World!");
    }

    #[test]
    fn test_mock_uart_read() {
        let mut uart = MockUart::new(UartConfig::default());
        uart.inject_rx_data(b"Test Data");

        let mut buffer = [0u8; 4];
        let read = uart.read(&mut buffer).unwrap();
        assert_eq!(read, 4);
        assert_eq!(&buffer, b"Test");

        // Read remaining data
        let mut buffer2 = [0u8; 10];
        let read2 = uart.read(&mut buffer2).unwrap();
        assert_eq!(read2, 5);
        assert_eq!(&buffer2[..5], b" Data");
    }

    #[test]
    fn test_mock_uart_available() {
        let mut uart = MockUart::new(UartConfig::default());
        assert!(!uart.available());

        uart.inject_rx_data(b"X");
        assert!(uart.available());

        let mut buf = [0u8; 1];
        uart.read(&mut buf).unwrap();
        assert!(!uart.available());
    }

    #[test]
    fn test_mock_uart_baud_rate() {
        let mut uart = MockUart::new(UartConfig::default());
        assert_eq!(uart.baud_rate(), 38400);

        uart.set_baud_rate(230400).unwrap();
        assert_eq!(uart.baud_rate(), 230400);
    }

    #[test]
    fn test_mock_uart_scripted_responses() {
        let mut uart = MockUart::new(UartConfig::default());
        uart.queue_response(b"");
        uart.queue_response(b"OK");

        // First write: scripted silence
        uart.write(b"cmd1").unwrap();
        assert!(!uart.available());

        // Second write: scripted answer
        uart.write(b"cmd2").unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(uart.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"OK");
    }

    #[test]
    fn test_mock_uart_clear_buffers() {
        let mut uart = MockUart::new(UartConfig::default());
        uart.inject_rx_data(b"stale");
        uart.write(b"pending").unwrap();

        uart.clear_input().unwrap();
        uart.clear_output().unwrap();

        assert!(!uart.available());
        assert!(uart.tx_buffer().is_empty());
        assert_eq!(uart.input_clears(), 1);
        assert_eq!(uart.output_clears(), 1);
    }
}
