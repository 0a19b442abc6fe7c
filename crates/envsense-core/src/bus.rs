//! Two-wire bus shim
//!
//! The SHT3x driver talks to the bus one byte at a time: open a transmission,
//! push bytes, close it, then ask for a number of bytes back and drain them.
//! [`TwoWire`] captures exactly those primitives, and [`I2cWire`] implements
//! them on top of any `embedded-hal-async` I2C bus.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo<I: embedded_hal_async::i2c::I2c>(i2c: I) {
//! use envsense_core::bus::{I2cWire, TwoWire};
//!
//! let mut wire = I2cWire::new(i2c);
//! wire.begin(4, 5);
//! wire.begin_transmission(0x44);
//! wire.write(0x2C);
//! wire.write(0x06);
//! let _ = wire.end_transmission().await;
//!
//! if wire.request_from(0x44, 6).await == 6 {
//!     while let Some(byte) = wire.read() {
//!         let _ = byte;
//!     }
//! }
//! # }
//! ```

use embedded_hal_async::i2c::{Error as _, ErrorKind, I2c};
use heapless::Vec;
use log::{debug, warn};
use thiserror_no_std::Error;

/// Maximum number of bytes buffered in one transmission.
pub const TX_CAPACITY: usize = 32;

/// Maximum number of bytes that can be requested at once.
pub const RX_CAPACITY: usize = 32;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("No transmission in progress")]
    NotInTransmission,
    #[error("I2C transfer failed: {0:?}")]
    Transfer(ErrorKind),
}

/// Byte-oriented two-wire bus driver.
pub trait TwoWire {
    /// Bind the bus to a data/clock pin pair.
    fn begin(&mut self, data_pin: u8, clock_pin: u8);

    /// Start queueing a write addressed to the 7-bit `address`.
    fn begin_transmission(&mut self, address: u8);

    /// Queue one byte. Returns the number of bytes accepted (0 or 1).
    fn write(&mut self, byte: u8) -> usize;

    /// Send the queued bytes and close the transmission.
    fn end_transmission(&mut self) -> impl Future<Output = Result<(), BusError>>;

    /// Read `count` bytes from `address` into the receive buffer.
    /// Returns how many bytes were received.
    fn request_from(&mut self, address: u8, count: usize) -> impl Future<Output = usize>;

    /// Number of received bytes not yet consumed.
    fn available(&self) -> usize;

    /// Consume the next received byte.
    fn read(&mut self) -> Option<u8>;
}

/// [`TwoWire`] adapter over an async I2C bus.
///
/// Queued writes are flushed as a single I2C write on `end_transmission`, and
/// each `request_from` is a single I2C read. A failed read leaves nothing
/// available, which callers see as a short read.
pub struct I2cWire<I> {
    i2c: I,
    pins: Option<(u8, u8)>,
    tx_address: Option<u8>,
    tx: Vec<u8, TX_CAPACITY>,
    rx: [u8; RX_CAPACITY],
    rx_len: usize,
    rx_pos: usize,
}

impl<I: I2c> I2cWire<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            pins: None,
            tx_address: None,
            tx: Vec::new(),
            rx: [0; RX_CAPACITY],
            rx_len: 0,
            rx_pos: 0,
        }
    }

    /// The `(data, clock)` pins passed to [`TwoWire::begin`], if it was called.
    pub fn pins(&self) -> Option<(u8, u8)> {
        self.pins
    }

    /// Give back the underlying bus.
    pub fn release(self) -> I {
        self.i2c
    }

    fn clear_rx(&mut self) {
        self.rx_len = 0;
        self.rx_pos = 0;
    }
}

impl<I: I2c> TwoWire for I2cWire<I> {
    fn begin(&mut self, data_pin: u8, clock_pin: u8) {
        // Pin muxing belongs to the HAL that built `I`; only the pair is recorded.
        self.pins = Some((data_pin, clock_pin));
        self.tx_address = None;
        self.tx.clear();
        self.clear_rx();
        debug!("Two-wire bus bound to SDA={} SCL={}", data_pin, clock_pin);
    }

    fn begin_transmission(&mut self, address: u8) {
        self.tx_address = Some(address);
        self.tx.clear();
    }

    fn write(&mut self, byte: u8) -> usize {
        if self.tx_address.is_none() {
            warn!("Two-wire write of {:#04x} outside a transmission", byte);
            return 0;
        }

        match self.tx.push(byte) {
            Ok(()) => 1,
            Err(_) => {
                warn!("Two-wire transmit buffer full, dropping {:#04x}", byte);
                0
            }
        }
    }

    async fn end_transmission(&mut self) -> Result<(), BusError> {
        let address = self.tx_address.take().ok_or(BusError::NotInTransmission)?;

        let result = self.i2c.write(address, &self.tx).await.map_err(|e| {
            let kind = e.kind();
            warn!("I2C write to {:#04x} failed: {:?}", address, kind);
            BusError::Transfer(kind)
        });

        self.tx.clear();
        result
    }

    async fn request_from(&mut self, address: u8, count: usize) -> usize {
        self.clear_rx();

        let count = if count > RX_CAPACITY {
            warn!(
                "Two-wire request for {} bytes clamped to {}",
                count, RX_CAPACITY
            );
            RX_CAPACITY
        } else {
            count
        };

        match self.i2c.read(address, &mut self.rx[..count]).await {
            Ok(()) => {
                self.rx_len = count;
                count
            }
            Err(e) => {
                warn!("I2C read from {:#04x} failed: {:?}", address, e.kind());
                0
            }
        }
    }

    fn available(&self) -> usize {
        self.rx_len - self.rx_pos
    }

    fn read(&mut self) -> Option<u8> {
        if self.rx_pos >= self.rx_len {
            return None;
        }

        let byte = self.rx[self.rx_pos];
        self.rx_pos += 1;
        Some(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDRESS: u8 = 0x44;

    #[test]
    fn test_begin_records_pins() {
        let mut wire = I2cWire::new(I2cMock::new(&[]));
        assert_eq!(wire.pins(), None);

        wire.begin(4, 5);
        assert_eq!(wire.pins(), Some((4, 5)));

        wire.release().done();
    }

    #[test]
    fn test_queued_bytes_flush_as_one_write() {
        let expectations = [I2cTransaction::write(ADDRESS, vec![0x2C, 0x06])];
        let mut wire = I2cWire::new(I2cMock::new(&expectations));

        wire.begin_transmission(ADDRESS);
        assert_eq!(wire.write(0x2C), 1);
        assert_eq!(wire.write(0x06), 1);
        assert_eq!(block_on(wire.end_transmission()), Ok(()));

        wire.release().done();
    }

    #[test]
    fn test_write_outside_transmission_is_rejected() {
        let mut wire = I2cWire::new(I2cMock::new(&[]));

        assert_eq!(wire.write(0x2C), 0);
        assert_eq!(
            block_on(wire.end_transmission()),
            Err(BusError::NotInTransmission)
        );

        wire.release().done();
    }

    #[test]
    fn test_write_failure_is_reported() {
        let expectations =
            [I2cTransaction::write(ADDRESS, vec![0x2C, 0x06]).with_error(ErrorKind::Other)];
        let mut wire = I2cWire::new(I2cMock::new(&expectations));

        wire.begin_transmission(ADDRESS);
        wire.write(0x2C);
        wire.write(0x06);
        assert_eq!(
            block_on(wire.end_transmission()),
            Err(BusError::Transfer(ErrorKind::Other))
        );

        wire.release().done();
    }

    #[test]
    fn test_transmit_buffer_overflow_drops_bytes() {
        let mut wire = I2cWire::new(I2cMock::new(&[]));
        wire.begin_transmission(ADDRESS);

        for _ in 0..TX_CAPACITY {
            assert_eq!(wire.write(0xAA), 1);
        }
        assert_eq!(wire.write(0xBB), 0);

        wire.release().done();
    }

    #[test]
    fn test_request_then_drain_in_order() {
        let response = vec![0x66, 0x23, 0x9A, 0x80, 0x00, 0xA2];
        let expectations = [I2cTransaction::read(ADDRESS, response.clone())];
        let mut wire = I2cWire::new(I2cMock::new(&expectations));

        assert_eq!(block_on(wire.request_from(ADDRESS, 6)), 6);
        assert_eq!(wire.available(), 6);

        let mut drained = Vec::<u8, 6>::new();
        while let Some(byte) = wire.read() {
            drained.push(byte).unwrap();
        }

        assert_eq!(&drained[..], &response[..]);
        assert_eq!(wire.available(), 0);
        assert_eq!(wire.read(), None);

        wire.release().done();
    }

    #[test]
    fn test_failed_request_leaves_nothing_available() {
        let expectations = [
            I2cTransaction::read(ADDRESS, vec![1, 2]),
            I2cTransaction::read(ADDRESS, vec![0; 6]).with_error(ErrorKind::Other),
        ];
        let mut wire = I2cWire::new(I2cMock::new(&expectations));

        // Leftover bytes from an earlier request must not leak into the next one.
        assert_eq!(block_on(wire.request_from(ADDRESS, 2)), 2);
        assert_eq!(block_on(wire.request_from(ADDRESS, 6)), 0);
        assert_eq!(wire.available(), 0);
        assert_eq!(wire.read(), None);

        wire.release().done();
    }
}
