//! I2C bus abstractions
//!
//! Provides the async I2C master trait used by every register access in the
//! firmware, plus an adapter for any `embedded-hal-async` I2C peripheral.

use embedded_hal::i2c::{Error as _, ErrorKind};

/// Classified bus failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusErrorKind {
    /// Device did not acknowledge its address or a data byte
    NoAck,
    /// Fewer bytes transferred than requested
    ShortTransfer,
    /// Device did not respond within the configured timeout
    Timeout,
    /// Arbitration lost to another master
    Arbitration,
    /// Any other bus-level fault
    Bus,
}

impl BusErrorKind {
    /// Whether repeating the transaction may succeed
    ///
    /// A missing acknowledge means nobody is listening at that address, so
    /// retrying only burns time.
    pub fn is_transient(self) -> bool {
        !matches!(self, BusErrorKind::NoAck)
    }
}

/// Errors produced by an [`I2cBus`] implementation
pub trait BusError: core::fmt::Debug {
    /// Classify this error
    fn kind(&self) -> BusErrorKind;
}

impl BusError for BusErrorKind {
    fn kind(&self) -> BusErrorKind {
        *self
    }
}

/// Async I2C bus master
///
/// Provides basic I2C read/write operations for communicating with
/// peripheral devices. Implementations must not split a `write_read` into
/// two independent transactions.
#[allow(async_fn_in_trait)]
pub trait I2cBus {
    /// Error type for I2C operations
    type Error: BusError;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write
    async fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `buf` - Buffer to read into
    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read in a single transaction (repeated start)
    ///
    /// This is commonly used to write a register address then read data.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `write_data` - Bytes to write (typically register address)
    /// * `read_buf` - Buffer to read into
    async fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

impl<T: I2cBus + ?Sized> I2cBus for &mut T {
    type Error = T::Error;

    async fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        T::write(self, address, data).await
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::read(self, address, buf).await
    }

    async fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        T::write_read(self, address, write_data, read_buf).await
    }
}

/// Adapter exposing an `embedded-hal-async` I2C peripheral as an [`I2cBus`]
pub struct Embedded<T>(pub T);

impl<T> Embedded<T> {
    /// Consume the adapter and return the peripheral
    pub fn into_inner(self) -> T {
        self.0
    }
}

fn classify(kind: ErrorKind) -> BusErrorKind {
    match kind {
        ErrorKind::NoAcknowledge(_) => BusErrorKind::NoAck,
        ErrorKind::ArbitrationLoss => BusErrorKind::Arbitration,
        ErrorKind::Overrun => BusErrorKind::ShortTransfer,
        _ => BusErrorKind::Bus,
    }
}

impl<T: embedded_hal_async::i2c::I2c> I2cBus for Embedded<T> {
    type Error = BusErrorKind;

    async fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.0
            .write(address, data)
            .await
            .map_err(|e| classify(e.kind()))
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.0
            .read(address, buf)
            .await
            .map_err(|e| classify(e.kind()))
    }

    async fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.0
            .write_read(address, write_data, read_buf)
            .await
            .map_err(|e| classify(e.kind()))
    }
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Extra attempts after a transient failure
    pub retries: u8,
    /// Per-transaction response timeout in milliseconds
    pub timeout_ms: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::FAST
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self {
        frequency: 100_000,
        retries: 5,
        timeout_ms: 50,
    };

    /// Fast mode (400 kHz), what the bridge chips are programmed for
    pub const FAST: Self = Self {
        frequency: 400_000,
        retries: 5,
        timeout_ms: 50,
    };
}
