//! Register transport
//!
//! 8-bit register access to the bridge chips over the shared bus. Every
//! bridge register is one byte wide behind a one-byte address; pages that
//! do not fit the direct map are reached through the indirect access
//! window at 0x40..0x42.
//!
//! A [`Registers`] borrows the bus mutably, so it can only be built from a
//! held [`fpdlink_core::gate::BusGuard`]. Multi-transaction sequences such
//! as indirect access are atomic with respect to other bus users for that
//! reason alone.

use fpdlink_hal::{BusError, BusErrorKind, I2cBus};

/// Transport failures, as classified by the bus
pub type TransportError = BusErrorKind;

/// Indirect access window shared by the DS90UB983 and DS90UB984
pub mod reg {
    /// Page select: `(page << 2) | read`
    pub const IND_ACC_CTL: u8 = 0x40;
    /// Register offset inside the selected page
    pub const IND_ACC_ADDR: u8 = 0x41;
    /// Data port, auto-increments the offset
    pub const IND_ACC_DATA: u8 = 0x42;
}

/// Longest burst sent by [`Registers::write_many`] in one transaction
pub const MAX_BURST: usize = 16;

/// Build the indirect page-select value
pub const fn page_select(page: u8, read: bool) -> u8 {
    (page << 2) | read as u8
}

/// Register access through a borrowed bus
pub struct Registers<'a, B: I2cBus> {
    bus: &'a mut B,
}

impl<'a, B: I2cBus> Registers<'a, B> {
    pub fn new(bus: &'a mut B) -> Self {
        Self { bus }
    }

    /// Read one register
    pub async fn read(&mut self, dev: u8, reg: u8) -> Result<u8, TransportError> {
        let mut buf = [0u8; 1];
        self.bus
            .write_read(dev, &[reg], &mut buf)
            .await
            .map_err(|e| e.kind())?;
        Ok(buf[0])
    }

    /// Write one register
    pub async fn write(&mut self, dev: u8, reg: u8, value: u8) -> Result<(), TransportError> {
        self.bus
            .write(dev, &[reg, value])
            .await
            .map_err(|e| e.kind())
    }

    /// Read a register in an indirect page
    pub async fn read_indirect(
        &mut self,
        dev: u8,
        page: u8,
        reg: u8,
    ) -> Result<u8, TransportError> {
        self.write(dev, reg::IND_ACC_CTL, page_select(page, true))
            .await?;
        self.write(dev, reg::IND_ACC_ADDR, reg).await?;
        self.read(dev, reg::IND_ACC_DATA).await
    }

    /// Write a register in an indirect page
    pub async fn write_indirect(
        &mut self,
        dev: u8,
        page: u8,
        reg: u8,
        value: u8,
    ) -> Result<(), TransportError> {
        self.write(dev, reg::IND_ACC_CTL, page_select(page, false))
            .await?;
        self.write(dev, reg::IND_ACC_ADDR, reg).await?;
        self.write(dev, reg::IND_ACC_DATA, value).await
    }

    /// Replace the bits selected by `mask`, returning the value written
    ///
    /// Nothing is written if the read fails.
    pub async fn read_modify_write(
        &mut self,
        dev: u8,
        reg: u8,
        mask: u8,
        value: u8,
    ) -> Result<u8, TransportError> {
        let old = self.read(dev, reg).await?;
        let new = (old & !mask) | (value & mask);
        self.write(dev, reg, new).await?;
        Ok(new)
    }

    /// Read consecutive registers starting at `start`
    pub async fn read_many(
        &mut self,
        dev: u8,
        start: u8,
        buf: &mut [u8],
    ) -> Result<(), TransportError> {
        self.bus
            .write_read(dev, &[start], buf)
            .await
            .map_err(|e| e.kind())
    }

    /// Write consecutive registers starting at `start`
    ///
    /// Split into bursts of at most [`MAX_BURST`] data bytes, each
    /// re-addressed at its own offset.
    pub async fn write_many(
        &mut self,
        dev: u8,
        start: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let mut frame = [0u8; MAX_BURST + 1];
        let mut reg = start;
        for chunk in data.chunks(MAX_BURST) {
            frame[0] = reg;
            frame[1..=chunk.len()].copy_from_slice(chunk);
            self.bus
                .write(dev, &frame[..=chunk.len()])
                .await
                .map_err(|e| e.kind())?;
            reg = reg.wrapping_add(chunk.len() as u8);
        }
        Ok(())
    }

    /// Raw write of an already framed message
    pub async fn send(&mut self, dev: u8, bytes: &[u8]) -> Result<(), TransportError> {
        self.bus.write(dev, bytes).await.map_err(|e| e.kind())
    }

    /// Raw write then read in one transaction
    pub async fn transfer(
        &mut self,
        dev: u8,
        tx: &[u8],
        rx: &mut [u8],
    ) -> Result<(), TransportError> {
        self.bus.write_read(dev, tx, rx).await.map_err(|e| e.kind())
    }
}
