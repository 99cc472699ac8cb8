//! Driver-facing side of the demo.
//!
//! [`SerialFlash`] is what a QSPI/serial-NOR driver has to offer on top of
//! the `embedded-storage` NOR traits: per-address erase granularity, the
//! device size and a switch into memory-mapped (XIP) mode.

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind};

use crate::error::Error;

/// Value every byte of a freshly erased NOR sector reads back as.
pub const ERASED_VALUE: u8 = 0xFF;

pub trait SerialFlash: NorFlash {
    /// Erase granularity of the sector containing `address`.
    ///
    /// Hybrid-sector parts override this; uniform parts keep the default.
    fn erase_size_at(&self, address: u32) -> u32 {
        let _ = address;
        Self::ERASE_SIZE as u32
    }

    /// Device size in bytes.
    fn total_size(&self) -> u32 {
        self.capacity() as u32
    }

    /// Switch the controller in or out of memory-mapped mode.
    ///
    /// There is no failure path: the controller either maps the device or
    /// the bus hangs.
    fn set_xip(&mut self, enable: bool);
}

/// Erase `length` bytes starting at `address`.
pub fn erase<F: SerialFlash>(flash: &mut F, address: u32, length: u32) -> Result<(), Error> {
    let end = address.checked_add(length).ok_or(Error::Erase {
        address,
        kind: NorFlashErrorKind::OutOfBounds,
    })?;
    trace!("erase 0x{:x}..0x{:x}", address, end);
    flash
        .erase(address, end)
        .map_err(|e| Error::Erase {
            address,
            kind: e.kind(),
        })
}

pub fn read<F: SerialFlash>(flash: &mut F, address: u32, buf: &mut [u8]) -> Result<(), Error> {
    trace!("read 0x{:x} len {}", address, buf.len());
    flash.read(address, buf).map_err(|e| Error::Read {
        address,
        kind: e.kind(),
    })
}

pub fn write<F: SerialFlash>(flash: &mut F, address: u32, data: &[u8]) -> Result<(), Error> {
    trace!("write 0x{:x} len {}", address, data.len());
    flash.write(address, data).map_err(|e| Error::Write {
        address,
        kind: e.kind(),
    })
}
