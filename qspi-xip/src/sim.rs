//! RAM-backed NOR flash model.
//!
//! Behaves like a serial NOR part as far as the demo can tell: erase sets a
//! sector to `0xFF`, programming can only clear bits, and the array becomes
//! readable as plain memory once XIP is enabled. Faults can be injected per
//! operation to drive the failure paths without hardware.

use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
};

use crate::flash::{SerialFlash, ERASED_VALUE};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    Erase,
    Read,
    Write,
}

#[derive(Clone, Copy, Debug)]
struct Fault {
    op: Op,
    skip: usize,
    kind: NorFlashErrorKind,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OpCounts {
    pub erase: usize,
    pub read: usize,
    pub write: usize,
    pub xip: usize,
}

#[derive(Debug)]
pub struct RamFlash<const SIZE: usize, const ERASE: usize> {
    data: [u8; SIZE],
    fault: Option<Fault>,
    stuck: Option<(usize, u8)>,
    xip: bool,
    counts: OpCounts,
}

impl<const SIZE: usize, const ERASE: usize> RamFlash<SIZE, ERASE> {
    /// A factory-fresh device: every byte erased.
    pub const fn new() -> Self {
        Self {
            data: [ERASED_VALUE; SIZE],
            fault: None,
            stuck: None,
            xip: false,
            counts: OpCounts {
                erase: 0,
                read: 0,
                write: 0,
                xip: 0,
            },
        }
    }

    /// Fail the `(skip + 1)`-th future call of `op` with `kind`.
    pub fn fail_after(&mut self, op: Op, skip: usize, kind: NorFlashErrorKind) {
        self.fault = Some(Fault { op, skip, kind });
    }

    /// Bits in `mask` at `offset` stay 0 whatever the device is told to do.
    pub fn stick_low(&mut self, offset: usize, mask: u8) {
        self.stuck = Some((offset, mask));
        self.apply_stuck();
    }

    pub fn xip_enabled(&self) -> bool {
        self.xip
    }

    pub fn counts(&self) -> OpCounts {
        self.counts
    }

    /// Raw array contents regardless of mode.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    fn take_fault(&mut self, op: Op) -> Result<(), NorFlashErrorKind> {
        match &mut self.fault {
            Some(fault) if fault.op == op => {
                if fault.skip == 0 {
                    let kind = fault.kind;
                    self.fault = None;
                    Err(kind)
                } else {
                    fault.skip -= 1;
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    fn apply_stuck(&mut self) {
        if let Some((offset, mask)) = self.stuck {
            if let Some(byte) = self.data.get_mut(offset) {
                *byte &= !mask;
            }
        }
    }
}

impl<const SIZE: usize, const ERASE: usize> Default for RamFlash<SIZE, ERASE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize, const ERASE: usize> ErrorType for RamFlash<SIZE, ERASE> {
    type Error = NorFlashErrorKind;
}

impl<const SIZE: usize, const ERASE: usize> ReadNorFlash for RamFlash<SIZE, ERASE> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.counts.read += 1;
        self.take_fault(Op::Read)?;
        check_read(self, offset, bytes.len())?;
        let start = offset as usize;
        bytes.copy_from_slice(&self.data[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        SIZE
    }
}

impl<const SIZE: usize, const ERASE: usize> NorFlash for RamFlash<SIZE, ERASE> {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = ERASE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.counts.erase += 1;
        self.take_fault(Op::Erase)?;
        check_erase(self, from, to)?;
        self.data[from as usize..to as usize].fill(ERASED_VALUE);
        self.apply_stuck();
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.counts.write += 1;
        self.take_fault(Op::Write)?;
        check_write(self, offset, bytes.len())?;
        let start = offset as usize;
        for (cell, &value) in self.data[start..start + bytes.len()].iter_mut().zip(bytes) {
            *cell &= value;
        }
        Ok(())
    }
}

impl<const SIZE: usize, const ERASE: usize> SerialFlash for RamFlash<SIZE, ERASE> {
    fn set_xip(&mut self, enable: bool) {
        self.counts.xip += 1;
        self.xip = enable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Flash = RamFlash<{ 4 * 4096 }, 4096>;

    #[test]
    fn erase_sets_sector_to_ff_and_program_clears_bits() {
        let mut flash = Flash::new();
        flash.write(4096, &[0x0F, 0xF0]).unwrap();
        flash.write(4096, &[0x3C, 0xFF]).unwrap();
        assert_eq!(&flash.contents()[4096..4098], &[0x0C, 0xF0]);

        flash.erase(4096, 8192).unwrap();
        assert!(flash.contents()[4096..8192].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn erase_rejects_unaligned_range() {
        let mut flash = Flash::new();
        assert_eq!(flash.erase(100, 4096), Err(NorFlashErrorKind::NotAligned));
        assert_eq!(
            flash.erase(0, 5 * 4096),
            Err(NorFlashErrorKind::OutOfBounds)
        );
    }

    #[test]
    fn fault_fires_once_after_skips() {
        let mut flash = Flash::new();
        flash.fail_after(Op::Read, 1, NorFlashErrorKind::Other);
        let mut buf = [0u8; 4];
        assert_eq!(flash.read(0, &mut buf), Ok(()));
        assert_eq!(flash.read(0, &mut buf), Err(NorFlashErrorKind::Other));
        assert_eq!(flash.read(0, &mut buf), Ok(()));
        assert_eq!(flash.counts().read, 3);
    }

    #[test]
    fn stuck_bits_survive_erase() {
        let mut flash = Flash::new();
        flash.stick_low(4100, 0x04);
        flash.erase(4096, 8192).unwrap();
        assert_eq!(flash.contents()[4100], 0xFB);
    }

    #[test]
    fn xip_switch_is_counted() {
        let mut flash = Flash::new();
        assert!(!flash.xip_enabled());
        flash.set_xip(true);
        assert!(flash.xip_enabled());
        assert_eq!(flash.counts().xip, 1);
    }
}
