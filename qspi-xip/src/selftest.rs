//! Erase / read / write / read-back check of the external flash.
//!
//! The target is the start of the second erase sector; sector 0 may hold a
//! boot header or the XIP image itself and is never touched.

use core::fmt::Write;

use crate::config::{ConfigError, ErasedCheck, PACKET_SIZE};
use crate::console::Console;
use crate::error::Error;
use crate::flash::{self, SerialFlash, ERASED_VALUE};

/// What a passing self-test found out about the device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelfTestReport {
    pub address: u32,
    pub sector_size: u32,
    pub total_size: u32,
}

/// `pattern[i] = i mod 256`.
pub fn test_pattern<const N: usize>() -> [u8; N] {
    core::array::from_fn(|i| (i & 0xFF) as u8)
}

fn first_mismatch(expected: &[u8], found: &[u8]) -> Option<usize> {
    expected.iter().zip(found).position(|(a, b)| a != b)
}

pub struct SelfTest<const N: usize = PACKET_SIZE> {
    erased_check: ErasedCheck,
}

impl<const N: usize> SelfTest<N> {
    pub const fn new(erased_check: ErasedCheck) -> Self {
        Self { erased_check }
    }

    pub fn run<F, W>(&self, flash: &mut F, console: &mut Console<W>) -> Result<SelfTestReport, Error>
    where
        F: SerialFlash,
        W: Write,
    {
        let sector_size = flash.erase_size_at(0);
        let total_size = flash.total_size();
        if N == 0 || N > sector_size as usize {
            return Err(Error::Config(ConfigError::PacketExceedsSector));
        }
        let address = sector_size;
        debug!(
            "self-test at 0x{:x}, sector {} bytes, device {} bytes",
            address,
            sector_size,
            total_size
        );

        let written: [u8; N] = test_pattern();
        let mut received = [0u8; N];

        console.print(format_args!("\n1. Total Flash Size: {} bytes.\n", total_size));

        console.print(format_args!("\n1. Erasing {} bytes of memory.\n", sector_size));
        flash::erase(flash, address, sector_size)?;

        console.step(
            2,
            "Reading after Erase. Ensure that the data read is 0xFF for each byte.",
        );
        flash::read(flash, address, &mut received)?;
        console.hex_dump("Received Data", &received);
        if let Some(offset) = received.iter().position(|&b| b != ERASED_VALUE) {
            match self.erased_check {
                ErasedCheck::Strict => {
                    return Err(Error::NotErased {
                        offset,
                        value: received[offset],
                    });
                }
                ErasedCheck::ReportOnly => {
                    warn!("byte {} not erased: 0x{:x}", offset, received[offset]);
                }
            }
        }

        console.step(3, "Writing data to memory.");
        flash::write(flash, address, &written)?;
        console.hex_dump("Written Data", &written);

        console.step(4, "Reading back for verification.");
        let mut received = [0u8; N];
        flash::read(flash, address, &mut received)?;
        console.hex_dump("Received Data", &received);

        if let Some(offset) = first_mismatch(&written, &received) {
            return Err(Error::VerifyMismatch {
                offset,
                expected: written[offset],
                found: received[offset],
            });
        }

        console.success("Read data matches with written data!");
        info!("self-test passed, {} bytes verified", N);

        Ok(SelfTestReport {
            address,
            sector_size,
            total_size,
        })
    }
}

impl Default for SelfTest<PACKET_SIZE> {
    fn default() -> Self {
        Self::new(ErasedCheck::Strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Op, RamFlash};
    use embedded_storage::nor_flash::{NorFlash, NorFlashErrorKind, ReadNorFlash};

    const SECTOR: usize = 4096;
    type Flash = RamFlash<{ 4 * SECTOR }, SECTOR>;

    fn console() -> Console<String> {
        Console::new(String::new())
    }

    fn self_test() -> SelfTest {
        SelfTest::default()
    }

    #[test]
    fn pattern_wraps_at_256() {
        let p: [u8; 300] = test_pattern();
        assert_eq!(p[0], 0);
        assert_eq!(p[255], 255);
        assert_eq!(p[256], 0);
        assert_eq!(p[299], 43);
    }

    #[test]
    fn passes_on_healthy_device_and_skips_sector_zero() {
        let mut flash = Flash::new();
        let mut c = console();

        let report = self_test().run(&mut flash, &mut c).unwrap();

        assert_eq!(
            report,
            SelfTestReport {
                address: SECTOR as u32,
                sector_size: SECTOR as u32,
                total_size: 4 * SECTOR as u32,
            }
        );
        let expected: [u8; 64] = test_pattern();
        assert_eq!(&flash.contents()[SECTOR..SECTOR + 64], &expected);
        assert!(flash.contents()[..SECTOR].iter().all(|&b| b == 0xFF));
        assert_eq!(flash.counts().erase, 1);
        assert_eq!(flash.counts().write, 1);
        assert_eq!(flash.counts().read, 2);
        assert_eq!(flash.counts().xip, 0);

        let out = c.into_inner();
        assert!(out.contains("\n1. Total Flash Size: 16384 bytes.\n"));
        assert!(out.contains("\n1. Erasing 4096 bytes of memory.\n"));
        assert!(out.contains("SUCCESS: Read data matches with written data!"));
    }

    #[test]
    fn whole_sector_reads_erased_after_erase() {
        let mut flash = Flash::new();
        self_test()
            .run(&mut flash, &mut console())
            .unwrap();
        flash.erase(SECTOR as u32, 2 * SECTOR as u32).unwrap();

        let mut sector = [0u8; SECTOR];
        flash.read(SECTOR as u32, &mut sector).unwrap();
        assert!(sector.iter().all(|&b| b == ERASED_VALUE));
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut flash = Flash::new();
        self_test().run(&mut flash, &mut console()).unwrap();
        let first = flash.contents().to_vec();
        self_test().run(&mut flash, &mut console()).unwrap();
        assert_eq!(flash.contents(), &first[..]);
    }

    #[test]
    fn other_packet_sizes_round_trip() {
        let mut flash = Flash::new();
        SelfTest::<256>::new(ErasedCheck::Strict)
            .run(&mut flash, &mut console())
            .unwrap();
        let expected: [u8; 256] = test_pattern();
        assert_eq!(&flash.contents()[SECTOR..SECTOR + 256], &expected);
    }

    #[test]
    fn packet_larger_than_sector_is_rejected() {
        let mut flash = RamFlash::<{ 4 * 32 }, 32>::new();
        let err = SelfTest::<64>::new(ErasedCheck::Strict)
            .run(&mut flash, &mut console())
            .unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::PacketExceedsSector));
        assert_eq!(flash.counts().erase, 0);
    }

    #[test]
    fn erase_failure_stops_before_any_read() {
        let mut flash = Flash::new();
        flash.fail_after(Op::Erase, 0, NorFlashErrorKind::Other);
        let err = self_test()
            .run(&mut flash, &mut console())
            .unwrap_err();
        assert_eq!(
            err,
            Error::Erase {
                address: SECTOR as u32,
                kind: NorFlashErrorKind::Other
            }
        );
        assert_eq!(flash.counts().read, 0);
    }

    #[test]
    fn write_failure_is_reported() {
        let mut flash = Flash::new();
        flash.fail_after(Op::Write, 0, NorFlashErrorKind::Other);
        let err = self_test()
            .run(&mut flash, &mut console())
            .unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(flash.counts().read, 1);
    }

    #[test]
    fn stuck_bit_is_caught_by_strict_erase_check() {
        let mut flash = Flash::new();
        flash.stick_low(SECTOR + 5, 0x04);
        let err = self_test()
            .run(&mut flash, &mut console())
            .unwrap_err();
        assert_eq!(
            err,
            Error::NotErased {
                offset: 5,
                value: 0xFB
            }
        );
        assert_eq!(flash.counts().write, 0);
    }

    #[test]
    fn stuck_bit_surfaces_as_mismatch_in_report_only_mode() {
        let mut flash = Flash::new();
        flash.stick_low(SECTOR + 5, 0x04);
        let err = SelfTest::<64>::new(ErasedCheck::ReportOnly)
            .run(&mut flash, &mut console())
            .unwrap_err();
        assert_eq!(
            err,
            Error::VerifyMismatch {
                offset: 5,
                expected: 0x05,
                found: 0x01
            }
        );
    }
}
