#![no_std]
#![no_main]

//! Self-test of the on-board NOR data partition, then a string and a
//! routine used straight from the memory-mapped window.
//!
//! Hardware:
//!   MPI2: on-board NOR, code bus window 0x1200_0000..0x1300_0000
//!   PA18/PA19: UART1 TX/RX (console, 1Mbps)
//!   PA1: LCD backlight, used as the status indicator

use core::fmt;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_time::Delay;
use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
};
use qspi_xip::{
    ActiveLevel, DemoConfig, ExternalImage, ExternalRoutine, ExternalText, MemorySlot,
    SerialFlash, XipDemo,
};
use sifli_hal::gpio::{Level, Output};
use sifli_hal::mpi::{BlockingNorFlash, BuiltInProfile, Error, NorConfig, ProfileSource};
use sifli_hal::peripherals::MPI2;
use sifli_hal::usart::{Config as UartConfig, Uart};
use {defmt_rtt as _, panic_probe as _};

#[path = "../slot.rs"]
mod slot;

const FLASH_CODE_BUS_BASE: usize = 0x1200_0000;
const FLASH_CODE_BUS_END: usize = 0x1300_0000;

#[link_section = ".xip_rodata"]
#[used]
static HI_WORD: [u8; 32] = *b"Hello from the external string!\n";

#[link_section = ".xip_text"]
#[inline(never)]
fn print_from_external_memory(out: &mut dyn fmt::Write, text: &str) -> fmt::Result {
    out.write_str(text)
}

fn bounds(r: Result<(), NorFlashErrorKind>) -> Result<(), Error> {
    r.map_err(|kind| match kind {
        NorFlashErrorKind::NotAligned => Error::NotAligned,
        _ => Error::OutOfBounds,
    })
}

/// One partition of the boot flash, addressed from 0.
struct DataPartition<'d> {
    flash: BlockingNorFlash<'d, MPI2>,
    offset: u32,
    size: u32,
}

impl<'d> DataPartition<'d> {
    fn new(flash: BlockingNorFlash<'d, MPI2>, slot: &MemorySlot) -> Result<Self, Error> {
        let window_end = slot.window_end().ok_or(Error::CapacityExceedsWindow)?;
        if slot.base_address < FLASH_CODE_BUS_BASE || window_end > FLASH_CODE_BUS_END {
            return Err(Error::CapacityExceedsWindow);
        }
        let offset = (slot.base_address - FLASH_CODE_BUS_BASE) as u32;
        if offset as usize + slot.total_size as usize > flash.capacity() {
            return Err(Error::CapacityExceedsWindow);
        }
        if slot.erase_size as usize != <Self as NorFlash>::ERASE_SIZE {
            return Err(Error::InvalidConfiguration);
        }

        Ok(Self {
            flash,
            offset,
            size: slot.total_size,
        })
    }
}

impl ErrorType for DataPartition<'_> {
    type Error = Error;
}

impl ReadNorFlash for DataPartition<'_> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        bounds(check_read(self, offset, bytes.len()))?;
        self.flash.read(self.offset + offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.size as usize
    }
}

impl NorFlash for DataPartition<'_> {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = 4096;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        bounds(check_erase(self, from, to))?;
        self.flash.erase(self.offset + from, self.offset + to)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        bounds(check_write(self, offset, bytes.len()))?;
        self.flash.write(self.offset + offset, bytes)
    }
}

impl SerialFlash for DataPartition<'_> {
    // MPI2 keeps its AHB read path mapped while the blocking driver issues
    // commands, so there is nothing to switch on this part.
    fn set_xip(&mut self, enable: bool) {
        info!("MPI2 XIP {}", if enable { "on" } else { "off" });
    }
}

/// `core::fmt::Write` over the UART, with CRLF line endings.
struct UartConsole<W>(W);

impl<W: embedded_io::Write> fmt::Write for UartConsole<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut lines = s.split('\n');
        if let Some(first) = lines.next() {
            self.0.write_all(first.as_bytes()).map_err(|_| fmt::Error)?;
        }
        for line in lines {
            self.0.write_all(b"\r\n").map_err(|_| fmt::Error)?;
            self.0.write_all(line.as_bytes()).map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("QSPI XIP demo");
    let p = sifli_hal::init(Default::default());

    let mut uart_config = UartConfig::default();
    uart_config.baudrate = 1000000;
    let usart = Uart::new_blocking(p.USART1, p.PA18, p.PA19, uart_config).unwrap();
    let led = Output::new(p.PA1, Level::Low);

    let mut config = DemoConfig::new("SF32LB52x", slot::FLASH);
    config.led_active_level = ActiveLevel::High;

    let text = unwrap!(ExternalText::from_bytes(&HI_WORD));
    let image = ExternalImage::new(text, ExternalRoutine::new(print_from_external_memory));
    info!(
        "string at 0x{=usize:08X}, routine at 0x{=usize:08X}",
        image.text.address(),
        image.routine.address()
    );

    let mut demo = XipDemo::new(config, UartConsole(usart), led, Delay);
    let mpi2 = p.MPI2;
    let result = demo.run(
        |flash_config| {
            // Explicit XIP-safe constructor: the application runs from this flash.
            let flash = BlockingNorFlash::new_blocking_without_reset(
                mpi2,
                ProfileSource::BuiltIn(BuiltInProfile::CommonSpiNor16MiB),
                NorConfig::default(),
            )?;
            DataPartition::new(flash, &flash_config.slot)
        },
        &image,
    );

    match &result {
        Ok(_) => info!("demo passed, blinking"),
        Err(e) => defmt::error!("demo failed: {}", e),
    }
    demo.finish(result)
}
