#![cfg_attr(not(test), no_std)]
#![doc = "Serial NOR flash self-test and execute-in-place (XIP) verification."]
#![doc = ""]
#![doc = "Erases, programs and reads back one sector of a QSPI-attached flash, then"]
#![doc = "switches the controller to memory-mapped mode and uses a string and a"]
#![doc = "routine linked into the external window. The driver is anything that"]
#![doc = "implements [`SerialFlash`]."]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod flash;
pub mod selftest;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod xip;

pub use app::{park, Indicator, State, XipDemo};
pub use config::{
    ActiveLevel, BuiltInSlot, BusWidth, ConfigError, DemoConfig, ErasedCheck, FlashConfig,
    MemorySlot, PACKET_SIZE, QSPI_BUS_FREQUENCY_HZ,
};
pub use console::Console;
pub use error::{Error, Symbol};
pub use flash::{SerialFlash, ERASED_VALUE};
pub use selftest::{SelfTest, SelfTestReport};
pub use xip::{check_placement, enter_xip, ExternalImage, ExternalRoutine, ExternalText};
