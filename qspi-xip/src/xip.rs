//! Memory-mapped access to code and data linked into external flash.
//!
//! The firmware places one string in `.xip_rodata` and one routine in
//! `.xip_text`; the linker fragment produced by `qspi-xip-memslot` maps both
//! sections onto the flash window. Once the controller is in XIP mode, both
//! are used through plain pointers. The upper end of the window is enforced
//! by the length of the linker region, so only the base is checked here.

use core::fmt::{self, Write};

use crate::console::Console;
use crate::error::{Error, Symbol};
use crate::flash::SerialFlash;

/// Text handed to the external routine.
pub const EXTERNAL_GREETING: &str = "\nHello from the external function!\n";

/// Signature of a routine that runs out of the XIP window.
pub type RoutineFn = fn(&mut dyn Write, &str) -> fmt::Result;

/// A string whose bytes live in external flash.
#[derive(Clone, Copy, Debug)]
pub struct ExternalText(&'static str);

impl ExternalText {
    pub const fn new(text: &'static str) -> Self {
        Self(text)
    }

    /// Wraps a byte array placed with `#[link_section]`.
    pub fn from_bytes(bytes: &'static [u8]) -> Option<Self> {
        core::str::from_utf8(bytes).ok().map(Self)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Run-time address of the first byte.
    pub fn address(&self) -> usize {
        self.0.as_ptr() as usize
    }
}

/// A function whose code lives in external flash.
#[derive(Clone, Copy)]
pub struct ExternalRoutine {
    entry: RoutineFn,
}

impl ExternalRoutine {
    pub const fn new(entry: RoutineFn) -> Self {
        Self { entry }
    }

    pub fn address(&self) -> usize {
        self.entry as usize
    }

    pub fn call(&self, out: &mut dyn Write, text: &str) -> fmt::Result {
        (self.entry)(out, text)
    }
}

impl fmt::Debug for ExternalRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalRoutine")
            .field("address", &format_args!("0x{:x}", self.address()))
            .finish()
    }
}

/// The pair of symbols exercised after switching to XIP.
#[derive(Clone, Copy, Debug)]
pub struct ExternalImage {
    pub text: ExternalText,
    pub routine: ExternalRoutine,
}

impl ExternalImage {
    pub const fn new(text: ExternalText, routine: ExternalRoutine) -> Self {
        Self { text, routine }
    }
}

/// `address` must not lie below the start of the mapped window.
pub fn check_placement(base: usize, symbol: Symbol, address: usize) -> Result<(), Error> {
    if base > address {
        return Err(Error::Placement { symbol, address });
    }
    Ok(())
}

/// Switches `flash` into XIP mode and uses both symbols of `image` from the
/// window starting at `base`.
pub fn enter_xip<F, W>(
    flash: &mut F,
    console: &mut Console<W>,
    base: usize,
    image: &ExternalImage,
) -> Result<(), Error>
where
    F: SerialFlash,
    W: Write,
{
    console.step(5, "Entering XIP Mode.");
    flash.set_xip(true);
    debug!("xip enabled, window base 0x{:x}", base);

    let address = image.text.address();
    check_placement(base, Symbol::String, address)?;
    console.section("String in the external memory at address:", address);
    console.print(format_args!("\n{}", image.text.as_str()));

    let address = image.routine.address();
    check_placement(base, Symbol::Function, address)?;
    console.section("Function call from external memory address:", address);
    if image
        .routine
        .call(console.writer(), EXTERNAL_GREETING)
        .is_err()
    {
        warn!("external routine could not write to the console");
    }

    console.success("Data successfully accessed in XIP mode!");
    info!("xip verification passed");
    Ok(())
}
