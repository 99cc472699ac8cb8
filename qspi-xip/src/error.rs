use core::fmt;

use embedded_storage::nor_flash::NorFlashErrorKind;

use crate::config::ConfigError;

/// Which linker-placed symbol a placement check was about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Symbol {
    String,
    Function,
}

/// Every way the demonstration can end in the failure state.
///
/// None of these are recoverable: the sequencer prints the diagnostic
/// block, lights the LED and stops.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    Config(ConfigError),
    Init {
        kind: NorFlashErrorKind,
    },
    Erase {
        address: u32,
        kind: NorFlashErrorKind,
    },
    Read {
        address: u32,
        kind: NorFlashErrorKind,
    },
    Write {
        address: u32,
        kind: NorFlashErrorKind,
    },
    /// A byte read right after the erase was not [`crate::ERASED_VALUE`].
    NotErased {
        offset: usize,
        value: u8,
    },
    VerifyMismatch {
        offset: usize,
        expected: u8,
        found: u8,
    },
    Placement {
        symbol: Symbol,
        address: usize,
    },
    /// [`crate::XipDemo::run`] called again after a successful run.
    AlreadyRun,
}

const INIT_PREFIX: u32 = 0x0100;
const ERASE_PREFIX: u32 = 0x0200;
const READ_PREFIX: u32 = 0x0300;
const WRITE_PREFIX: u32 = 0x0400;
const CONFIG_PREFIX: u32 = 0x0500;
const ALREADY_RUN: u32 = 0x0600;

const fn kind_code(kind: NorFlashErrorKind) -> u32 {
    match kind {
        NorFlashErrorKind::NotAligned => 0x01,
        NorFlashErrorKind::OutOfBounds => 0x02,
        _ => 0xFF,
    }
}

impl Error {
    /// Console text for the failure block.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Config(_) => "Memory slot configuration is invalid",
            Self::Init { .. } => "Serial Flash initialization failed",
            Self::Erase { .. } => "Erasing memory failed",
            Self::Read { .. } => "Reading memory failed",
            Self::Write { .. } => "Writing to memory failed",
            Self::NotErased { .. } => "Erased memory does not read back as 0xFF",
            Self::VerifyMismatch { .. } => {
                "Read data does not match with written data. Read/Write operation failed."
            }
            Self::Placement {
                symbol: Symbol::String,
                ..
            } => "String not found in external memory.",
            Self::Placement {
                symbol: Symbol::Function,
                ..
            } => "Function not found in external memory.",
            Self::AlreadyRun => "Demonstration has already run",
        }
    }

    /// Numeric status printed as `Error Code: 0x%08X`.
    ///
    /// Driver failures carry an operation prefix; compare failures carry the
    /// offending buffer offset (plus one, so offset 0 is non-zero).
    /// Placement failures have no code and return 0; their address comes
    /// from [`Error::placement_address`].
    pub const fn code(&self) -> u32 {
        match *self {
            Self::Config(e) => CONFIG_PREFIX | e.code(),
            Self::Init { kind } => INIT_PREFIX | kind_code(kind),
            Self::Erase { kind, .. } => ERASE_PREFIX | kind_code(kind),
            Self::Read { kind, .. } => READ_PREFIX | kind_code(kind),
            Self::Write { kind, .. } => WRITE_PREFIX | kind_code(kind),
            Self::NotErased { offset, .. } | Self::VerifyMismatch { offset, .. } => {
                offset as u32 + 1
            }
            Self::Placement { .. } => 0,
            Self::AlreadyRun => ALREADY_RUN,
        }
    }

    /// Placement failures report an address instead of a status code.
    pub const fn placement_address(&self) -> Option<usize> {
        match *self {
            Self::Placement { address, .. } => Some(address),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Config(e) => write!(f, "{}: {}", self.message(), e),
            Self::Placement { address, .. } => {
                write!(f, "{} (address 0x{:x})", self.message(), address)
            }
            Self::NotErased { offset, value } => {
                write!(f, "{} (offset {}: 0x{:02X})", self.message(), offset, value)
            }
            Self::VerifyMismatch {
                offset,
                expected,
                found,
            } => write!(
                f,
                "{} (offset {}: expected 0x{:02X}, found 0x{:02X})",
                self.message(),
                offset,
                expected,
                found
            ),
            _ => write!(f, "{} (code 0x{:08X})", self.message(), self.code()),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match *self {
            Error::Config(e) => defmt::write!(f, "{}: {}", self.message(), e),
            Error::Placement { symbol, address } => {
                defmt::write!(f, "{} {} at 0x{=usize:x}", self.message(), symbol, address)
            }
            _ => defmt::write!(f, "{} (code 0x{=u32:08X})", self.message(), self.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_errors_carry_operation_prefix() {
        let e = Error::Erase {
            address: 0x1000,
            kind: NorFlashErrorKind::NotAligned,
        };
        assert_eq!(e.code(), 0x0201);

        let e = Error::Read {
            address: 0x1000,
            kind: NorFlashErrorKind::Other,
        };
        assert_eq!(e.code(), 0x03FF);

        let e = Error::Init {
            kind: NorFlashErrorKind::OutOfBounds,
        };
        assert_eq!(e.code(), 0x0102);
    }

    #[test]
    fn compare_failures_are_never_zero() {
        let e = Error::VerifyMismatch {
            offset: 0,
            expected: 0x00,
            found: 0xFF,
        };
        assert_ne!(e.code(), 0);
    }

    #[test]
    fn placement_messages_name_the_symbol() {
        let s = Error::Placement {
            symbol: Symbol::String,
            address: 0x10,
        };
        let f = Error::Placement {
            symbol: Symbol::Function,
            address: 0x10,
        };
        assert_eq!(s.message(), "String not found in external memory.");
        assert_eq!(f.message(), "Function not found in external memory.");
        assert_eq!(s.placement_address(), Some(0x10));
    }

    #[test]
    fn placement_code_does_not_truncate_the_address() {
        let e = Error::Placement {
            symbol: Symbol::Function,
            address: 0x1_2000_0000,
        };
        assert_eq!(e.code(), 0);
        assert_eq!(e.placement_address(), Some(0x1_2000_0000));
        let e = Error::Read {
            address: 0,
            kind: NorFlashErrorKind::Other,
        };
        assert_eq!(e.placement_address(), None);
    }

    #[test]
    fn display_includes_code() {
        let e = Error::Write {
            address: 0,
            kind: NorFlashErrorKind::Other,
        };
        assert_eq!(
            e.to_string(),
            "Writing to memory failed (code 0x000004FF)"
        );
    }
}
