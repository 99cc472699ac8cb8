//! Human-readable console protocol.
//!
//! The console is best-effort diagnostics: write errors are dropped so a
//! missing or broken UART never changes how the sequence ends.

use core::fmt::{self, Write};

use crate::config::BYTES_PER_LINE;
use crate::error::Error;

/// ANSI clear screen + cursor home.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[;H";

const RULE: &str = "================================================================================";
const DUMP_RULE: &str = "-------------------------";
const SECTION_RULE: &str = "-------------------------------------------------------";

pub struct Console<W: Write> {
    out: W,
}

impl<W: Write> Console<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn inner(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Raw access for routines that print on their own.
    pub fn writer(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    pub fn print(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
    }

    pub fn banner(&mut self, board: &str) {
        self.print(format_args!(
            "{}*************** {}: External Flash Access in XIP Mode ***************\n\n",
            CLEAR_SCREEN, board
        ));
    }

    pub fn step(&mut self, number: u8, text: &str) {
        self.print(format_args!("\n{}. {}\n", number, text));
    }

    /// `title (n bytes):` followed by `0xNN ` per byte, 16 per line.
    pub fn hex_dump(&mut self, title: &str, buf: &[u8]) {
        self.print(format_args!(
            "\n{} ({} bytes):\n{}\n",
            title,
            buf.len(),
            DUMP_RULE
        ));
        for (index, byte) in buf.iter().enumerate() {
            self.print(format_args!("0x{:02X} ", byte));
            if (index + 1) % BYTES_PER_LINE == 0 {
                self.print(format_args!("\n"));
            }
        }
    }

    pub fn success(&mut self, text: &str) {
        self.print(format_args!("\n{RULE}\n\nSUCCESS: {text}\n\n{RULE}\n"));
    }

    pub fn failure(&mut self, error: &Error) {
        match error.placement_address() {
            Some(address) => self.print(format_args!(
                "\n{RULE}\nFAIL: {}\nAddress: 0x{:x}\n{RULE}\n",
                error.message(),
                address
            )),
            None => self.print(format_args!(
                "\n{RULE}\n\nFAIL: {}\nError Code: 0x{:08X}\n\n{RULE}\n",
                error.message(),
                error.code()
            )),
        }
    }

    /// Header line plus rule announcing an access into the XIP window.
    pub fn section(&mut self, text: &str, address: usize) {
        self.print(format_args!("\n{} 0x{:x}\n{}", text, address, SECTION_RULE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_storage::nor_flash::NorFlashErrorKind;

    fn console() -> Console<String> {
        Console::new(String::new())
    }

    #[test]
    fn banner_clears_screen_first() {
        let mut c = console();
        c.banner("PSoC 6 MCU");
        assert_eq!(
            c.inner().as_str(),
            "\x1b[2J\x1b[;H*************** PSoC 6 MCU: External Flash Access in XIP Mode ***************\n\n"
        );
    }

    #[test]
    fn hex_dump_breaks_every_sixteen_bytes() {
        let mut c = console();
        let buf: [u8; 18] = core::array::from_fn(|i| i as u8);
        c.hex_dump("Written Data", &buf);
        let out = c.into_inner();

        let mut lines = out.lines();
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("Written Data (18 bytes):"));
        assert_eq!(lines.next(), Some("-------------------------"));
        assert_eq!(
            lines.next(),
            Some("0x00 0x01 0x02 0x03 0x04 0x05 0x06 0x07 0x08 0x09 0x0A 0x0B 0x0C 0x0D 0x0E 0x0F ")
        );
        assert_eq!(lines.next(), Some("0x10 0x11 "));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn status_failure_prints_code() {
        let mut c = console();
        c.failure(&Error::Read {
            address: 0x1000,
            kind: NorFlashErrorKind::Other,
        });
        let out = c.into_inner();
        assert!(out.contains("\nFAIL: Reading memory failed\n"));
        assert!(out.contains("Error Code: 0x000003FF\n"));
    }

    #[test]
    fn placement_failure_prints_address() {
        let mut c = console();
        c.failure(&Error::Placement {
            symbol: crate::error::Symbol::Function,
            address: 0x0800_1234,
        });
        let out = c.into_inner();
        assert!(out.contains("FAIL: Function not found in external memory.\n"));
        assert!(out.contains("Address: 0x8001234\n"));
        assert!(!out.contains("Error Code"));
    }

    struct Broken;

    impl Write for Broken {
        fn write_str(&mut self, _: &str) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn write_errors_are_swallowed() {
        let mut c = Console::new(Broken);
        c.banner("x");
        c.hex_dump("y", &[1, 2, 3]);
        c.success("z");
    }
}
