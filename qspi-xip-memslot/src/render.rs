use std::fmt::Write as _;

use qspi_xip::BusWidth;

use crate::slot::SlotSpec;

const HEADER: &str = "Generated by qspi-xip-memslot. Do not edit.";

fn width_variant(width: BusWidth) -> &'static str {
    match width {
        BusWidth::Single => "Single",
        BusWidth::Dual => "Dual",
        BusWidth::Quad => "Quad",
        BusWidth::Octal => "Octal",
    }
}

/// `MemorySlot` and `FlashConfig` constants for `include!`.
pub fn rust_source(spec: &SlotSpec) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "// {HEADER}\n\
         \n\
         pub const SLOT: ::qspi_xip::MemorySlot = ::qspi_xip::MemorySlot {{\n\
         \x20   name: {name:?},\n\
         \x20   base_address: {base:#010x},\n\
         \x20   total_size: {total:#x},\n\
         \x20   erase_size: {erase:#x},\n\
         \x20   program_size: {program},\n\
         \x20   data_width: ::qspi_xip::BusWidth::{width},\n\
         }};\n\
         \n\
         pub const FLASH: ::qspi_xip::FlashConfig = ::qspi_xip::FlashConfig {{\n\
         \x20   slot: SLOT,\n\
         \x20   bus_frequency_hz: {freq},\n\
         }};\n",
        name = spec.name,
        base = spec.base_address,
        total = spec.total_size,
        erase = spec.erase_size,
        program = spec.program_size,
        width = width_variant(spec.data_width),
        freq = spec.bus_frequency_hz,
    );
    out
}

/// Linker fragment mapping the XIP sections onto the slot window.
///
/// Meant to be passed after `link.x`; `INSERT AFTER` keeps the default
/// script intact.
pub fn linker_script(spec: &SlotSpec) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "/* {HEADER} Slot: {name} */\n\
         MEMORY\n\
         {{\n\
         \x20 XIP_FLASH : ORIGIN = {base:#010x}, LENGTH = {total:#010x}\n\
         }}\n\
         \n\
         SECTIONS\n\
         {{\n\
         \x20 {rodata} : ALIGN(4)\n\
         \x20 {{\n\
         \x20   KEEP(*({rodata} {rodata}.*))\n\
         \x20 }} > XIP_FLASH\n\
         \n\
         \x20 {text} : ALIGN(4)\n\
         \x20 {{\n\
         \x20   KEEP(*({text} {text}.*))\n\
         \x20 }} > XIP_FLASH\n\
         }} INSERT AFTER .rodata;\n",
        name = spec.name,
        base = spec.base_address,
        total = spec.total_size,
        rodata = spec.sections.rodata,
        text = spec.sections.text,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SlotSpec {
        SlotSpec::from_hjson(
            r#"{
                name: s25fl512s
                base_address: 0x18000000
                total_size: 64M
                erase_size: 256K
                program_size: 512
                data_width: quad
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn region_matches_slot_window() {
        let script = linker_script(&spec());
        assert!(script.contains("XIP_FLASH : ORIGIN = 0x18000000, LENGTH = 0x04000000\n"));
        assert!(script.contains("KEEP(*(.xip_rodata .xip_rodata.*))\n  } > XIP_FLASH"));
        assert!(script.contains("KEEP(*(.xip_text .xip_text.*))\n  } > XIP_FLASH"));
        assert!(script.ends_with("} INSERT AFTER .rodata;\n"));
    }

    #[test]
    fn rust_constants_carry_geometry() {
        let src = rust_source(&spec());
        assert!(src.contains("name: \"s25fl512s\",\n"));
        assert!(src.contains("base_address: 0x18000000,\n"));
        assert!(src.contains("total_size: 0x4000000,\n"));
        assert!(src.contains("erase_size: 0x40000,\n"));
        assert!(src.contains("program_size: 512,\n"));
        assert!(src.contains("data_width: ::qspi_xip::BusWidth::Quad,\n"));
        assert!(src.contains("bus_frequency_hz: 50000000,\n"));
    }
}
