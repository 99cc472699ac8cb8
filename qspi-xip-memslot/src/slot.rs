use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use qspi_xip::{BusWidth, MemorySlot, QSPI_BUS_FREQUENCY_HZ};

/// Size or address as written in the HJSON file.
///
/// Accepts plain integers, `0x`-prefixed hex and `K`/`M` suffixed sizes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

impl Number {
    fn value(&self, field: &str) -> Result<u64> {
        match self {
            Number::Int(v) => Ok(*v),
            Number::Text(s) => parse_number(s).with_context(|| format!("invalid `{field}`")),
        }
    }
}

pub fn parse_number(text: &str) -> Result<u64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).map_err(|e| anyhow!("`{text}`: {e}"));
    }

    let (digits, scale) = match cleaned.chars().last() {
        Some('K' | 'k') => (&cleaned[..cleaned.len() - 1], 1024),
        Some('M' | 'm') => (&cleaned[..cleaned.len() - 1], 1024 * 1024),
        _ => (cleaned.as_str(), 1),
    };
    let value: u64 = digits.parse().map_err(|e| anyhow!("`{text}`: {e}"))?;
    value
        .checked_mul(scale)
        .ok_or_else(|| anyhow!("`{text}` overflows"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Width {
    Lines(u8),
    Name(String),
}

impl Width {
    fn bus_width(&self) -> Result<BusWidth> {
        let width = match self {
            Width::Lines(1) => BusWidth::Single,
            Width::Lines(2) => BusWidth::Dual,
            Width::Lines(4) => BusWidth::Quad,
            Width::Lines(8) => BusWidth::Octal,
            Width::Name(name) => match name.to_ascii_lowercase().as_str() {
                "single" => BusWidth::Single,
                "dual" => BusWidth::Dual,
                "quad" => BusWidth::Quad,
                "octal" => BusWidth::Octal,
                other => bail!("unknown data width `{other}`"),
            },
            Width::Lines(other) => bail!("unsupported number of data lines: {other}"),
        };
        Ok(width)
    }
}

#[derive(Debug, Deserialize)]
pub struct Sections {
    #[serde(default = "default_rodata")]
    pub rodata: String,
    #[serde(default = "default_text")]
    pub text: String,
}

fn default_rodata() -> String {
    ".xip_rodata".into()
}

fn default_text() -> String {
    ".xip_text".into()
}

impl Default for Sections {
    fn default() -> Self {
        Self {
            rodata: default_rodata(),
            text: default_text(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SlotFile {
    name: String,
    base_address: Number,
    total_size: Number,
    erase_size: Number,
    program_size: Number,
    data_width: Width,
    bus_frequency_hz: Option<Number>,
    #[serde(default)]
    sections: Sections,
}

/// A checked slot description.
#[derive(Debug)]
pub struct SlotSpec {
    pub name: String,
    pub base_address: u32,
    pub total_size: u32,
    pub erase_size: u32,
    pub program_size: u32,
    pub data_width: BusWidth,
    pub bus_frequency_hz: u32,
    pub sections: Sections,
}

fn to_u32(value: u64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("`{field}` = {value:#x} does not fit in 32 bits"))
}

impl SlotSpec {
    pub fn from_hjson(text: &str) -> Result<Self> {
        let file: SlotFile = serde_hjson::from_str(text).context("malformed slot description")?;

        let valid_name = file
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if file.name.is_empty() || !valid_name {
            bail!("slot name `{}` may only use ASCII letters, digits, `_` and `-`", file.name);
        }

        let spec = SlotSpec {
            base_address: to_u32(file.base_address.value("base_address")?, "base_address")?,
            total_size: to_u32(file.total_size.value("total_size")?, "total_size")?,
            erase_size: to_u32(file.erase_size.value("erase_size")?, "erase_size")?,
            program_size: to_u32(file.program_size.value("program_size")?, "program_size")?,
            data_width: file.data_width.bus_width()?,
            bus_frequency_hz: match &file.bus_frequency_hz {
                Some(n) => to_u32(n.value("bus_frequency_hz")?, "bus_frequency_hz")?,
                None => QSPI_BUS_FREQUENCY_HZ,
            },
            name: file.name,
            sections: file.sections,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<()> {
        let slot = MemorySlot {
            name: "",
            base_address: self.base_address as usize,
            total_size: self.total_size,
            erase_size: self.erase_size,
            program_size: self.program_size,
            data_width: self.data_width,
        };
        slot.validate()
            .map_err(|e| anyhow!("slot `{}`: {e}", self.name))?;
        // The target is 32-bit even when this tool is not.
        if u64::from(self.base_address) + u64::from(self.total_size) > 1 << 32 {
            bail!("slot `{}`: memory-mapped window wraps the 32-bit address space", self.name);
        }
        if self.bus_frequency_hz == 0 {
            bail!("slot `{}`: bus frequency is zero", self.name);
        }
        for section in [&self.sections.rodata, &self.sections.text] {
            if !section.starts_with('.') || section.contains(char::is_whitespace) {
                bail!("section name `{section}` must start with `.` and contain no spaces");
            }
        }
        Ok(())
    }

    pub fn sector_count(&self) -> u32 {
        self.total_size / self.erase_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W25Q128: &str = r#"
    {
      # board flash, code-bus window of MPI2
      name: w25q128
      base_address: 0x1200_0000
      total_size: 16M
      erase_size: 4K
      program_size: 256
      data_width: quad
    }
    "#;

    #[test]
    fn numbers_accept_hex_and_suffixes() {
        assert_eq!(parse_number("0x18000000").unwrap(), 0x1800_0000);
        assert_eq!(parse_number("0x1800_0000").unwrap(), 0x1800_0000);
        assert_eq!(parse_number("256K").unwrap(), 256 * 1024);
        assert_eq!(parse_number("64M").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_number("512").unwrap(), 512);
        assert!(parse_number("12Q").is_err());
        assert!(parse_number("0xZZ").is_err());
    }

    #[test]
    fn parses_quoteless_hjson() {
        let spec = SlotSpec::from_hjson(W25Q128).unwrap();
        assert_eq!(spec.name, "w25q128");
        assert_eq!(spec.base_address, 0x1200_0000);
        assert_eq!(spec.total_size, 16 * 1024 * 1024);
        assert_eq!(spec.erase_size, 4096);
        assert_eq!(spec.program_size, 256);
        assert_eq!(spec.data_width, BusWidth::Quad);
        assert_eq!(spec.bus_frequency_hz, 50_000_000);
        assert_eq!(spec.sections.rodata, ".xip_rodata");
        assert_eq!(spec.sector_count(), 4096);
    }

    #[test]
    fn integer_fields_and_custom_sections() {
        let spec = SlotSpec::from_hjson(
            r#"{
                "name": "s25fl512s",
                "base_address": 402653184,
                "total_size": "64M",
                "erase_size": "256K",
                "program_size": 512,
                "data_width": 4,
                "bus_frequency_hz": 80000000,
                "sections": { "rodata": ".cy_xip", "text": ".cy_xip_code" }
            }"#,
        )
        .unwrap();
        assert_eq!(spec.base_address, 0x1800_0000);
        assert_eq!(spec.bus_frequency_hz, 80_000_000);
        assert_eq!(spec.sections.text, ".cy_xip_code");
    }

    #[test]
    fn geometry_errors_come_from_the_library() {
        let bad = W25Q128.replace("erase_size: 4K", "erase_size: 3000");
        let err = SlotSpec::from_hjson(&bad).unwrap_err();
        assert!(err.to_string().contains("erase size is not a power of two"), "{err}");
    }

    #[test]
    fn window_past_4gib_is_rejected() {
        let bad = W25Q128.replace("0x1200_0000", "0xFF80_0000");
        let err = SlotSpec::from_hjson(&bad).unwrap_err();
        assert!(err.to_string().contains("32-bit"), "{err}");
    }

    #[test]
    fn unknown_width_is_rejected() {
        let bad = W25Q128.replace("data_width: quad", "data_width: hexa");
        assert!(SlotSpec::from_hjson(&bad).is_err());
    }
}
