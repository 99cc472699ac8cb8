//! Memory-slot geometry and demo configuration.
//!
//! A [`MemorySlot`] describes one QSPI-attached device: where its
//! memory-mapped window starts, how large it is and how it erases. It is
//! passed explicitly to the driver's init closure through [`FlashConfig`].

/// Bytes moved per self-test transfer.
pub const PACKET_SIZE: usize = 64;
/// Bytes printed per hex-dump line.
pub const BYTES_PER_LINE: usize = 16;
/// Idle blink half-period.
pub const LED_TOGGLE_DELAY_MS: u32 = 1000;
/// Default QSPI bus clock.
pub const QSPI_BUS_FREQUENCY_HZ: u32 = 50_000_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusWidth {
    Single,
    Dual,
    Quad,
    Octal,
}

impl BusWidth {
    pub const fn lines(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Dual => 2,
            Self::Quad => 4,
            Self::Octal => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    ZeroSize,
    EraseSizeNotPowerOfTwo,
    ProgramSizeNotPowerOfTwo,
    ProgramExceedsErase,
    SizeNotSectorMultiple,
    TooFewSectors,
    WindowOverflow,
    ZeroBusFrequency,
    ZeroBlinkPeriod,
    PacketExceedsSector,
}

impl ConfigError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ZeroSize => "memory slot has a zero size field",
            Self::EraseSizeNotPowerOfTwo => "erase size is not a power of two",
            Self::ProgramSizeNotPowerOfTwo => "program size is not a power of two",
            Self::ProgramExceedsErase => "program size exceeds erase size",
            Self::SizeNotSectorMultiple => "total size is not a multiple of the erase size",
            Self::TooFewSectors => "device holds fewer than two erase sectors",
            Self::WindowOverflow => "memory-mapped window wraps the address space",
            Self::ZeroBusFrequency => "bus frequency is zero",
            Self::ZeroBlinkPeriod => "blink period is zero",
            Self::PacketExceedsSector => "self-test packet is empty or larger than a sector",
        }
    }

    pub(crate) const fn code(self) -> u32 {
        match self {
            Self::ZeroSize => 0x01,
            Self::EraseSizeNotPowerOfTwo => 0x02,
            Self::ProgramSizeNotPowerOfTwo => 0x03,
            Self::ProgramExceedsErase => 0x04,
            Self::SizeNotSectorMultiple => 0x05,
            Self::TooFewSectors => 0x06,
            Self::WindowOverflow => 0x07,
            Self::ZeroBusFrequency => 0x08,
            Self::ZeroBlinkPeriod => 0x09,
            Self::PacketExceedsSector => 0x0A,
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry of one attached flash device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemorySlot {
    pub name: &'static str,
    /// First address of the memory-mapped (XIP) window.
    pub base_address: usize,
    pub total_size: u32,
    pub erase_size: u32,
    pub program_size: u32,
    pub data_width: BusWidth,
}

impl MemorySlot {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_size == 0 || self.erase_size == 0 || self.program_size == 0 {
            return Err(ConfigError::ZeroSize);
        }
        if !self.erase_size.is_power_of_two() {
            return Err(ConfigError::EraseSizeNotPowerOfTwo);
        }
        if !self.program_size.is_power_of_two() {
            return Err(ConfigError::ProgramSizeNotPowerOfTwo);
        }
        if self.program_size > self.erase_size {
            return Err(ConfigError::ProgramExceedsErase);
        }
        if self.total_size % self.erase_size != 0 {
            return Err(ConfigError::SizeNotSectorMultiple);
        }
        // Sector 0 is left alone, so at least one more sector is needed.
        if self.sector_count() < 2 {
            return Err(ConfigError::TooFewSectors);
        }
        if self.window_end().is_none() {
            return Err(ConfigError::WindowOverflow);
        }
        Ok(())
    }

    pub const fn sector_count(&self) -> u32 {
        self.total_size / self.erase_size
    }

    /// One past the last mapped address, `None` if the window wraps.
    pub fn window_end(&self) -> Option<usize> {
        self.base_address.checked_add(self.total_size as usize)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BuiltInSlot {
    /// Infineon S25FL512S, 64 MiB uniform 256 KiB sectors, PSoC 6 SMIF window.
    S25fl512s,
    /// Infineon S25FL128S, 16 MiB uniform 64 KiB sectors, PSoC 6 SMIF window.
    S25fl128s,
    /// Winbond W25Q128, 16 MiB with 4 KiB sectors, SF32LB52x MPI2 window.
    W25q128,
}

static S25FL512S: MemorySlot = MemorySlot {
    name: "s25fl512s",
    base_address: 0x1800_0000,
    total_size: 64 * 1024 * 1024,
    erase_size: 256 * 1024,
    program_size: 512,
    data_width: BusWidth::Quad,
};

static S25FL128S: MemorySlot = MemorySlot {
    name: "s25fl128s",
    base_address: 0x1800_0000,
    total_size: 16 * 1024 * 1024,
    erase_size: 64 * 1024,
    program_size: 256,
    data_width: BusWidth::Quad,
};

static W25Q128: MemorySlot = MemorySlot {
    name: "w25q128",
    base_address: 0x1200_0000,
    total_size: 16 * 1024 * 1024,
    erase_size: 4096,
    program_size: 256,
    data_width: BusWidth::Quad,
};

impl BuiltInSlot {
    pub fn slot(self) -> &'static MemorySlot {
        match self {
            Self::S25fl512s => &S25FL512S,
            Self::S25fl128s => &S25FL128S,
            Self::W25q128 => &W25Q128,
        }
    }
}

/// Everything the driver collaborator needs to bring the device up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlashConfig {
    pub slot: MemorySlot,
    pub bus_frequency_hz: u32,
}

impl FlashConfig {
    pub const fn new(slot: MemorySlot) -> Self {
        Self {
            slot,
            bus_frequency_hz: QSPI_BUS_FREQUENCY_HZ,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus_frequency_hz == 0 {
            return Err(ConfigError::ZeroBusFrequency);
        }
        self.slot.validate()
    }
}

impl From<BuiltInSlot> for FlashConfig {
    fn from(slot: BuiltInSlot) -> Self {
        Self::new(*slot.slot())
    }
}

/// Logic level that lights the user LED.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActiveLevel {
    High,
    Low,
}

/// What to do with the bytes read back right after the erase.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErasedCheck {
    /// Every byte must read back as [`crate::ERASED_VALUE`].
    Strict,
    /// Print the bytes and leave the judgement to whoever reads the console.
    ReportOnly,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DemoConfig {
    /// Shown in the startup banner.
    pub board_name: &'static str,
    pub flash: FlashConfig,
    pub led_active_level: ActiveLevel,
    pub blink_period_ms: u32,
    pub erased_check: ErasedCheck,
}

impl DemoConfig {
    pub const fn new(board_name: &'static str, flash: FlashConfig) -> Self {
        Self {
            board_name,
            flash,
            led_active_level: ActiveLevel::Low,
            blink_period_ms: LED_TOGGLE_DELAY_MS,
            erased_check: ErasedCheck::Strict,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blink_period_ms == 0 {
            return Err(ConfigError::ZeroBlinkPeriod);
        }
        self.flash.validate()
    }
}
