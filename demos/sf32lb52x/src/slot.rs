// Generated by qspi-xip-memslot. Do not edit.

pub const SLOT: ::qspi_xip::MemorySlot = ::qspi_xip::MemorySlot {
    name: "sf32lb52x-data",
    base_address: 0x12220000,
    total_size: 0x100000,
    erase_size: 0x1000,
    program_size: 256,
    data_width: ::qspi_xip::BusWidth::Quad,
};

pub const FLASH: ::qspi_xip::FlashConfig = ::qspi_xip::FlashConfig {
    slot: SLOT,
    bus_frequency_hz: 50000000,
};
