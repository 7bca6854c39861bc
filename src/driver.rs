//! Driver registry descriptors (spec §4.1, §4.2, §9).
//!
//! Grounded on `examples/original_source/libnfc/nfc-internal.h`'s
//! `struct nfc_driver` function-pointer table, translated to a Rust trait
//! per SPEC_FULL.md §1.3: the vtable pointer is a non-owning `'static`
//! reference to a zero-sized descriptor per driver; all per-connection
//! state lives in the `Device` the descriptor's `open` returns.

use crate::device::Device;
use crate::error::Result;

/// Whether a driver's `scan()` merely enumerates or actively probes a bus
/// (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Talks to the bus and may disturb devices (UART/SPI/I²C probers).
    Intrusive,
    /// Merely enumerates (USB device lists, PC/SC reader lists).
    NotIntrusive,
}

/// One entry in `Context`'s driver registry.
pub trait DriverOps: Sync {
    /// The name used as the `driver_name` component of a connstring.
    fn name(&self) -> &'static str;

    fn scan_type(&self) -> ScanType;

    /// Enumerates connectable devices as fully-qualified connstrings.
    fn scan(&self) -> Vec<String>;

    /// Opens `specifier` (the connstring with the driver name and any
    /// leading/trailing colons already stripped), probing firmware
    /// version and completing any LOWVBAT wakeup before returning
    /// (spec §4.1/§4.5/§4.6). `baudrate` overrides the driver's default
    /// serial speed where applicable.
    fn open(&self, specifier: &str, baudrate: Option<u32>) -> Result<Device>;
}
