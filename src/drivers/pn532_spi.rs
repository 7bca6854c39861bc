//! SPI driver for PN532 boards (spec §6.2, §6.3): `specifier` is a Linux
//! spidev path (e.g. `/dev/spidev0.0`), opened at PN532's fixed mode-0,
//! 1 MHz operating point via `linux-embedded-hal`.

use linux_embedded_hal::SpidevDevice;
use spidev::{SpiModeFlags, SpidevOptions};

use crate::device::{Device, DEFAULT_TIMEOUT};
use crate::driver::{DriverOps, ScanType};
use crate::drivers::finish_open;
use crate::error::{IoErrorKind, Result, TransportError};
use crate::transport::spi::SpiTransport;

const SPI_SPEED_HZ: u32 = 1_000_000;

pub struct Pn532SpiDriver;

impl DriverOps for Pn532SpiDriver {
    fn name(&self) -> &'static str {
        "pn532_spi"
    }

    fn scan_type(&self) -> ScanType {
        ScanType::Intrusive
    }

    /// No bus-wide enumeration primitive; left to an explicit connstring
    /// (spec §4.2), matching `pn532_i2c`/`pn532_uart`.
    fn scan(&self) -> Vec<String> {
        Vec::new()
    }

    fn open(&self, specifier: &str, _baudrate: Option<u32>) -> Result<Device> {
        let mut device = SpidevDevice::open(specifier)
            .map_err(|e| TransportError::Io(IoErrorKind(e.to_string())))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_SPEED_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        device
            .configure(&options)
            .map_err(|e| TransportError::Io(IoErrorKind(e.to_string())))?;

        let transport = SpiTransport::new(device);
        let (transport, chip) = finish_open(Box::new(transport), DEFAULT_TIMEOUT)?;
        let connstring = format!("pn532_spi:{specifier}");
        Ok(Device::new(connstring, "PN532 (SPI)".to_string(), transport, chip))
    }
}
