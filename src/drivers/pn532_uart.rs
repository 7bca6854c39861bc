//! UART (HSU) driver for PN532 boards (spec §6.2, §6.3): default baud rate
//! 115200, no framing prefix (the Arygon prefix belongs to a different
//! board family and is not exposed through this driver name).

use crate::device::{Device, DEFAULT_TIMEOUT};
use crate::driver::{DriverOps, ScanType};
use crate::drivers::finish_open;
use crate::error::Result;
use crate::transport::uart::{FramingPrefix, UartTransport};

const DEFAULT_BAUD: u32 = 115_200;

pub struct Pn532UartDriver;

impl DriverOps for Pn532UartDriver {
    fn name(&self) -> &'static str {
        "pn532_uart"
    }

    fn scan_type(&self) -> ScanType {
        ScanType::Intrusive
    }

    /// UART has no enumeration primitive beyond probing candidate device
    /// paths, which would disturb whatever is attached — left to the
    /// caller via an explicit connstring (spec §4.2).
    fn scan(&self) -> Vec<String> {
        Vec::new()
    }

    fn open(&self, specifier: &str, baudrate: Option<u32>) -> Result<Device> {
        let baud = baudrate.unwrap_or(DEFAULT_BAUD);
        let transport = UartTransport::open(specifier, baud, FramingPrefix::None)?;
        let (transport, chip) = finish_open(Box::new(transport), DEFAULT_TIMEOUT)?;
        let connstring = format!("pn532_uart:{specifier}:{baud}");
        Ok(Device::new(connstring, "PN532 (UART)".to_string(), transport, chip))
    }
}
