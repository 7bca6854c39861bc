//! I2C driver for PN532 boards (spec §6.2, §6.3): fixed 7-bit address
//! `0x24`, `specifier` is the Linux I2C bus device node (e.g. `/dev/i2c-1`).

use crate::device::{Device, DEFAULT_TIMEOUT};
use crate::driver::{DriverOps, ScanType};
use crate::drivers::finish_open;
use crate::error::Result;
use crate::transport::i2c::I2cTransport;

pub struct Pn532I2cDriver;

impl DriverOps for Pn532I2cDriver {
    fn name(&self) -> &'static str {
        "pn532_i2c"
    }

    fn scan_type(&self) -> ScanType {
        ScanType::Intrusive
    }

    /// No bus-wide enumeration primitive; probing every bus node would
    /// disturb other I2C peripherals (spec §4.2).
    fn scan(&self) -> Vec<String> {
        Vec::new()
    }

    fn open(&self, specifier: &str, _baudrate: Option<u32>) -> Result<Device> {
        let transport = I2cTransport::open(specifier)?;
        let (transport, chip) = finish_open(Box::new(transport), DEFAULT_TIMEOUT)?;
        let connstring = format!("pn532_i2c:{specifier}");
        Ok(Device::new(connstring, "PN532 (I2C)".to_string(), transport, chip))
    }
}
