//! USB-bulk driver for PN531/PN532/PN533 boards (spec §6.2, §6.3).

use crate::device::{Device, DEFAULT_TIMEOUT};
use crate::driver::{DriverOps, ScanType};
use crate::drivers::finish_open;
use crate::error::Result;
use crate::transport::usb::UsbTransport;

pub struct Pn53xUsbDriver;

impl DriverOps for Pn53xUsbDriver {
    fn name(&self) -> &'static str {
        "pn53x_usb"
    }

    fn scan_type(&self) -> ScanType {
        ScanType::NotIntrusive
    }

    fn scan(&self) -> Vec<String> {
        UsbTransport::scan()
    }

    fn open(&self, specifier: &str, _baudrate: Option<u32>) -> Result<Device> {
        let transport = UsbTransport::open(specifier)?;
        let (transport, chip) = finish_open(Box::new(transport), DEFAULT_TIMEOUT)?;
        let connstring = format!("pn53x_usb:{specifier}");
        Ok(Device::new(connstring, "PN53x (USB)".to_string(), transport, chip))
    }
}
