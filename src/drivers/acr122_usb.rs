//! USB-bulk driver for the ACR122/Touchatag boards (spec §6.2), which speak
//! the same PN53x bulk protocol as `pn53x_usb` but are enumerated under
//! their own driver name so callers can allow-list one without the other.

use crate::device::{Device, DEFAULT_TIMEOUT};
use crate::driver::{DriverOps, ScanType};
use crate::drivers::finish_open;
use crate::error::Result;
use crate::transport::usb::UsbTransport;

const ACR122_DEVICES: &[(u16, u16, &str)] = &[(0x072F, 0x2200, "ACR122"), (0x072F, 0x90CC, "Touchatag")];

pub struct Acr122UsbDriver;

impl DriverOps for Acr122UsbDriver {
    fn name(&self) -> &'static str {
        "acr122_usb"
    }

    fn scan_type(&self) -> ScanType {
        ScanType::NotIntrusive
    }

    fn scan(&self) -> Vec<String> {
        UsbTransport::scan_filtered(ACR122_DEVICES)
    }

    fn open(&self, specifier: &str, _baudrate: Option<u32>) -> Result<Device> {
        let transport = UsbTransport::open(specifier)?;
        let (transport, chip) = finish_open(Box::new(transport), DEFAULT_TIMEOUT)?;
        let connstring = format!("acr122_usb:{specifier}");
        Ok(Device::new(connstring, "ACR122 (USB)".to_string(), transport, chip))
    }
}
