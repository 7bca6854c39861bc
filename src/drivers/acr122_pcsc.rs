//! PC/SC driver for ACR122-family readers (spec §6.2, §6.3): `specifier` is
//! the PC/SC reader name as reported by `scan()`.

use crate::device::{Device, DEFAULT_TIMEOUT};
use crate::driver::{DriverOps, ScanType};
use crate::drivers::finish_open;
use crate::error::Result;
use crate::transport::pcsc::PcscTransport;

pub struct Acr122PcscDriver;

impl DriverOps for Acr122PcscDriver {
    fn name(&self) -> &'static str {
        "acr122_pcsc"
    }

    fn scan_type(&self) -> ScanType {
        ScanType::NotIntrusive
    }

    fn scan(&self) -> Vec<String> {
        PcscTransport::scan()
    }

    fn open(&self, specifier: &str, _baudrate: Option<u32>) -> Result<Device> {
        let transport = PcscTransport::open(specifier)?;
        let (transport, chip) = finish_open(Box::new(transport), DEFAULT_TIMEOUT)?;
        let connstring = format!("acr122_pcsc:{specifier}");
        Ok(Device::new(connstring, "ACR122 (PC/SC)".to_string(), transport, chip))
    }
}
