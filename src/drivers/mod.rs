//! Built-in driver registry (spec §4.2, §6.2): one descriptor per
//! transport/chip-family combination, each a zero-sized `DriverOps` impl
//! registered into `Context::new()`.
//!
//! Grounded on `examples/original_source/libnfc/libnfc.c`'s static
//! `nfc_drivers[]` table, which lists exactly these driver names.

#[cfg(feature = "usb")]
pub mod acr122_usb;
#[cfg(feature = "pcsc")]
pub mod acr122_pcsc;
#[cfg(feature = "i2c")]
pub mod pn532_i2c;
#[cfg(feature = "spi")]
pub mod pn532_spi;
#[cfg(feature = "uart")]
pub mod pn532_uart;
#[cfg(feature = "usb")]
pub mod pn53x_usb;

use std::time::Duration;

use crate::chip::capability::{Capabilities, ChipVariant, Modulations};
use crate::chip::engine::Pn53xChip;
use crate::chip::power::SamMode;
use crate::driver::DriverOps;
use crate::error::Result;
use crate::transport::Transport;

/// Discarded the instant `get_firmware_version` replaces it; `open()` needs
/// *some* `Capabilities` to construct a `Pn53xChip` before it knows which
/// chip it is talking to.
fn placeholder_capabilities() -> Capabilities {
    Capabilities {
        variant: ChipVariant::Pn532,
        modulations: Modulations::empty(),
        has_in_auto_poll: false,
        has_paypass_and_secure_tg: false,
        prefixes_register_replies_with_status: false,
    }
}

/// Common tail of every driver's `open()` (spec §4.1/§4.6): probe firmware
/// version to pick the real `Capabilities`, then complete
/// `SAMConfiguration(Normal)` on PN532 boards, which is how the HSU/I2C/SPI
/// host-controller interface is selected.
pub(crate) fn finish_open(
    mut transport: Box<dyn Transport>,
    timeout: Duration,
) -> Result<(Box<dyn Transport>, Pn53xChip)> {
    let mut chip = Pn53xChip::new(placeholder_capabilities());
    chip.get_firmware_version(&mut *transport, timeout)?;
    if chip.variant() == ChipVariant::Pn532 {
        chip.sam_configuration(&mut *transport, SamMode::Normal, timeout)?;
    }
    Ok((transport, chip))
}

pub fn built_in_drivers() -> Vec<&'static dyn DriverOps> {
    let mut drivers: Vec<&'static dyn DriverOps> = Vec::new();

    #[cfg(feature = "usb")]
    {
        drivers.push(&pn53x_usb::Pn53xUsbDriver);
        drivers.push(&acr122_usb::Acr122UsbDriver);
    }
    #[cfg(feature = "uart")]
    drivers.push(&pn532_uart::Pn532UartDriver);
    #[cfg(feature = "i2c")]
    drivers.push(&pn532_i2c::Pn532I2cDriver);
    #[cfg(feature = "spi")]
    drivers.push(&pn532_spi::Pn532SpiDriver);
    #[cfg(feature = "pcsc")]
    drivers.push(&acr122_pcsc::Acr122PcscDriver);

    drivers
}
