//! USB-bulk transport (spec §6.2): one PN53x frame per bulk-OUT transfer,
//! ACK then reply on bulk-IN. Grounded on the `rusb`
//! `Context`/`Device`/`DeviceHandle` idiom, bulk endpoint read/write, and
//! interface claim/detach-kernel-driver sequence in
//! `examples/other_examples/4276383e_uaih3k9x-ch347programmer__ch347.rs.rs`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rusb::{Context, DeviceHandle, UsbContext};

use crate::chip::frame;
use crate::error::{IoErrorKind, TransportError};
use crate::transport::{Transport, INFINITE_TIMEOUT_CHUNK};

/// `(vendor, product, model name)` table from spec §6.2.
pub const USB_DEVICES: &[(u16, u16, &str)] = &[
    (0x04CC, 0x0531, "NXP PN531"),
    (0x054c, 0x0193, "Sony PN531"),
    (0x04E6, 0x5591, "SCM SCL3711"),
    (0x1FD3, 0x0608, "ASK LoGO"),
    (0x04CC, 0x2533, "NXP PN533"),
    (0x072F, 0x2200, "ACR122"),
    (0x072F, 0x90CC, "Touchatag"),
];

const USB_INTERFACE: u8 = 0;

fn map_rusb_err(e: rusb::Error) -> TransportError {
    TransportError::Io(IoErrorKind(e.to_string()))
}

pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    ep_in: u8,
    ep_out: u8,
    max_packet_size_out: u16,
    abort_flag: Arc<AtomicBool>,
}

impl UsbTransport {
    /// Enumerates attached devices from [`USB_DEVICES`] into fully
    /// qualified connstrings (spec §4.2: USB scanning is NOT_INTRUSIVE).
    pub fn scan() -> Vec<String> {
        Self::scan_filtered(USB_DEVICES)
    }

    /// As [`Self::scan`], but only matching `(vendor, product, _)` entries
    /// drawn from `table` — used by `acr122_usb` to enumerate just the
    /// ACR122/Touchatag ids out of the shared [`USB_DEVICES`] table.
    pub fn scan_filtered(table: &[(u16, u16, &str)]) -> Vec<String> {
        let context = match Context::new() {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        let devices = match context.devices() {
            Ok(d) => d,
            Err(_) => return Vec::new(),
        };

        let mut found = Vec::new();
        for (index, device) in devices.iter().enumerate() {
            let desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(_) => continue,
            };
            if table
                .iter()
                .any(|&(vid, pid, _)| vid == desc.vendor_id() && pid == desc.product_id())
            {
                found.push(format!(
                    "pn53x_usb:{:03}:{:03}",
                    device.bus_number(),
                    index
                ));
            }
        }
        found
    }

    /// Opens the device identified by `bus:device-index` (spec §6.3).
    pub fn open(specifier: &str) -> Result<Self, TransportError> {
        let context = Context::new().map_err(map_rusb_err)?;
        let devices = context.devices().map_err(map_rusb_err)?;

        let want_bus: Option<u8> = specifier.split(':').next().and_then(|s| s.parse().ok());

        for device in devices.iter() {
            let desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(_) => continue,
            };
            let matches_id = USB_DEVICES
                .iter()
                .any(|&(vid, pid, _)| vid == desc.vendor_id() && pid == desc.product_id());
            if !matches_id {
                continue;
            }
            if let Some(bus) = want_bus {
                if device.bus_number() != bus {
                    continue;
                }
            }

            let mut handle = device.open().map_err(map_rusb_err)?;
            let _ = handle.set_active_configuration(1);

            #[cfg(any(target_os = "linux", target_os = "macos"))]
            {
                if handle.kernel_driver_active(USB_INTERFACE).unwrap_or(false) {
                    let _ = handle.detach_kernel_driver(USB_INTERFACE);
                }
            }
            handle.claim_interface(USB_INTERFACE).map_err(map_rusb_err)?;

            let config = device.active_config_descriptor().map_err(map_rusb_err)?;
            let interface = config
                .interfaces()
                .find(|i| i.number() == USB_INTERFACE)
                .ok_or(TransportError::NoSuchDevice)?;
            let descriptor = interface.descriptors().next().ok_or(TransportError::NoSuchDevice)?;

            let mut ep_in = 0x82;
            let mut ep_out = 0x02;
            let mut max_packet_size_out = 64u16;
            for endpoint in descriptor.endpoint_descriptors() {
                if endpoint.direction() == rusb::Direction::In {
                    ep_in = endpoint.address();
                } else {
                    ep_out = endpoint.address();
                    max_packet_size_out = endpoint.max_packet_size();
                }
            }

            return Ok(UsbTransport {
                handle,
                ep_in,
                ep_out,
                max_packet_size_out,
                abort_flag: Arc::new(AtomicBool::new(false)),
            });
        }

        Err(TransportError::NoSuchDevice)
    }
}

impl Transport for UsbTransport {
    fn send(&mut self, frame: &[u8], deadline: Duration) -> Result<(), TransportError> {
        self.handle
            .write_bulk(self.ep_out, frame, deadline)
            .map_err(map_rusb_err)?;

        // USB short-packet rule: append a zero-length packet when the
        // transfer length is an exact multiple of the endpoint's max
        // packet size (spec §6.2).
        if self.max_packet_size_out > 0 && frame.len() % self.max_packet_size_out as usize == 0 {
            self.handle
                .write_bulk(self.ep_out, &[], deadline)
                .map_err(map_rusb_err)?;
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], deadline: Duration) -> Result<usize, TransportError> {
        let start = Instant::now();
        loop {
            if self.abort_flag.swap(false, Ordering::SeqCst) {
                let _ = self.handle.write_bulk(self.ep_out, &frame::ACK_FRAME, INFINITE_TIMEOUT_CHUNK);
                return Err(TransportError::Aborted);
            }

            let remaining = deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return Err(TransportError::Timeout);
            }
            let chunk = remaining.min(INFINITE_TIMEOUT_CHUNK);

            match self.handle.read_bulk(self.ep_in, buf, chunk) {
                Ok(n) => return Ok(n),
                Err(rusb::Error::Timeout) => continue,
                Err(e) => return Err(map_rusb_err(e)),
            }
        }
    }

    fn wakeup(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn abort(&mut self) {
        self.abort_flag.store(true, Ordering::SeqCst);
    }
}
