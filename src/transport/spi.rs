//! SPI transport (spec §6.2): mode 0, default 1 MHz. The first MOSI byte
//! of every transaction selects data-write (`0x01`), status-read (`0x02`),
//! or data-read (`0x03`); bit 0 of a status read is the RDY flag.
//!
//! Grounded on the `embedded-hal` 1.0 request-builder API paired with
//! `linux-embedded-hal`, per the dependency pairing in
//! `examples/other_examples/manifests/jonas-schievink-spi-memory/Cargo.toml`
//! and `examples/other_examples/manifests/WMT-GmbH-pn532/Cargo.toml`.

use std::thread::sleep;
use std::time::{Duration, Instant};

use embedded_hal::spi::SpiDevice;

use crate::error::{IoErrorKind, TransportError};
use crate::transport::Transport;

const DATA_WRITE: u8 = 0x01;
const STATUS_READ: u8 = 0x02;
const DATA_READ: u8 = 0x03;

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct SpiTransport<D: SpiDevice> {
    device: D,
}

impl<D: SpiDevice> SpiTransport<D> {
    pub fn new(device: D) -> Self {
        SpiTransport { device }
    }
}

impl<D: SpiDevice> Transport for SpiTransport<D> {
    fn send(&mut self, frame: &[u8], _deadline: Duration) -> Result<(), TransportError> {
        let mut out = Vec::with_capacity(frame.len() + 1);
        out.push(DATA_WRITE);
        out.extend_from_slice(frame);
        self.device
            .write(&out)
            .map_err(|e| TransportError::Io(IoErrorKind(format!("{e:?}"))))
    }

    fn receive(&mut self, buf: &mut [u8], deadline: Duration) -> Result<usize, TransportError> {
        let start = Instant::now();
        loop {
            if start.elapsed() >= deadline {
                return Err(TransportError::Timeout);
            }
            let mut status = [STATUS_READ, 0x00];
            self.device
                .transfer_in_place(&mut status)
                .map_err(|e| TransportError::Io(IoErrorKind(format!("{e:?}"))))?;
            if status[1] & 0x01 != 0 {
                break;
            }
            sleep(STATUS_POLL_INTERVAL.min(deadline.saturating_sub(start.elapsed())));
        }

        let mut tx = vec![0u8; buf.len() + 1];
        tx[0] = DATA_READ;
        let mut rx = vec![0u8; buf.len() + 1];
        self.device
            .transfer(&mut rx, &tx)
            .map_err(|e| TransportError::Io(IoErrorKind(format!("{e:?}"))))?;
        buf.copy_from_slice(&rx[1..]);
        Ok(buf.len())
    }

    fn wakeup(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn abort(&mut self) {
        // SPI has no in-band cancellation primitive; the status-poll loop
        // in `receive` simply runs out its deadline (mirrors I2C).
    }
}
