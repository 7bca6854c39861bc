//! UART transport (spec §6.2): one PN53x frame per write, plus the PN532
//! LOWVBAT wakeup preamble and the Arygon binary-TAMA-mode prefix byte.
//!
//! Grounded on the `serialport` dependency declared by
//! `examples/other_examples/manifests/WMT-GmbH-pn532/Cargo.toml`; the
//! "driver wraps a narrow trait over a concrete HAL handle" idiom follows
//! the teacher's `I2CDriver`/`SpiDriver` shape in `peripheral/mfrc522/drivers.rs`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serialport::SerialPort;

use crate::chip::frame;
use crate::error::{IoErrorKind, TransportError};
use crate::transport::{Transport, INFINITE_TIMEOUT_CHUNK};

/// Wakeup preamble prepended to the first frame after LOWVBAT (spec §6.2).
pub const PN532_WAKEUP_PREAMBLE: [u8; 5] = [0x55, 0x55, 0x00, 0x00, 0x00];

/// Per-driver one-byte protocol prefix prepended to every host frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingPrefix {
    None,
    /// Arygon binary TAMA mode, prefix byte `'2'`.
    Arygon,
}

impl FramingPrefix {
    fn byte(self) -> Option<u8> {
        match self {
            FramingPrefix::None => None,
            FramingPrefix::Arygon => Some(b'2'),
        }
    }
}

fn map_serial_err(e: serialport::Error) -> TransportError {
    TransportError::Io(IoErrorKind(e.to_string()))
}

pub struct UartTransport {
    port: Box<dyn SerialPort>,
    prefix: FramingPrefix,
    needs_wakeup: bool,
    abort_flag: Arc<AtomicBool>,
}

impl UartTransport {
    /// Opens `path` at `baud` (default 115200 for PN532, 9600 for
    /// ACR122S/Arygon per spec §6.2).
    pub fn open(path: &str, baud: u32, prefix: FramingPrefix) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud)
            .timeout(INFINITE_TIMEOUT_CHUNK)
            .open()
            .map_err(map_serial_err)?;

        Ok(UartTransport {
            port,
            prefix,
            needs_wakeup: true,
            abort_flag: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl Transport for UartTransport {
    fn send(&mut self, frame: &[u8], _deadline: Duration) -> Result<(), TransportError> {
        let mut out = Vec::with_capacity(frame.len() + 6);
        if self.needs_wakeup {
            out.extend_from_slice(&PN532_WAKEUP_PREAMBLE);
            self.needs_wakeup = false;
        }
        if let Some(prefix) = self.prefix.byte() {
            out.push(prefix);
        }
        out.extend_from_slice(frame);
        self.port.write_all(&out).map_err(|e| TransportError::Io(IoErrorKind(e.to_string())))?;
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], deadline: Duration) -> Result<usize, TransportError> {
        let start = Instant::now();
        let mut filled = 0usize;
        loop {
            if self.abort_flag.swap(false, Ordering::SeqCst) {
                let _ = self.port.write_all(&frame::ACK_FRAME);
                return Err(TransportError::Aborted);
            }

            let remaining = deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                if filled > 0 {
                    return Ok(filled);
                }
                return Err(TransportError::Timeout);
            }
            let _ = self.port.set_timeout(remaining.min(INFINITE_TIMEOUT_CHUNK));

            match self.port.read(&mut buf[filled..]) {
                Ok(0) => continue,
                Ok(n) => {
                    filled += n;
                    // A complete normal frame ends with the 0x00 postamble;
                    // keep reading opportunistically until the bus goes quiet.
                    if filled >= 6 {
                        return Ok(filled);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(TransportError::Io(IoErrorKind(e.to_string()))),
            }
        }
    }

    fn wakeup(&mut self) -> Result<(), TransportError> {
        self.needs_wakeup = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.abort_flag.store(true, Ordering::SeqCst);
    }
}
