//! Transport multiplexer: a narrow send/receive/wakeup/abort contract
//! implemented by each physical bus (spec §2, §5, §9).

use std::time::Duration;

use crate::error::TransportError;

#[cfg(feature = "usb")]
pub mod usb;

#[cfg(feature = "uart")]
pub mod uart;

#[cfg(feature = "i2c")]
pub mod i2c;

#[cfg(feature = "spi")]
pub mod spi;

#[cfg(feature = "pcsc")]
pub mod pcsc;

/// Implemented by each bus-specific driver. Every operation may block up to
/// `deadline`; `abort()` is observed by the running receive loop on its
/// next tick (spec §5).
pub trait Transport {
    /// Sends one complete PN53x frame.
    fn send(&mut self, frame: &[u8], deadline: Duration) -> Result<(), TransportError>;

    /// Receives one complete PN53x frame (ACK, NACK, error, or reply) into
    /// `buf`, returning the number of bytes written.
    fn receive(&mut self, buf: &mut [u8], deadline: Duration) -> Result<usize, TransportError>;

    /// Performs the transport-specific wakeup handshake used to bring the
    /// chip out of LOWVBAT (spec §4.5, §6.2). A no-op for transports with
    /// no such handshake.
    fn wakeup(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Requests cancellation of an in-flight receive (spec §5). Default
    /// no-op for transports that do not support abort (PC/SC, documented
    /// per spec §5).
    fn abort(&mut self) {}
}

/// Default chunk period for "infinite" caller timeouts, so the abort flag
/// can be polled (spec §5: "internally chunked into 200 ms passes").
pub const INFINITE_TIMEOUT_CHUNK: Duration = Duration::from_millis(200);
