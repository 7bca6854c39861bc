//! PC/SC transport (spec §6.2): ACR122-family readers accessed as smart
//! cards. Every request is wrapped in a pseudo-APDU (`FF 00 00 00 LEN+1 D4
//! data…`); the reply arrives either directly (T=1) or behind a `61 xx`
//! GET RESPONSE intermediate (T=0). The reader's own two-byte marker and
//! the trailing SW1 SW2 are stripped, leaving the genuine PN53x TFI+data
//! span, which is re-wrapped into an ordinary wire frame so the chip
//! engine's generic parser can consume it unchanged.
//!
//! Grounded on `examples/original_source/libnfc/drivers/acr122_pcsc.c`
//! (`acr122_pcsc_send`/`acr122_pcsc_receive`), translated onto the `pcsc`
//! crate's `Context`/`Card` API.
//!
//! PC/SC has no abort primitive (spec §5): `SCardTransmit` blocks until the
//! reader completes, with no cancellation hook exposed by the `pcsc` crate.
//! It also has no separate wire-level ACK (spec §2): `send` performs the
//! whole synchronous exchange and queues both a synthetic ACK and the real
//! reply for the two `receive` calls the chip engine always makes.

use std::collections::VecDeque;
use std::ffi::CString;
use std::time::Duration;

use pcsc::{Card, Context, Protocol, Protocols, Scope, ShareMode};

use crate::chip::frame;
use crate::error::{IoErrorKind, TransportError};
use crate::transport::Transport;

fn map_pcsc_err(e: pcsc::Error) -> TransportError {
    TransportError::Io(IoErrorKind(e.to_string()))
}

pub struct PcscTransport {
    card: Card,
    protocol: Protocol,
    pending: VecDeque<Vec<u8>>,
}

impl PcscTransport {
    /// Enumerates connected PC/SC reader names (spec §4.2: NOT_INTRUSIVE).
    pub fn scan() -> Vec<String> {
        let ctx = match Context::establish(Scope::User) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        let len = match ctx.list_readers_len() {
            Ok(l) => l,
            Err(_) => return Vec::new(),
        };
        let mut buf = vec![0u8; len];
        match ctx.list_readers(&mut buf) {
            Ok(readers) => readers
                .filter_map(|r| r.to_str().ok().map(|s| format!("pcsc:{s}")))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Connects to the named reader (spec §6.3: `pcsc:<reader name>`).
    pub fn open(reader_name: &str) -> Result<Self, TransportError> {
        let ctx = Context::establish(Scope::User).map_err(map_pcsc_err)?;
        let reader = CString::new(reader_name).map_err(|_| TransportError::InvalidArgument)?;
        let card = ctx
            .connect(&reader, ShareMode::Shared, Protocols::ANY)
            .map_err(map_pcsc_err)?;
        let protocol = card
            .status2_owned()
            .ok()
            .and_then(|s| s.protocol2())
            .unwrap_or(Protocol::T1);
        Ok(PcscTransport {
            card,
            protocol,
            pending: VecDeque::new(),
        })
    }
}

impl Transport for PcscTransport {
    fn send(&mut self, frame: &[u8], _deadline: Duration) -> Result<(), TransportError> {
        let (_tfi, data) =
            frame::split_frame(frame).map_err(|_| TransportError::InvalidArgument)?;

        let mut apdu = Vec::with_capacity(data.len() + 6);
        apdu.extend_from_slice(&[0xFF, 0x00, 0x00, 0x00, (data.len() + 1) as u8]);
        apdu.push(frame::TFI_HOST_TO_CHIP);
        apdu.extend_from_slice(data);

        let mut recv_buf = [0u8; 4 + frame::MAX_EXTENDED_DATA];
        let mut response = self
            .card
            .transmit(&apdu, &mut recv_buf)
            .map_err(map_pcsc_err)?
            .to_vec();

        if self.protocol == Protocol::T0 {
            if response.len() != 2 {
                return Err(TransportError::ReceivedErrorFrame);
            }
            if response[0] == 0x61 {
                let resp_len = response[1];
                let get_response = [0xFF, 0xC0, 0x00, 0x00, resp_len];
                response = self
                    .card
                    .transmit(&get_response, &mut recv_buf)
                    .map_err(map_pcsc_err)?
                    .to_vec();
            } else if response[0] != 0x90 {
                return Err(TransportError::ReceivedErrorFrame);
            }
        }

        if response.len() < 4 {
            return Err(TransportError::ReceivedErrorFrame);
        }
        // `response[0..2]` is the reader's own envelope marker, the last
        // two bytes are SW1 SW2; what's left starts with the real PN53x
        // TFI byte followed by the reply's own data.
        let inner = &response[2..response.len() - 2];
        if inner.is_empty() {
            return Err(TransportError::ReceivedErrorFrame);
        }
        let reply_frame = frame::build_reply_frame(&inner[1..])
            .map_err(|_| TransportError::ReceivedErrorFrame)?;

        self.pending.push_back(frame::ACK_FRAME.to_vec());
        self.pending.push_back(reply_frame);
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], _deadline: Duration) -> Result<usize, TransportError> {
        let reply = self.pending.pop_front().ok_or(TransportError::Timeout)?;
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        Ok(n)
    }

    fn wakeup(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn abort(&mut self) {
        // PC/SC has no cancellation primitive (spec §5); `SCardTransmit`
        // always runs to completion.
    }
}
