//! `Device`: the exclusively-owned, opened connection to one PN53x chip
//! (spec §3 "Device", §4.1 lifecycle).
//!
//! Grounded on the teacher's `MFRC522<D>` struct (`peripheral/mfrc522/mod.rs`)
//! — a thin owner wrapping a transport handle plus chip-side state behind a
//! narrow set of public methods — generalized here to a boxed `Transport`
//! trait object so one `Device` type serves every driver (spec §9: "keep the
//! vtable pointer as a non-owning reference... chip-private state" becomes
//! ordinary owned fields once there is no C ABI to satisfy).

use std::time::Duration;

use log::debug;

use crate::chip::engine::Pn53xChip;
use crate::error::ErrorKind;
use crate::transport::Transport;

/// Default per-operation timeout when a caller does not override it via
/// `device_set_property_int`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolProperty {
    CrcHandledByChip,
    ParityHandledByChip,
    EasyFraming,
    AutoIso14443_4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntProperty {
    /// Per-command timeout, in milliseconds.
    TimeoutCommand,
}

/// Exclusively-owned, opened device (spec §3). Not `Clone`/`Sync`: at most
/// one operation may be in flight on it at a time (spec §5).
pub struct Device {
    pub(crate) connstring: String,
    pub(crate) name: String,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) chip: Pn53xChip,

    /// Four boolean framing flags (spec §3).
    pub(crate) crc_handled_by_chip: bool,
    pub(crate) parity_handled_by_chip: bool,
    pub(crate) easy_framing: bool,
    pub(crate) auto_iso14443_4: bool,

    pub(crate) last_error: Option<ErrorKind>,
    pub(crate) timeout: Duration,
}

impl Device {
    /// Constructed by a driver's `open()` once the transport is connected
    /// and the chip's firmware version has been probed (spec §4.1/§4.6).
    pub fn new(connstring: String, name: String, transport: Box<dyn Transport>, chip: Pn53xChip) -> Self {
        debug!("device opened: {connstring} ({name})");
        Device {
            connstring,
            name,
            transport,
            chip,
            crc_handled_by_chip: true,
            parity_handled_by_chip: true,
            easy_framing: true,
            auto_iso14443_4: true,
            last_error: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn connstring(&self) -> &str {
        &self.connstring
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_error(&self) -> Option<&ErrorKind> {
        self.last_error.as_ref()
    }

    /// Human-readable rendering of `last_error`, mirroring libnfc's
    /// `nfc_strerror` (spec §4.1 vtable entry `strerror`).
    pub fn strerror(&self) -> String {
        match &self.last_error {
            Some(kind) => kind.to_string(),
            None => "success".to_string(),
        }
    }

    pub fn device_set_property_bool(&mut self, property: BoolProperty, value: bool) {
        match property {
            BoolProperty::CrcHandledByChip => self.crc_handled_by_chip = value,
            BoolProperty::ParityHandledByChip => self.parity_handled_by_chip = value,
            BoolProperty::EasyFraming => self.easy_framing = value,
            BoolProperty::AutoIso14443_4 => self.auto_iso14443_4 = value,
        }
    }

    pub fn device_set_property_int(&mut self, property: IntProperty, value: u64) {
        match property {
            IntProperty::TimeoutCommand => self.timeout = Duration::from_millis(value),
        }
    }

    /// A short human-readable summary of the connected chip (spec §4.1
    /// vtable entry `device_get_information_about`).
    pub fn device_get_information_about(&self) -> String {
        format!(
            "{} on {} (variant={:?})",
            self.name,
            self.connstring,
            self.chip.variant()
        )
    }

    /// Requests cancellation of an in-flight receive (spec §5).
    pub fn abort_command(&mut self) {
        self.transport.abort();
    }

    /// Returns to IDLE from whichever operating mode the device is in
    /// (spec §4.1).
    pub fn idle(&mut self) -> crate::error::Result<()> {
        let deadline = self.timeout;
        let result = self.chip.idle(&mut *self.transport, deadline);
        self.track(result)
    }

    /// `PowerDown` directly, independent of the idle transition (spec §4.5).
    pub fn powerdown(&mut self) -> crate::error::Result<()> {
        let deadline = self.timeout;
        let result = self.chip.power_down(&mut *self.transport, deadline);
        self.track(result)
    }

    pub fn get_supported_modulation(&self) -> crate::chip::capability::Modulations {
        self.chip.capabilities.modulations
    }

    /// Baud rates the chip's ISO14443-A modulation supports (spec §6.1's
    /// opcode catalog implies 106/212/424/847 kbps; the PN53x family only
    /// ever negotiates these four over `InPSL`).
    pub fn get_supported_baud_rate(&self) -> &'static [u32] {
        &[106_000, 212_000, 424_000, 847_000]
    }

    pub(crate) fn track<T>(&mut self, result: crate::error::Result<T>) -> crate::error::Result<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.kind.clone()),
        }
        result
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }
}
