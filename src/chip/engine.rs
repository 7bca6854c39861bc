//! The PN53x command engine: ties the frame codec, register cache,
//! capability table, and power-mode state machine into a single
//! `transceive()` entry point (spec §4.9).
//!
//! Grounded on the teacher's `pcd_communicate_with_picc`
//! (`peripheral/mfrc522/pcd.rs`) for the IRQ-poll/FIFO-fill/status-check/
//! FIFO-drain shape, generalized to the PN53x's ACK-then-reply handshake.

use std::time::Duration;

use log::{debug, trace, warn};

use crate::chip::capability::{Capabilities, ChipVariant};
use crate::chip::commands;
use crate::chip::frame;
use crate::chip::power::{OperatingMode, PowerMode, SamMode};
use crate::chip::registers::RegisterCache;
use crate::chip::target::TargetDescriptor;
use crate::chip::timing::{self, DeviceModel};
use crate::error::{ChipError, Error, FramingError, Result, TransportError};
use crate::transport::Transport;

// CIU register addresses used by the timed-transceive primitive (spec
// §4.10). `CIU_BitFraming` at 0x633D is the address already established by
// `set_tx_bits`; the rest are placed in the same 0x6300-window following the
// teacher's own MFRC522 CIU offset table (`peripheral/mfrc522/consts.rs`),
// since the filtered original source carries only symbolic register names,
// never resolved addresses.
const REG_CIU_COMMAND: u16 = 0x6301;
const REG_CIU_FIFO_DATA: u16 = 0x6309;
const REG_CIU_FIFO_LEVEL: u16 = 0x630A;
const REG_CIU_TMODE: u16 = 0x632A;
const REG_CIU_TPRESCALER: u16 = 0x632B;
const REG_CIU_TRELOAD_HI: u16 = 0x632C;
const REG_CIU_TRELOAD_LO: u16 = 0x632D;
const REG_CIU_TCOUNTER_HI: u16 = 0x632E;
const REG_CIU_TCOUNTER_LO: u16 = 0x632F;
const REG_CIU_BIT_FRAMING: u16 = 0x633D;

// CIU symbol bit values, matching the teacher's own `PCDCommand::Transceive`
// (0x0C) and `BitFramingReg` StartSend bit (0x80) in
// `peripheral/mfrc522/{consts.rs,pcd.rs}`.
const SYMBOL_COMMAND_TRANSCEIVE: u8 = 0x0C;
const SYMBOL_FLUSH_BUFFER: u8 = 0x80;
const SYMBOL_START_SEND: u8 = 0x80;
const SYMBOL_TAUTO: u8 = 0x80;

fn push_register_write(cmd: &mut Vec<u8>, address: u16, value: u8) {
    cmd.push((address >> 8) as u8);
    cmd.push((address & 0xFF) as u8);
    cmd.push(value);
}

fn odd_parity_bit(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}

/// Owned, per-device PN53x state (spec §3 "Chip state (PN53x)").
pub struct Pn53xChip {
    pub capabilities: Capabilities,
    pub power_mode: PowerMode,
    pub operating_mode: OperatingMode,
    last_command: Option<u8>,
    /// `ui8Parameters`: the chip has no readback for `SetParameters`, so
    /// the last value written is cached here.
    parameters: u8,
    /// `ui8TxBits`: residual transmission-bit-count register cache.
    tx_bits: u8,
    pub target: Option<TargetDescriptor>,
    registers: RegisterCache,
}

impl Pn53xChip {
    pub fn new(capabilities: Capabilities) -> Self {
        Pn53xChip {
            power_mode: PowerMode::Normal,
            operating_mode: OperatingMode::Idle,
            last_command: None,
            parameters: 0,
            tx_bits: 0,
            target: None,
            registers: RegisterCache::new(),
            capabilities,
        }
    }

    pub fn variant(&self) -> ChipVariant {
        self.capabilities.variant
    }

    /// The single entry point of spec §4.9: wake the chip if the last
    /// command left it in LOWVBAT (§4.5, §8 "after `idle()`, a subsequent
    /// `initiator_init()` succeeds without reopening the device"), flush
    /// the writeback cache, then perform one atomic command/reply exchange.
    pub fn transceive(
        &mut self,
        transport: &mut dyn Transport,
        tx: &[u8],
        deadline: Duration,
    ) -> Result<Vec<u8>> {
        self.wake_if_needed(transport, deadline)?;
        self.flush_writeback(transport, deadline)?;
        self.raw_transceive(transport, tx, deadline)
    }

    /// Performs a command/reply exchange without first flushing the
    /// register cache. Used internally by `flush_writeback` itself (to
    /// avoid infinite recursion) and by the handful of commands
    /// (`GetFirmwareVersion`, `SAMConfiguration`) issued before any
    /// register state exists to flush.
    fn raw_transceive(
        &mut self,
        transport: &mut dyn Transport,
        tx: &[u8],
        deadline: Duration,
    ) -> Result<Vec<u8>> {
        if tx.is_empty() {
            return Err(Error::from(TransportError::InvalidArgument));
        }
        let opcode = tx[0];
        trace!("transceive: opcode=0x{opcode:02X} len={}", tx.len());

        let out_frame = frame::build_frame(tx)?;
        transport.send(&out_frame, deadline)?;
        self.last_command = Some(opcode);

        let mut ack_buf = [0u8; frame::ACK_FRAME.len()];
        let ack_len = transport.receive(&mut ack_buf, deadline)?;
        let ack = &ack_buf[..ack_len];
        if frame::is_nack_frame(ack) {
            warn!("received NACK for opcode 0x{opcode:02X}");
            return Err(Error::from(TransportError::ReceivedNack));
        } else if frame::is_error_frame(ack) {
            return Err(Error::from(TransportError::ReceivedErrorFrame));
        } else if !frame::is_ack_frame(ack) {
            return Err(Error::from(TransportError::ExpectedAckOrNack));
        }

        let mut reply_buf = vec![0u8; 11 + frame::MAX_EXTENDED_DATA];
        let reply_len = transport.receive(&mut reply_buf, deadline)?;
        let (_tfi, data) = frame::parse_frame(&reply_buf[..reply_len])?;

        if data.is_empty() {
            return Err(Error::from(FramingError::LengthMismatch));
        }
        let reply_code = data[0];
        if reply_code != opcode.wrapping_add(1) {
            return Err(Error::from(FramingError::UnexpectedCommandCode));
        }

        let mut payload = data[1..].to_vec();

        // PN533 prepends a status byte to ReadRegister/WriteRegister
        // replies, stripped unconditionally (not error-checked) per §4.6.
        if self.capabilities.prefixes_register_replies_with_status
            && matches!(opcode, commands::READ_REGISTER | commands::WRITE_REGISTER)
        {
            if payload.is_empty() {
                return Err(Error::from(FramingError::LengthMismatch));
            }
            payload.remove(0);
        }

        if commands::is_status_bearing_for_variant(opcode, self.capabilities.variant) {
            if payload.is_empty() {
                return Err(Error::from(FramingError::LengthMismatch));
            }
            let status = payload.remove(0);
            if let Some(chip_err) = ChipError::from_status_byte(status) {
                warn!("chip-level error 0x{status:02X} for opcode 0x{opcode:02X}: {chip_err}");
                return Err(Error::from(chip_err));
            }
        }

        Ok(payload)
    }

    /// Flushes the writeback register cache before any transceive whose
    /// outcome depends on chip configuration (spec §4.4, §3 invariants).
    pub fn flush_writeback(&mut self, transport: &mut dyn Transport, deadline: Duration) -> Result<()> {
        let to_read = self.registers.addresses_needing_read();
        if !to_read.is_empty() {
            let mut cmd = vec![commands::READ_REGISTER];
            for addr in &to_read {
                cmd.push((addr >> 8) as u8);
                cmd.push((addr & 0xFF) as u8);
            }
            let reply = self.raw_transceive(transport, &cmd, deadline)?;
            if reply.len() < to_read.len() {
                return Err(Error::from(FramingError::LengthMismatch));
            }
            let results: Vec<(u16, u8)> = to_read.iter().copied().zip(reply.iter().copied()).collect();
            self.registers.merge_read_results(&results);
        }

        let writes = self.registers.flush_writes();
        if !writes.is_empty() {
            let mut cmd = vec![commands::WRITE_REGISTER];
            for w in &writes {
                cmd.push((w.address >> 8) as u8);
                cmd.push((w.address & 0xFF) as u8);
                cmd.push(w.value);
            }
            self.raw_transceive(transport, &cmd, deadline)?;
        }
        Ok(())
    }

    /// `write_register(addr, mask, value)` (spec §4.4): coalesces into the
    /// cache when `addr` lies in the cached window, otherwise performs an
    /// immediate read-modify-write.
    pub fn write_register(
        &mut self,
        transport: &mut dyn Transport,
        address: u16,
        mask: u8,
        value: u8,
        deadline: Duration,
    ) -> Result<()> {
        if RegisterCache::address_is_cacheable(address) {
            self.registers.write(address, mask, value);
            return Ok(());
        }

        self.wake_if_needed(transport, deadline)?;

        let merged = if mask == 0xFF {
            value
        } else {
            let current = self.read_register_immediate(transport, address, deadline)?;
            (current & !mask) | (value & mask)
        };

        let cmd = vec![
            commands::WRITE_REGISTER,
            (address >> 8) as u8,
            (address & 0xFF) as u8,
            merged,
        ];
        self.raw_transceive(transport, &cmd, deadline)?;
        Ok(())
    }

    /// Immediate, uncached register read, bypassing the writeback cache.
    pub fn read_register_immediate(
        &mut self,
        transport: &mut dyn Transport,
        address: u16,
        deadline: Duration,
    ) -> Result<u8> {
        self.wake_if_needed(transport, deadline)?;
        let cmd = vec![commands::READ_REGISTER, (address >> 8) as u8, (address & 0xFF) as u8];
        let reply = self.raw_transceive(transport, &cmd, deadline)?;
        reply.first().copied().ok_or_else(|| Error::from(FramingError::LengthMismatch))
    }

    /// Sets the residual transmission-bit-count register, caching the
    /// value to avoid redundant writes (spec §3).
    pub fn set_tx_bits(&mut self, transport: &mut dyn Transport, bits: u8, deadline: Duration) -> Result<()> {
        if self.tx_bits == bits {
            return Ok(());
        }
        // PN53X_REG_CIU_BitFraming, SYMBOL_TX_LAST_BITS mask = 0x07.
        self.write_register(transport, 0x633D, 0x07, bits, deadline)?;
        self.tx_bits = bits;
        Ok(())
    }

    /// `SetParameters` (opcode 0x12). The chip has no readback for this
    /// byte, so it is cached on the device rather than in the register
    /// cache proper (spec §3).
    pub fn set_parameters(&mut self, transport: &mut dyn Transport, value: u8, deadline: Duration) -> Result<()> {
        let cmd = vec![commands::SET_PARAMETERS, value];
        self.transceive(transport, &cmd, deadline)?;
        self.parameters = value;
        Ok(())
    }

    pub fn cached_parameters(&self) -> u8 {
        self.parameters
    }

    /// `GetFirmwareVersion`, used at device open to select chip variant and
    /// capability set (spec §4.6).
    pub fn get_firmware_version(&mut self, transport: &mut dyn Transport, deadline: Duration) -> Result<Capabilities> {
        let reply = self.raw_transceive(transport, &[commands::GET_FIRMWARE_VERSION], deadline)?;
        let caps = crate::chip::capability::capabilities_from_firmware_version(&reply)
            .ok_or_else(|| Error::from(TransportError::NotSupported))?;
        debug!("firmware version decoded: variant={:?}", caps.variant);
        self.capabilities = caps;
        Ok(caps)
    }

    /// `SAMConfiguration` (spec §4.5, supplemented mode dispatch in
    /// SPEC_FULL.md §2). Completes the LOWVBAT-wakeup transition when
    /// called with `SamMode::Normal`.
    pub fn sam_configuration(&mut self, transport: &mut dyn Transport, mode: SamMode, deadline: Duration) -> Result<()> {
        let cmd = crate::chip::power::sam_configuration_payload(mode);
        self.raw_transceive(transport, &cmd, deadline)?;
        if matches!(mode, SamMode::Normal) {
            self.power_mode = PowerMode::Normal;
        }
        Ok(())
    }

    /// `PowerDown` with the fixed wake-source mask `0xF0` (spec §4.5,
    /// SPEC_FULL.md §2).
    pub fn power_down(&mut self, transport: &mut dyn Transport, deadline: Duration) -> Result<()> {
        let cmd = crate::chip::power::power_down_payload();
        self.transceive(transport, &cmd, deadline)?;
        self.power_mode = PowerMode::PowerDown;
        Ok(())
    }

    /// Wakes the chip from LOWVBAT via the transport-specific handshake
    /// (spec §4.5) and completes the transition with `SAMConfiguration`
    /// (PN532 only; failure here is fatal to the open, per spec).
    pub fn wake_if_needed(&mut self, transport: &mut dyn Transport, deadline: Duration) -> Result<()> {
        if self.power_mode != PowerMode::LowVbat {
            return Ok(());
        }
        transport.wakeup()?;
        self.sam_configuration(transport, SamMode::Normal, deadline)?;
        Ok(())
    }

    /// `TgInitAsTarget` is observed to drive the PN532 into POWERDOWN
    /// automatically; record this so the next host command wakes it again
    /// (spec §4.5). A successful reply means an external field woke the
    /// chip, resetting the mode to NORMAL.
    pub fn note_tg_init_as_target_result(&mut self) {
        self.power_mode = PowerMode::Normal;
        self.operating_mode = OperatingMode::Target;
    }

    /// `ReadGPIO`/`WriteGPIO` passthroughs (SPEC_FULL.md §2: named in the
    /// opcode catalog but otherwise undiscussed by spec.md).
    pub fn read_gpio(&mut self, transport: &mut dyn Transport, deadline: Duration) -> Result<Vec<u8>> {
        self.transceive(transport, &[commands::READ_GPIO], deadline)
    }

    pub fn write_gpio(&mut self, transport: &mut dyn Transport, p3: u8, p7: u8, i0i1: u8, deadline: Duration) -> Result<()> {
        let cmd = vec![commands::WRITE_GPIO, p3, p7, i0i1];
        self.transceive(transport, &cmd, deadline)?;
        Ok(())
    }

    /// `RFRegulationTest` passthrough (Open Question resolution, spec §9 /
    /// SPEC_FULL.md §3.1): no caller within this crate invokes it.
    pub fn rf_regulation_test(&mut self, transport: &mut dyn Transport, test_mode: u8, deadline: Duration) -> Result<()> {
        let cmd = vec![commands::RF_REGULATION_TEST, test_mode];
        self.transceive(transport, &cmd, deadline)?;
        Ok(())
    }

    /// Transitions back to IDLE (spec §4.1): `InDeselect(0)` + RF field
    /// off from INITIATOR, `InRelease(0)` from TARGET. PN532 additionally
    /// drives `PowerDown` to LOWVBAT.
    pub fn idle(&mut self, transport: &mut dyn Transport, deadline: Duration) -> Result<()> {
        match self.operating_mode {
            OperatingMode::Initiator => {
                let cmd = vec![commands::IN_DESELECT, 0];
                self.transceive(transport, &cmd, deadline)?;
                self.rf_field_off(transport, deadline)?;
            }
            OperatingMode::Target => {
                let cmd = vec![commands::IN_RELEASE, 0];
                self.transceive(transport, &cmd, deadline)?;
            }
            OperatingMode::Idle => {}
        }
        self.operating_mode = OperatingMode::Idle;
        self.target = None;

        if crate::chip::power::observes_power_states(self.capabilities.variant) {
            self.power_down(transport, deadline)?;
            self.power_mode = PowerMode::LowVbat;
        }
        Ok(())
    }

    /// Switches off the RF field via `RFConfiguration` item 1 (CfgItem =
    /// `RF_FIELD`, 0x01), the form used by `nfc_idle`/`InDeselect` paths in
    /// the original driver.
    fn rf_field_off(&mut self, transport: &mut dyn Transport, deadline: Duration) -> Result<()> {
        let cmd = vec![commands::RF_CONFIGURATION, 0x01, 0x00];
        self.transceive(transport, &cmd, deadline)?;
        Ok(())
    }

    /// Bit-precise timed transceive (spec §4.10), for Mifare-Classic
    /// key-recovery utilities that need the tag's reply latency in 13.56 MHz
    /// cycles rather than just its bytes. Bypasses the ordinary
    /// ACK/reply-opcode exchange entirely: it programs the CIU timer and
    /// FIFO directly via back-to-back `WriteRegister`/`ReadRegister` calls
    /// and reads the elapsed timer count off the chip once the tag replies.
    ///
    /// Grounded on `__pn53x_init_timer`/`__pn53x_get_timer`/
    /// `pn53x_initiator_transceive_bits_timed` (`original_source/libnfc/chips/pn53x.c`),
    /// adapted to this cache's `write_register`/`read_register_immediate`
    /// primitives; the register addresses are the placeholders documented
    /// above this impl block.
    pub fn transceive_timed(
        &mut self,
        transport: &mut dyn Transport,
        tx: &[u8],
        tx_last_bits: u8,
        max_cycles: u32,
        model: DeviceModel,
        deadline: Duration,
    ) -> Result<(Vec<u8>, u32)> {
        self.wake_if_needed(transport, deadline)?;
        self.flush_writeback(transport, deadline)?;

        // __pn53x_init_timer: prescaler chosen so max_cycles fits a 16-bit
        // reload value, timer armed to count down from 0xFFFF.
        let prescaler: u16 = if max_cycles > 0xFFFF {
            (((max_cycles / 0xFFFF).saturating_sub(1)) / 2).min(0x0FFF) as u16
        } else {
            0
        };
        let mut init_cmd = vec![commands::WRITE_REGISTER];
        push_register_write(&mut init_cmd, REG_CIU_TMODE, SYMBOL_TAUTO | ((prescaler >> 8) as u8 & 0x0F));
        push_register_write(&mut init_cmd, REG_CIU_TPRESCALER, (prescaler & 0xFF) as u8);
        push_register_write(&mut init_cmd, REG_CIU_TRELOAD_HI, 0xFF);
        push_register_write(&mut init_cmd, REG_CIU_TRELOAD_LO, 0xFF);
        self.raw_transceive(transport, &init_cmd, deadline)?;

        // Arm Transceive, flush the FIFO, fill it, then kick off sending.
        let mut fifo_cmd = vec![commands::WRITE_REGISTER];
        push_register_write(&mut fifo_cmd, REG_CIU_COMMAND, SYMBOL_COMMAND_TRANSCEIVE);
        push_register_write(&mut fifo_cmd, REG_CIU_FIFO_LEVEL, SYMBOL_FLUSH_BUFFER);
        for &byte in tx {
            push_register_write(&mut fifo_cmd, REG_CIU_FIFO_DATA, byte);
        }
        push_register_write(&mut fifo_cmd, REG_CIU_BIT_FRAMING, SYMBOL_START_SEND | (tx_last_bits & 0x07));
        self.raw_transceive(transport, &fifo_cmd, deadline)?;

        let level_cmd = [
            commands::READ_REGISTER,
            (REG_CIU_FIFO_LEVEL >> 8) as u8,
            (REG_CIU_FIFO_LEVEL & 0xFF) as u8,
        ];
        let poll_rounds = (3usize * (prescaler as usize * 2 + 1)).max(1);
        let mut level = 0u8;
        for _ in 0..poll_rounds {
            let reply = self.raw_transceive(transport, &level_cmd, deadline)?;
            level = reply.first().copied().unwrap_or(0) & 0x7F;
            if level > 0 {
                break;
            }
        }

        let mut rx = Vec::new();
        while level > 0 {
            let mut read_cmd = vec![commands::READ_REGISTER];
            for _ in 0..level {
                read_cmd.push((REG_CIU_FIFO_DATA >> 8) as u8);
                read_cmd.push((REG_CIU_FIFO_DATA & 0xFF) as u8);
            }
            read_cmd.push((REG_CIU_FIFO_LEVEL >> 8) as u8);
            read_cmd.push((REG_CIU_FIFO_LEVEL & 0xFF) as u8);
            let reply = self.raw_transceive(transport, &read_cmd, deadline)?;
            if reply.len() < level as usize + 1 {
                return Err(Error::from(FramingError::LengthMismatch));
            }
            rx.extend_from_slice(&reply[..level as usize]);
            level = reply[level as usize] & 0x7F;
        }

        let counter_reply = self.raw_transceive(
            transport,
            &[
                commands::READ_REGISTER,
                (REG_CIU_TCOUNTER_HI >> 8) as u8,
                (REG_CIU_TCOUNTER_HI & 0xFF) as u8,
                (REG_CIU_TCOUNTER_LO >> 8) as u8,
                (REG_CIU_TCOUNTER_LO & 0xFF) as u8,
            ],
            deadline,
        )?;
        if counter_reply.len() < 2 {
            return Err(Error::from(FramingError::LengthMismatch));
        }
        let counter = ((counter_reply[0] as u16) << 8) | counter_reply[1] as u16;

        let cycles = if counter == 0 {
            u32::MAX
        } else {
            let last_byte = tx.last().copied().unwrap_or(0);
            timing::corrected_cycle_count(
                (0xFFFFu16 - counter) as u32,
                prescaler as u8,
                self.capabilities.variant,
                model,
                odd_parity_bit(last_byte),
            )
        };

        Ok((rx, cycles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::capability::Modulations;
    use std::collections::VecDeque;

    struct FakeTransport {
        outgoing: Vec<Vec<u8>>,
        incoming: VecDeque<Vec<u8>>,
    }

    impl FakeTransport {
        fn new(incoming: Vec<Vec<u8>>) -> Self {
            FakeTransport { outgoing: Vec::new(), incoming: incoming.into() }
        }
    }

    impl Transport for FakeTransport {
        fn send(&mut self, frame: &[u8], _deadline: Duration) -> std::result::Result<(), TransportError> {
            self.outgoing.push(frame.to_vec());
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8], _deadline: Duration) -> std::result::Result<usize, TransportError> {
            let next = self.incoming.pop_front().ok_or(TransportError::Timeout)?;
            buf[..next.len()].copy_from_slice(&next);
            Ok(next.len())
        }
    }

    fn pn532_caps() -> Capabilities {
        Capabilities {
            variant: ChipVariant::Pn532,
            modulations: Modulations::ISO14443A,
            has_in_auto_poll: true,
            has_paypass_and_secure_tg: false,
            prefixes_register_replies_with_status: false,
        }
    }

    #[test]
    fn diagnose_echo_matches_scenario_1() {
        // spec §8 scenario 1.
        let reply = frame::build_frame(&[0x01, 0x00, b'l', b'i', b'b', b'n', b'f', b'c']).unwrap();
        let mut reply = reply;
        let tfi_idx = reply.iter().position(|&b| b == frame::TFI_HOST_TO_CHIP).unwrap();
        reply[tfi_idx] = frame::TFI_CHIP_TO_HOST;
        let dcs_idx = reply.len() - 2;
        let mut sum: u32 = frame::TFI_CHIP_TO_HOST as u32;
        for &b in &[0x01u8, 0x00, b'l', b'i', b'b', b'n', b'f', b'c'] {
            sum += b as u32;
        }
        reply[dcs_idx] = (0x100u32 - (sum & 0xFF)) as u8;

        let mut transport = FakeTransport::new(vec![frame::ACK_FRAME.to_vec(), reply]);
        let mut chip = Pn53xChip::new(pn532_caps());
        let data = [commands::DIAGNOSE, 0x00, b'l', b'i', b'b', b'n', b'f', b'c'];
        let result = chip.transceive(&mut transport, &data, Duration::from_secs(1)).unwrap();
        assert_eq!(result, b"libnfc");
    }

    #[test]
    fn nack_surfaces_as_transport_error() {
        let mut transport = FakeTransport::new(vec![frame::NACK_FRAME.to_vec()]);
        let mut chip = Pn53xChip::new(pn532_caps());
        let err = chip
            .transceive(&mut transport, &[commands::DIAGNOSE, 0], Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Transport(TransportError::ReceivedNack));
    }

    #[test]
    fn status_bearing_command_surfaces_chip_error() {
        let payload = [commands::IN_DATA_EXCHANGE + 1, ChipError::Timeout as u8];
        let mut reply = frame::build_frame(&payload).unwrap();
        let tfi_idx = reply.iter().position(|&b| b == frame::TFI_HOST_TO_CHIP).unwrap();
        reply[tfi_idx] = frame::TFI_CHIP_TO_HOST;
        let dcs_idx = reply.len() - 2;
        let mut sum: u32 = frame::TFI_CHIP_TO_HOST as u32;
        for &b in &payload {
            sum += b as u32;
        }
        reply[dcs_idx] = (0x100u32 - (sum & 0xFF)) as u8;

        let mut transport = FakeTransport::new(vec![frame::ACK_FRAME.to_vec(), reply]);
        let mut chip = Pn53xChip::new(pn532_caps());
        let cmd = vec![commands::IN_DATA_EXCHANGE, 1, 0x00];
        let err = chip.transceive(&mut transport, &cmd, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Chip(ChipError::Timeout));
    }
}
