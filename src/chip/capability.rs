//! Firmware-version-based chip-variant and capability selection (spec §4.6).

/// Chip variant, determined from `GetFirmwareVersion`'s reply length and IC byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipVariant {
    Pn531,
    Pn532,
    Pn533,
    RcS360,
}

bitflags::bitflags! {
    /// Supported modulation mask, mirroring libnfc's `SUPPORT_ISO14443A` et al.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modulations: u8 {
        const ISO14443A = 0b0000_0001;
        const ISO14443B = 0b0000_0010;
        const ISO18092  = 0b0000_0100;
        const JEWEL     = 0b0000_1000;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub variant: ChipVariant,
    pub modulations: Modulations,
    pub has_in_auto_poll: bool,
    pub has_paypass_and_secure_tg: bool,
    /// PN533 prepends a status byte to ReadRegister/WriteRegister/FIFO
    /// replies; the engine strips it when this is set.
    pub prefixes_register_replies_with_status: bool,
}

/// Decodes the raw `GetFirmwareVersion` reply payload (without the D5 03
/// reply-code prefix) into a capability set (spec §4.6).
///
/// PN531 returns 2 bytes (no IC byte); PN532/PN533/RC-S360 return 4, the
/// second of which is the IC byte distinguishing them. `0x33, 0x01`
/// (IC byte, support byte) identifies the Sony RC-S360 mask.
pub fn capabilities_from_firmware_version(payload: &[u8]) -> Option<Capabilities> {
    match payload.len() {
        2 => Some(Capabilities {
            variant: ChipVariant::Pn531,
            // PN531 lacks ISO14443-B and Jewel (spec §4.6).
            modulations: Modulations::ISO14443A | Modulations::ISO18092,
            has_in_auto_poll: false,
            has_paypass_and_secure_tg: false,
            prefixes_register_replies_with_status: false,
        }),
        4 => {
            let ic = payload[0];
            let support = payload[3];
            match ic {
                0x32 => Some(Capabilities {
                    variant: ChipVariant::Pn532,
                    modulations: modulations_from_support_byte(support),
                    has_in_auto_poll: true,
                    has_paypass_and_secure_tg: false,
                    prefixes_register_replies_with_status: false,
                }),
                0x33 if payload[1] == 0x01 => Some(Capabilities {
                    variant: ChipVariant::RcS360,
                    modulations: modulations_from_support_byte(support),
                    has_in_auto_poll: false,
                    has_paypass_and_secure_tg: false,
                    prefixes_register_replies_with_status: false,
                }),
                0x33 => Some(Capabilities {
                    variant: ChipVariant::Pn533,
                    modulations: modulations_from_support_byte(support),
                    has_in_auto_poll: false,
                    has_paypass_and_secure_tg: true,
                    prefixes_register_replies_with_status: true,
                }),
                _ => None, // unknown IC byte fails the open (spec §4.6)
            }
        }
        _ => None,
    }
}

fn modulations_from_support_byte(support: u8) -> Modulations {
    let mut m = Modulations::empty();
    if support & 0x01 != 0 {
        m |= Modulations::ISO14443A;
    }
    if support & 0x02 != 0 {
        m |= Modulations::ISO14443B;
    }
    if support & 0x04 != 0 {
        m |= Modulations::ISO18092;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_firmware_version_pn532_matches_scenario_2() {
        // spec §8 scenario 2: reply payload `32 01 06 07` (after the D5 03
        // reply header is stripped by the caller).
        let payload = [0x32u8, 0x01, 0x06, 0x07];
        let caps = capabilities_from_firmware_version(&payload).unwrap();
        assert_eq!(caps.variant, ChipVariant::Pn532);
        assert!(caps.modulations.contains(Modulations::ISO14443A));
        assert!(caps.modulations.contains(Modulations::ISO14443B));
        assert!(caps.modulations.contains(Modulations::ISO18092));
    }

    #[test]
    fn rc_s360_mask_is_recognized() {
        let payload = [0x33u8, 0x01, 0x00, 0x07];
        let caps = capabilities_from_firmware_version(&payload).unwrap();
        assert_eq!(caps.variant, ChipVariant::RcS360);
    }

    #[test]
    fn pn533_mask_is_recognized_when_not_sony_rom() {
        let payload = [0x33u8, 0x06, 0x07, 0x07];
        let caps = capabilities_from_firmware_version(&payload).unwrap();
        assert_eq!(caps.variant, ChipVariant::Pn533);
        assert!(caps.has_paypass_and_secure_tg);
    }

    #[test]
    fn pn531_has_no_iso14443b_or_jewel() {
        let payload = [0x01u8, 0x02];
        let caps = capabilities_from_firmware_version(&payload).unwrap();
        assert_eq!(caps.variant, ChipVariant::Pn531);
        assert!(!caps.modulations.contains(Modulations::ISO14443B));
        assert!(!caps.modulations.contains(Modulations::JEWEL));
    }

    #[test]
    fn unknown_ic_byte_fails() {
        let payload = [0x00u8, 0x99, 0x00, 0x00];
        assert!(capabilities_from_firmware_version(&payload).is_none());
    }
}
