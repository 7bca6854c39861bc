//! PN53x opcode catalog (spec §6.1) and status-bearing command classification
//! (spec §4.9).

/// Feature-support mask bits, mirroring spec §6.1's "1=PN531, 2=PN532, 4=PN533".
pub const SUPPORTED_PN531: u8 = 1;
pub const SUPPORTED_PN532: u8 = 2;
pub const SUPPORTED_PN533: u8 = 4;
pub const SUPPORTED_ALL: u8 = SUPPORTED_PN531 | SUPPORTED_PN532 | SUPPORTED_PN533;

macro_rules! opcodes {
    ($( $name:ident = $code:literal / $mask:expr ),+ $(,)?) => {
        $( pub const $name: u8 = $code; )+

        /// Returns the feature-support mask for a given opcode, or `None` if unknown.
        pub fn support_mask(opcode: u8) -> Option<u8> {
            match opcode {
                $( $code => Some($mask), )+
                _ => None,
            }
        }
    };
}

opcodes! {
    DIAGNOSE = 0x00 / SUPPORTED_ALL,
    GET_FIRMWARE_VERSION = 0x02 / SUPPORTED_ALL,
    GET_GENERAL_STATUS = 0x04 / SUPPORTED_ALL,
    READ_REGISTER = 0x06 / SUPPORTED_ALL,
    WRITE_REGISTER = 0x08 / SUPPORTED_ALL,
    READ_GPIO = 0x0C / SUPPORTED_ALL,
    WRITE_GPIO = 0x0E / SUPPORTED_ALL,
    SET_SERIAL_BAUD_RATE = 0x10 / SUPPORTED_ALL,
    SET_PARAMETERS = 0x12 / SUPPORTED_ALL,
    SAM_CONFIGURATION = 0x14 / (SUPPORTED_PN532 | SUPPORTED_PN533),
    POWER_DOWN = 0x16 / (SUPPORTED_PN532 | SUPPORTED_PN533),
    ALPAR_COMMAND_FOR_TDA = 0x18 / SUPPORTED_PN533,
    RF_CONFIGURATION = 0x32 / SUPPORTED_ALL,
    RF_REGULATION_TEST = 0x58 / SUPPORTED_ALL,
    IN_JUMP_FOR_DEP = 0x56 / SUPPORTED_ALL,
    IN_JUMP_FOR_PSL = 0x46 / SUPPORTED_ALL,
    IN_LIST_PASSIVE_TARGET = 0x4A / SUPPORTED_ALL,
    IN_ATR = 0x50 / SUPPORTED_ALL,
    IN_PSL = 0x4E / SUPPORTED_ALL,
    IN_DATA_EXCHANGE = 0x40 / SUPPORTED_ALL,
    IN_COMMUNICATE_THRU = 0x42 / SUPPORTED_ALL,
    IN_QUARTET_BYTE_EXCHANGE = 0x38 / SUPPORTED_PN533,
    IN_DESELECT = 0x44 / SUPPORTED_ALL,
    IN_RELEASE = 0x52 / SUPPORTED_ALL,
    IN_SELECT = 0x54 / SUPPORTED_ALL,
    IN_AUTO_POLL = 0x60 / SUPPORTED_PN532,
    IN_ACTIVATE_DEACTIVATE_PAYPASS = 0x48 / SUPPORTED_PN533,
    TG_INIT_AS_TARGET = 0x8C / SUPPORTED_ALL,
    TG_SET_GENERAL_BYTES = 0x92 / SUPPORTED_ALL,
    TG_GET_DATA = 0x86 / SUPPORTED_ALL,
    TG_SET_DATA = 0x8E / SUPPORTED_ALL,
    TG_SET_METADATA = 0x94 / SUPPORTED_ALL,
    TG_GET_INITIATOR_COMMAND = 0x88 / SUPPORTED_ALL,
    TG_RESPONSE_TO_INITIATOR = 0x90 / SUPPORTED_ALL,
    TG_GET_TARGET_STATUS = 0x8A / SUPPORTED_ALL,
}

/// Commands whose first reply byte is a chip-level status to extract and
/// check (spec §4.9). Commands not in this list (`ReadRegister`,
/// `WriteRegister`, `SetParameters`, `RFConfiguration`,
/// `GetFirmwareVersion`, `Diagnose`) leave `last_error := 0` unconditionally.
pub fn is_status_bearing(opcode: u8) -> bool {
    matches!(
        opcode,
        POWER_DOWN
            | IN_DATA_EXCHANGE
            | IN_COMMUNICATE_THRU
            | IN_JUMP_FOR_PSL
            | IN_PSL
            | IN_ATR
            | IN_SELECT
            | IN_JUMP_FOR_DEP
            | TG_GET_DATA
            | TG_GET_INITIATOR_COMMAND
            | TG_SET_DATA
            | TG_RESPONSE_TO_INITIATOR
            | TG_SET_GENERAL_BYTES
            | TG_SET_METADATA
    )
}

/// `InDeselect`/`InRelease` are status-bearing on PN531/PN532 but
/// status-free on RC-S360 (spec §4.9, Open Question resolved in
/// SPEC_FULL.md §3.2 / DESIGN.md).
pub fn is_status_bearing_for_variant(opcode: u8, variant: crate::chip::capability::ChipVariant) -> bool {
    use crate::chip::capability::ChipVariant;
    if matches!(opcode, IN_DESELECT | IN_RELEASE) {
        return !matches!(variant, ChipVariant::RcS360);
    }
    is_status_bearing(opcode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::capability::ChipVariant;

    #[test]
    fn in_data_exchange_is_status_bearing_everywhere() {
        assert!(is_status_bearing_for_variant(IN_DATA_EXCHANGE, ChipVariant::Pn531));
        assert!(is_status_bearing_for_variant(IN_DATA_EXCHANGE, ChipVariant::RcS360));
    }

    #[test]
    fn in_deselect_diverges_on_rcs360() {
        assert!(is_status_bearing_for_variant(IN_DESELECT, ChipVariant::Pn531));
        assert!(is_status_bearing_for_variant(IN_DESELECT, ChipVariant::Pn532));
        assert!(!is_status_bearing_for_variant(IN_DESELECT, ChipVariant::RcS360));
    }

    #[test]
    fn read_register_carries_no_status() {
        assert!(!is_status_bearing(READ_REGISTER));
        assert!(!is_status_bearing(GET_FIRMWARE_VERSION));
        assert!(!is_status_bearing(DIAGNOSE));
    }

    #[test]
    fn in_auto_poll_is_pn532_only() {
        assert_eq!(support_mask(IN_AUTO_POLL), Some(SUPPORTED_PN532));
    }
}
