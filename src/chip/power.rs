//! Power-mode and operating-mode state machines (spec §4.5, §4.1).

use crate::chip::capability::ChipVariant;
use crate::chip::commands;

/// Only PN532 observes LOWVBAT/POWERDOWN (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    Normal,
    PowerDown,
    LowVbat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Idle,
    Initiator,
    Target,
}

/// SAM configuration mode byte (supplemented from `original_source`,
/// SPEC_FULL.md §2: the original switches on this byte and rejects
/// unknown values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamMode {
    Normal = 0x01,
    VirtualCard = 0x02,
    WiredMode = 0x03,
    DualCard = 0x04,
}

/// Builds the `SAMConfiguration` command payload. `Normal` mode sends only
/// the 2-byte short form; the other modes send the full 4-byte form
/// (timeout + IRQ byte left at 0, matching the original's unhandled-but-sent
/// defaults).
pub fn sam_configuration_payload(mode: SamMode) -> Vec<u8> {
    let mut cmd = vec![commands::SAM_CONFIGURATION, mode as u8];
    if !matches!(mode, SamMode::Normal) {
        cmd.push(0x00);
        cmd.push(0x00);
    }
    cmd
}

/// Builds the `PowerDown` command payload. The wake-source mask is fixed at
/// `0xF0` (SPEC_FULL.md §2), matching `original_source`'s
/// `pn53x_PowerDown`.
pub fn power_down_payload() -> Vec<u8> {
    vec![commands::POWER_DOWN, 0xF0]
}

/// Whether this chip variant models LOWVBAT/POWERDOWN at all (spec §4.5:
/// "Only PN532 observes LOWVBAT/POWERDOWN").
pub fn observes_power_states(variant: ChipVariant) -> bool {
    matches!(variant, ChipVariant::Pn532)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sam_normal_is_short_form() {
        assert_eq!(sam_configuration_payload(SamMode::Normal).len(), 2);
    }

    #[test]
    fn sam_virtual_card_is_long_form() {
        assert_eq!(sam_configuration_payload(SamMode::VirtualCard).len(), 4);
    }

    #[test]
    fn power_down_uses_fixed_wake_mask() {
        assert_eq!(power_down_payload(), vec![commands::POWER_DOWN, 0xF0]);
    }

    #[test]
    fn only_pn532_observes_power_states() {
        assert!(observes_power_states(ChipVariant::Pn532));
        assert!(!observes_power_states(ChipVariant::Pn531));
        assert!(!observes_power_states(ChipVariant::Pn533));
        assert!(!observes_power_states(ChipVariant::RcS360));
    }
}
