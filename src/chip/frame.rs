//! PN53x wire-format frame codec (spec §4.3, §6.1).

use crate::error::FramingError;

pub const TFI_HOST_TO_CHIP: u8 = 0xD4;
pub const TFI_CHIP_TO_HOST: u8 = 0xD5;

pub const PREAMBLE: [u8; 3] = [0x00, 0x00, 0xFF];

pub const ACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];
pub const NACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00];
pub const ERROR_FRAME: [u8; 8] = [0x00, 0x00, 0xFF, 0x01, 0xFF, 0x7F, 0x81, 0x00];

/// Normal frames carry at most 254 data bytes; beyond that an extended
/// frame is required (max 264).
pub const MAX_NORMAL_DATA: usize = 254;
pub const MAX_EXTENDED_DATA: usize = 264;

/// Builds a complete host→chip frame around `data` (§4.3).
///
/// `data[0]` is the command opcode. Chooses the normal frame form when
/// `data.len() <= 254`, otherwise the extended form.
pub fn build_frame(data: &[u8]) -> Result<Vec<u8>, FramingError> {
    build_frame_with_tfi(TFI_HOST_TO_CHIP, data)
}

/// Builds a complete chip→host frame around `data`. Used by transports
/// (PC/SC) that receive the PN53x payload through a non-wire encoding and
/// must hand the chip engine's generic [`parse_frame`] something it
/// recognizes.
pub fn build_reply_frame(data: &[u8]) -> Result<Vec<u8>, FramingError> {
    build_frame_with_tfi(TFI_CHIP_TO_HOST, data)
}

fn build_frame_with_tfi(tfi: u8, data: &[u8]) -> Result<Vec<u8>, FramingError> {
    if data.len() > MAX_EXTENDED_DATA {
        return Err(FramingError::LengthMismatch);
    }

    let len = data.len() + 1; // +1 for TFI
    let mut out = Vec::with_capacity(len + 11);
    out.extend_from_slice(&PREAMBLE);

    if data.len() <= MAX_NORMAL_DATA {
        let lcs = (0x100u16 - len as u16) as u8;
        out.push(len as u8);
        out.push(lcs);
    } else {
        out.push(0xFF);
        out.push(0xFF);
        let len_m = (len >> 8) as u8;
        let len_l = (len & 0xFF) as u8;
        let lcs = (0x100u16 - ((len_m as u16 + len_l as u16) & 0xFF)) as u8;
        out.push(len_m);
        out.push(len_l);
        out.push(lcs);
    }

    out.push(tfi);
    out.extend_from_slice(data);

    let mut sum: u32 = tfi as u32;
    for &b in data {
        sum += b as u32;
    }
    let dcs = (0x100u32 - (sum & 0xFF)) as u8;
    out.push(dcs);
    out.push(0x00);

    Ok(out)
}

/// Extracts `(tfi, data)` from a frame's preamble/length/checksum header
/// without validating which direction the TFI belongs to. Used directly by
/// transports (PC/SC) that must decompose an already-built host→chip frame
/// into their own synthetic encoding, and internally by [`parse_frame`].
pub fn split_frame(frame: &[u8]) -> Result<(u8, &[u8]), FramingError> {
    if frame.len() < 6 || frame[0..3] != PREAMBLE {
        return Err(FramingError::BadPreamble);
    }

    let (len, header_len): (usize, usize) = if frame[3] == 0xFF && frame[4] == 0xFF {
        if frame.len() < 9 {
            return Err(FramingError::LengthMismatch);
        }
        let len_m = frame[5] as usize;
        let len_l = frame[6] as usize;
        let len = (len_m << 8) | len_l;
        let lcs = frame[7];
        let expected_lcs = (0x100usize - ((len_m + len_l) & 0xFF)) as u8;
        if lcs != expected_lcs {
            return Err(FramingError::BadLengthChecksum);
        }
        (len, 8)
    } else {
        let len = frame[3] as usize;
        let lcs = frame[4];
        let expected_lcs = (0x100u16 - len as u16) as u8;
        if lcs != expected_lcs {
            return Err(FramingError::BadLengthChecksum);
        }
        (len, 5)
    };

    if len == 0 {
        return Err(FramingError::LengthMismatch);
    }

    let body_end = header_len + len;
    if frame.len() < body_end + 2 {
        return Err(FramingError::LengthMismatch);
    }

    let tfi = frame[header_len];
    let data = &frame[header_len + 1..body_end];
    let dcs = frame[body_end];

    let mut sum: u32 = tfi as u32;
    for &b in data {
        sum += b as u32;
    }
    let expected_dcs = (0x100u32 - (sum & 0xFF)) as u8;
    if dcs != expected_dcs {
        return Err(FramingError::BadDataChecksum);
    }

    if frame[body_end + 1] != 0x00 {
        return Err(FramingError::BadPostamble);
    }

    Ok((tfi, data))
}

/// Parses a chip→host reply frame, returning `(tfi, data)`.
///
/// Frame-integrity failures fail with the `FRAMING` error kind (§4.3).
pub fn parse_frame(frame: &[u8]) -> Result<(u8, Vec<u8>), FramingError> {
    let (tfi, data) = split_frame(frame)?;
    if tfi != TFI_CHIP_TO_HOST {
        return Err(FramingError::BadTfi);
    }
    Ok((tfi, data.to_vec()))
}

/// Checks whether `frame` is exactly the literal ACK sequence (§8 scenario 3).
pub fn is_ack_frame(frame: &[u8]) -> bool {
    frame == ACK_FRAME
}

pub fn is_nack_frame(frame: &[u8]) -> bool {
    frame == NACK_FRAME
}

pub fn is_error_frame(frame: &[u8]) -> bool {
    frame == ERROR_FRAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnose_echo_frame_matches_scenario_1_length_fields() {
        // spec §8 scenario 1: D4 00 00 'libnfc'
        let data = [0x00u8, 0x00, b'l', b'i', b'b', b'n', b'f', b'c'];
        let frame = build_frame(&data).unwrap();
        assert_eq!(frame[3], 9, "LEN = |data|+1");
        assert_eq!(frame[4], 0xF7, "LCS = 0x100 - 9");
        // DCS is a deterministic function of TFI + data (checked generically
        // by the round-trip test below); self-check here that build/parse
        // agree rather than hardcoding a derived byte.
    }

    #[test]
    fn build_then_parse_is_bit_exact_for_small_and_large_payloads() {
        for size in [0usize, 1, 254, 255, 264] {
            let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
            let frame = build_frame(&data).unwrap();
            // Flip the TFI to simulate a chip reply for the parser (build_frame always
            // emits host TFI; parse_frame expects chip TFI, so patch it here).
            let mut frame = frame;
            let tfi_index = frame.iter().position(|&b| b == TFI_HOST_TO_CHIP).unwrap();
            // Recompute DCS with the chip TFI substituted.
            frame[tfi_index] = TFI_CHIP_TO_HOST;
            let mut sum: u32 = TFI_CHIP_TO_HOST as u32;
            for &b in &data {
                sum += b as u32;
            }
            let dcs_index = frame.len() - 2;
            frame[dcs_index] = (0x100u32 - (sum & 0xFF)) as u8;

            let (tfi, parsed) = parse_frame(&frame).unwrap();
            assert_eq!(tfi, TFI_CHIP_TO_HOST);
            assert_eq!(parsed, data);
        }
    }

    #[test]
    fn ack_nack_error_literals() {
        assert!(is_ack_frame(&ACK_FRAME));
        assert!(is_nack_frame(&NACK_FRAME));
        assert!(is_error_frame(&ERROR_FRAME));
        assert!(!is_ack_frame(&NACK_FRAME));
    }

    #[test]
    fn bad_preamble_is_framing_error() {
        let bogus = [0x01, 0x00, 0xFF, 0x02, 0xFE, 0xD5, 0x00, 0x2B, 0x00];
        assert_eq!(parse_frame(&bogus), Err(FramingError::BadPreamble));
    }

    #[test]
    fn bad_checksum_is_detected() {
        let data = [0x03u8, 0x32, 0x01, 0x06, 0x07];
        let mut frame = build_frame(&data).unwrap();
        let tfi_index = frame.iter().position(|&b| b == TFI_HOST_TO_CHIP).unwrap();
        frame[tfi_index] = TFI_CHIP_TO_HOST;
        let dcs_index = frame.len() - 2;
        frame[dcs_index] ^= 0xFF;
        assert_eq!(parse_frame(&frame), Err(FramingError::BadDataChecksum));
    }
}
