//! Target-descriptor decoding for every modulation type the PN53x reports
//! from `InListPassiveTarget`/`InAutoPoll` (spec §4.8).

use crate::chip::capability::ChipVariant;
use crate::error::{Error, FramingError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso14443A {
    pub atqa: [u8; 2],
    pub sak: u8,
    pub uid: Vec<u8>,
    pub ats: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso14443B {
    pub pupi: [u8; 4],
    pub application_data: [u8; 4],
    pub protocol_info: [u8; 3],
    pub card_identifier: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso14443Bi {
    pub div: [u8; 4],
    pub version: u8,
    pub config: Option<u8>,
    pub atr: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso14443B2Sr {
    pub uid: [u8; 8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso14443B2Ct {
    pub uid_lsb: [u8; 2],
    pub product_code: u8,
    pub fab_code: u8,
    pub uid_msb: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeliCa {
    pub response_code: u8,
    pub nfcid2: [u8; 8],
    pub pad: [u8; 8],
    pub system_code: Option<[u8; 2]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jewel {
    pub sens_res: [u8; 2],
    pub id: [u8; 4],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dep {
    pub nfcid3: Vec<u8>,
    pub general_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDescriptor {
    Iso14443A(Iso14443A),
    Iso14443B(Iso14443B),
    Iso14443Bi(Iso14443Bi),
    Iso14443B2Sr(Iso14443B2Sr),
    Iso14443B2Ct(Iso14443B2Ct),
    FeliCa(FeliCa),
    Jewel(Jewel),
    Dep(Dep),
}

/// Strips a leading Cascade-Tag `0x88` byte to recover the "real" 7- or
/// 10-byte UID (spec §4.8, §8 scenario 5).
///
/// `88 u1 u2 u3 u4 u5 u6 u7` (len 8) -> `u1..u7` (len 7).
/// `88 u1 u2 u3 88 u4 u5 u6 u7 u8 u9 u10` (len 12) -> 10 bytes with both
/// cascade tags removed.
pub fn strip_cascade_tag(raw: &[u8]) -> Vec<u8> {
    match raw.len() {
        8 if raw[0] == 0x88 => raw[1..8].to_vec(),
        12 if raw[0] == 0x88 && raw[4] == 0x88 => {
            let mut out = Vec::with_capacity(10);
            out.extend_from_slice(&raw[1..4]);
            out.extend_from_slice(&raw[5..12]);
            out
        }
        _ => raw.to_vec(),
    }
}

/// Decodes an ISO14443-A target blob following `InListPassiveTarget`
/// (spec §4.8). `blob` starts just after the target-number byte, which the
/// caller has already skipped.
///
/// ATQA byte order is swapped on PN531 relative to PN532/PN533.
pub fn decode_iso14443a(blob: &[u8], variant: ChipVariant) -> Result<Iso14443A, Error> {
    if blob.len() < 5 {
        return Err(FramingError::LengthMismatch.into());
    }
    let atqa = if variant == ChipVariant::Pn531 {
        [blob[1], blob[0]]
    } else {
        [blob[0], blob[1]]
    };
    let sak = blob[2];
    let uid_len = blob[3] as usize;
    if blob.len() < 4 + uid_len {
        return Err(FramingError::LengthMismatch.into());
    }
    let raw_uid = &blob[4..4 + uid_len];
    let uid = strip_cascade_tag(raw_uid);

    let mut cursor = 4 + uid_len;
    let ats = if cursor < blob.len() {
        let ats_len = blob[cursor] as usize; // includes this length byte itself
        if ats_len == 0 {
            None
        } else {
            if blob.len() < cursor + ats_len {
                return Err(FramingError::LengthMismatch.into());
            }
            let ats_bytes = blob[cursor..cursor + ats_len].to_vec();
            cursor += ats_len;
            Some(ats_bytes)
        }
    } else {
        None
    };
    let _ = cursor;

    Ok(Iso14443A { atqa, sak, uid, ats })
}

/// Decodes an ISO14443-B target blob (spec §4.8): skip the `0x50` ATQB
/// header byte, read PUPI/AppData/ProtoInfo, then an optional Card
/// Identifier byte gated on the ATTRIB length byte being non-zero.
pub fn decode_iso14443b(blob: &[u8]) -> Result<Iso14443B, Error> {
    if blob.is_empty() || blob[0] != 0x50 {
        return Err(FramingError::LengthMismatch.into());
    }
    if blob.len() < 1 + 4 + 4 + 3 {
        return Err(FramingError::LengthMismatch.into());
    }
    let mut pupi = [0u8; 4];
    pupi.copy_from_slice(&blob[1..5]);
    let mut application_data = [0u8; 4];
    application_data.copy_from_slice(&blob[5..9]);
    let mut protocol_info = [0u8; 3];
    protocol_info.copy_from_slice(&blob[9..12]);

    let card_identifier = if blob.len() > 12 && blob[12] != 0 {
        blob.get(13).copied()
    } else {
        None
    };

    Ok(Iso14443B {
        pupi,
        application_data,
        protocol_info,
        card_identifier,
    })
}

/// Decodes an ISO14443-B' (BI) blob: skip V&T, require `0x07` (REPGEN),
/// read 4-byte DIV, version byte; high bit set means long form with a
/// config byte, whose own bit 6 (`0x40`) gates whether a trailing ATR
/// follows (spec §4.8).
pub fn decode_iso14443bi(blob: &[u8]) -> Result<Iso14443Bi, Error> {
    if blob.len() < 2 + 1 + 4 + 1 {
        return Err(FramingError::LengthMismatch.into());
    }
    if blob[2] != 0x07 {
        return Err(FramingError::LengthMismatch.into());
    }
    let mut div = [0u8; 4];
    div.copy_from_slice(&blob[3..7]);
    let version = blob[7];

    let (config, atr) = if version & 0x80 != 0 {
        if blob.len() < 9 {
            return Err(FramingError::LengthMismatch.into());
        }
        let config = blob[8];
        let atr = if config & 0x40 != 0 && blob.len() > 9 {
            Some(blob[9..].to_vec())
        } else {
            None
        };
        (Some(config), atr)
    } else {
        (None, None)
    };

    Ok(Iso14443Bi { div, version, config, atr })
}

pub fn decode_iso14443b_2sr(blob: &[u8]) -> Result<Iso14443B2Sr, Error> {
    if blob.len() < 8 {
        return Err(FramingError::LengthMismatch.into());
    }
    let mut uid = [0u8; 8];
    uid.copy_from_slice(&blob[..8]);
    Ok(Iso14443B2Sr { uid })
}

pub fn decode_iso14443b_2ct(blob: &[u8]) -> Result<Iso14443B2Ct, Error> {
    if blob.len() < 6 {
        return Err(FramingError::LengthMismatch.into());
    }
    let mut uid_lsb = [0u8; 2];
    uid_lsb.copy_from_slice(&blob[0..2]);
    let product_code = blob[2];
    let fab_code = blob[3];
    let mut uid_msb = [0u8; 2];
    uid_msb.copy_from_slice(&blob[4..6]);
    Ok(Iso14443B2Ct {
        uid_lsb,
        product_code,
        fab_code,
        uid_msb,
    })
}

/// Decodes a FeliCa blob: length byte, response code, 8-byte NFCID2,
/// 8-byte PAD, optional 2-byte System Code when the overall length > 18.
pub fn decode_felica(blob: &[u8]) -> Result<FeliCa, Error> {
    if blob.len() < 1 {
        return Err(FramingError::LengthMismatch.into());
    }
    let len = blob[0] as usize;
    if blob.len() < len || len < 18 {
        return Err(FramingError::LengthMismatch.into());
    }
    let response_code = blob[1];
    let mut nfcid2 = [0u8; 8];
    nfcid2.copy_from_slice(&blob[2..10]);
    let mut pad = [0u8; 8];
    pad.copy_from_slice(&blob[10..18]);
    let system_code = if len > 18 && blob.len() >= 20 {
        let mut sc = [0u8; 2];
        sc.copy_from_slice(&blob[18..20]);
        Some(sc)
    } else {
        None
    };
    Ok(FeliCa {
        response_code,
        nfcid2,
        pad,
        system_code,
    })
}

/// Decodes a Jewel/Topaz blob: 2-byte SENS_RES, 4-byte ID (spec §4.8).
pub fn decode_jewel(blob: &[u8]) -> Result<Jewel, Error> {
    if blob.len() < 6 {
        return Err(FramingError::LengthMismatch.into());
    }
    let mut sens_res = [0u8; 2];
    sens_res.copy_from_slice(&blob[0..2]);
    let mut id = [0u8; 4];
    id.copy_from_slice(&blob[2..6]);
    Ok(Jewel { sens_res, id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_strip_matches_scenario_5_length_8() {
        let raw = [0x88, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        assert_eq!(strip_cascade_tag(&raw), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn cascade_strip_matches_scenario_5_length_12() {
        let raw = [
            0x88, 0xAA, 0xBB, 0xCC, 0x88, 0xDD, 0xEE, 0xFF, 0x11, 0x22, 0x33, 0x44,
        ];
        assert_eq!(
            strip_cascade_tag(&raw),
            vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x11, 0x22, 0x33, 0x44]
        );
    }

    #[test]
    fn non_cascade_uid_passes_through_unchanged() {
        let raw = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(strip_cascade_tag(&raw), raw.to_vec());
    }

    #[test]
    fn iso14443a_atqa_byte_order_swapped_on_pn531() {
        let blob = [0x00, 0x04, 0x08, 0x04, 0xAA, 0xBB, 0xCC, 0xDD];
        let t532 = decode_iso14443a(&blob, ChipVariant::Pn532).unwrap();
        assert_eq!(t532.atqa, [0x00, 0x04]);
        let t531 = decode_iso14443a(&blob, ChipVariant::Pn531).unwrap();
        assert_eq!(t531.atqa, [0x04, 0x00]);
        assert_eq!(t531.uid, vec![0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn iso14443a_no_ats_when_length_byte_is_zero() {
        let blob = [0x00, 0x04, 0x08, 0x04, 0xAA, 0xBB, 0xCC, 0xDD, 0x00];
        let t = decode_iso14443a(&blob, ChipVariant::Pn532).unwrap();
        assert!(t.ats.is_none());
    }

    #[test]
    fn iso14443b_requires_atqb_header_byte() {
        let mut blob = vec![0x50];
        blob.extend_from_slice(&[0; 4]); // PUPI
        blob.extend_from_slice(&[0; 4]); // AppData
        blob.extend_from_slice(&[0; 3]); // ProtoInfo
        let t = decode_iso14443b(&blob).unwrap();
        assert_eq!(t.pupi, [0u8; 4]);
        assert!(t.card_identifier.is_none());

        let mut bad = blob.clone();
        bad[0] = 0x51;
        assert!(decode_iso14443b(&bad).is_err());
    }

    #[test]
    fn iso14443b_reads_card_identifier_when_attrib_nonzero() {
        let mut blob = vec![0x50];
        blob.extend_from_slice(&[1, 2, 3, 4]);
        blob.extend_from_slice(&[5, 6, 7, 8]);
        blob.extend_from_slice(&[9, 10, 11]);
        blob.push(0x01); // ATTRIB length non-zero
        blob.push(0x42); // card identifier
        let t = decode_iso14443b(&blob).unwrap();
        assert_eq!(t.card_identifier, Some(0x42));
    }

    #[test]
    fn felica_decodes_system_code_only_past_eighteen_bytes() {
        let mut blob = vec![20u8]; // length byte including itself
        blob.push(0x01); // response code
        blob.extend_from_slice(&[0xAA; 8]); // NFCID2
        blob.extend_from_slice(&[0xBB; 8]); // PAD
        blob.extend_from_slice(&[0x00, 0x01]); // system code
        let t = decode_felica(&blob).unwrap();
        assert_eq!(t.system_code, Some([0x00, 0x01]));

        let mut short = vec![18u8];
        short.push(0x01);
        short.extend_from_slice(&[0xAA; 8]);
        short.extend_from_slice(&[0xBB; 8]);
        let t2 = decode_felica(&short).unwrap();
        assert!(t2.system_code.is_none());
    }

    #[test]
    fn jewel_decodes_sens_res_and_id() {
        let blob = [0x0C, 0x00, 0x01, 0x02, 0x03, 0x04];
        let t = decode_jewel(&blob).unwrap();
        assert_eq!(t.sens_res, [0x0C, 0x00]);
        assert_eq!(t.id, [1, 2, 3, 4]);
    }

    #[test]
    fn b_2sr_and_2ct_fixed_layouts() {
        let sr = decode_iso14443b_2sr(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(sr.uid, [1, 2, 3, 4, 5, 6, 7, 8]);

        let ct = decode_iso14443b_2ct(&[1, 2, 0x10, 0x20, 3, 4]).unwrap();
        assert_eq!(ct.uid_lsb, [1, 2]);
        assert_eq!(ct.product_code, 0x10);
        assert_eq!(ct.fab_code, 0x20);
        assert_eq!(ct.uid_msb, [3, 4]);
    }

    #[test]
    fn bi_long_form_reads_config_and_atr() {
        let mut blob = vec![0x00, 0x00, 0x07];
        blob.extend_from_slice(&[1, 2, 3, 4]); // DIV
        blob.push(0x80); // version, high bit set => long form
        blob.push(0x55); // config
        blob.extend_from_slice(&[0xAA, 0xBB]); // ATR
        let t = decode_iso14443bi(&blob).unwrap();
        assert_eq!(t.config, Some(0x55));
        assert_eq!(t.atr, Some(vec![0xAA, 0xBB]));
    }

    #[test]
    fn bi_long_form_without_config_bit_0x40_has_no_atr() {
        let mut blob = vec![0x00, 0x00, 0x07];
        blob.extend_from_slice(&[1, 2, 3, 4]); // DIV
        blob.push(0x80); // version, high bit set => long form
        blob.push(0x15); // config, bit 0x40 clear
        blob.extend_from_slice(&[0xAA, 0xBB]); // trailing bytes present but not an ATR
        let t = decode_iso14443bi(&blob).unwrap();
        assert_eq!(t.config, Some(0x15));
        assert!(t.atr.is_none());
    }

    #[test]
    fn bi_short_form_has_no_config_or_atr() {
        let mut blob = vec![0x00, 0x00, 0x07];
        blob.extend_from_slice(&[1, 2, 3, 4]);
        blob.push(0x01); // high bit clear
        let t = decode_iso14443bi(&blob).unwrap();
        assert!(t.config.is_none());
        assert!(t.atr.is_none());
    }
}
