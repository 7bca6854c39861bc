//! Nibble-mirrored, parity-interleaved ISO14443-A bit frame (un)wrapper
//! (spec §4.7), used when `parity_handled_by_chip = false` and the host
//! must supply/observe parity bits directly. This is the bit-transceive
//! codec external Mifare-Classic key-recovery utilities rely on; it is
//! independent of the PN53x wire framing in `crate::chip::frame`.
//!
//! Translated from the PN53x driver's `pn53x_wrap_frame`/`pn53x_unwrap_frame`
//! (`original_source/libnfc/chips/pn53x.c`): mirror the frame bytes, append
//! a parity bit after each, then re-mirror the resulting byte stream so the
//! air interface sees LSB-first bits.

/// Bit-reverses a byte (`mirror(x)` in spec §4.7).
pub fn mirror(byte: u8) -> u8 {
    byte.reverse_bits()
}

fn write_at(frame: &mut Vec<u8>, pos: usize, value: u8) {
    if pos < frame.len() {
        frame[pos] = value;
    } else {
        debug_assert_eq!(pos, frame.len());
        frame.push(value);
    }
}

/// Wraps `data` bytes, each carrying its supplied odd-parity bit from
/// `parity`, into the air-frame byte stream (spec §4.7).
///
/// `parity.len()` must equal `data.len()`. A single byte (fewer than 9
/// frame bits) is returned unmodified, matching the PN53x short-response
/// special case.
pub fn wrap_frame(data: &[u8], parity: &[bool]) -> Vec<u8> {
    assert_eq!(data.len(), parity.len());

    let tx_bits = data.len() * 8;
    if tx_bits == 0 {
        return Vec::new();
    }
    if tx_bits < 9 {
        return vec![data[0]];
    }

    let mut frame: Vec<u8> = Vec::new();
    let mut data_pos = 0usize;
    let mut frame_pos = 0usize;
    let mut bits_left = tx_bits;

    'outer: loop {
        let mut carry: u16 = 0;
        for bit_pos in 0u32..8 {
            let mirrored_data = mirror(data[data_pos]) as u16;
            carry |= mirrored_data >> bit_pos;
            write_at(&mut frame, frame_pos, mirror(carry as u8));

            carry = (mirrored_data << (8 - bit_pos)) & 0xFF;
            let par: u16 = parity[data_pos] as u16;
            carry |= par << (7 - bit_pos);

            frame_pos += 1;
            write_at(&mut frame, frame_pos, mirror(carry as u8));

            data_pos += 1;
            if bits_left < 9 {
                break 'outer;
            }
            bits_left -= 8;
        }
        frame_pos += 1;
    }

    frame
}

/// Inverse of [`wrap_frame`]: reconstructs `(data, parity)` from an
/// `frame_bits`-bit air frame, each of length `⌈frame_bits / 9⌉` bytes
/// (spec §4.7).
pub fn unwrap_frame(frame: &[u8], frame_bits: usize) -> (Vec<u8>, Vec<bool>) {
    if frame_bits == 0 {
        return (Vec::new(), Vec::new());
    }
    if frame_bits < 9 {
        return (vec![frame[0]], vec![false]);
    }

    let rx_bits = frame_bits - (frame_bits / 9);
    let rx_bytes = (rx_bits + 7) / 8;
    let mut data = Vec::with_capacity(rx_bytes);
    let mut parity = Vec::with_capacity(rx_bytes);

    let mut data_pos = 0usize;
    let mut bits_left = frame_bits;

    'outer: loop {
        for bit_pos in 0u32..8 {
            let head = mirror(frame[data_pos]);
            let mut byte = head << bit_pos;
            let tail_source = mirror(frame[data_pos + 1]);
            byte |= tail_source >> (8 - bit_pos);
            data.push(mirror(byte));
            parity.push((tail_source >> (7 - bit_pos)) & 0x01 != 0);

            data_pos += 1;
            if bits_left < 9 {
                break 'outer;
            }
            bits_left -= 9;
        }
    }

    (data, parity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_matches_scenario_6() {
        // spec §8 scenario 6: data [0x26, 0x93] with parity [1, 0].
        let data = [0x26u8, 0x93];
        let parity = [true, false];
        let frame = wrap_frame(&data, &parity);
        let frame_bits = data.len() * 9;
        let (out_data, out_parity) = unwrap_frame(&frame, frame_bits);
        assert_eq!(out_data, data);
        assert_eq!(out_parity, parity);
    }

    #[test]
    fn property_round_trip_for_varied_lengths_and_patterns() {
        for len in [1usize, 2, 3, 7, 16] {
            let data: Vec<u8> = (0..len).map(|i| (i * 37 + 5) as u8).collect();
            let parity: Vec<bool> = (0..len).map(|i| i % 2 == 0).collect();
            let frame = wrap_frame(&data, &parity);
            let (out_data, out_parity) = unwrap_frame(&frame, len * 9);
            assert_eq!(out_data, data, "data mismatch for len={len}");
            assert_eq!(out_parity, parity, "parity mismatch for len={len}");
        }
    }

    #[test]
    fn single_byte_short_frame_is_passthrough() {
        let frame = wrap_frame(&[0xAB], &[true]);
        assert_eq!(frame, vec![0xAB]);
        let (data, parity) = unwrap_frame(&[0xAB], 8);
        assert_eq!(data, vec![0xAB]);
        assert_eq!(parity, vec![false]);
    }

    #[test]
    fn mirror_is_its_own_inverse() {
        for b in [0x00u8, 0x01, 0x80, 0xFF, 0x26, 0x93] {
            assert_eq!(mirror(mirror(b)), b);
        }
    }
}
