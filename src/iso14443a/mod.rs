//! ISO14443-A bit-layer codec: CRC-A and the nibble-mirrored parity frame
//! (un)wrapper used when `parity_handled_by_chip = false` (spec §4.7).
//!
//! Independent of the PN53x wire framing in `crate::chip::frame`; this is
//! the bit-level codec external Mifare-Classic utilities transceive
//! through via `initiator_transceive_bits`.

pub mod bits;
pub mod crc;

pub use bits::{unwrap_frame, wrap_frame};
pub use crc::{append_crc_a, crc_a};
