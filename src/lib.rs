//! `pn53x_core`: device-independent core for the PN53x family of NFC
//! controllers (PN531, PN532, PN533, and the Sony RC-S360 clone).
//!
//! The public surface is deliberately narrow: construct a [`Context`], use
//! it to [`Context::scan`]/[`Context::open`] a [`Device`], then drive the
//! device through the initiator-role operations in [`initiator`] or the
//! target-role operations in [`target`]. Everything below `Device` (frame
//! codec, register cache, transport plumbing) is reachable for driver
//! authors and integration tests but is not meant to be hand-assembled by
//! ordinary callers.

pub mod chip;
pub mod connstring;
pub mod context;
pub mod device;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod initiator;
pub mod iso14443a;
pub mod target;
pub mod transport;

pub use context::{Context, ContextBuilder};
pub use device::{BoolProperty, Device, IntProperty};
pub use driver::{DriverOps, ScanType};
pub use error::{Error, ErrorKind, ExitCode, Result};
