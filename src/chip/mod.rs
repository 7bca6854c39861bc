//! The PN53x command engine: frame codec, register cache, capability
//! selection, power-mode state machine, and the transceive pipeline that
//! ties them together (spec §4.3-§4.10).

pub mod capability;
pub mod commands;
pub mod engine;
pub mod frame;
pub mod power;
pub mod registers;
pub mod target;
pub mod timing;

pub use capability::{Capabilities, ChipVariant, Modulations};
pub use engine::Pn53xChip;
pub use power::{OperatingMode, PowerMode};
pub use target::TargetDescriptor;
