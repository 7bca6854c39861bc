//! Explicit process-wide context (spec §3, §9 "Global state becomes
//! explicit context"): driver registry, allow-list, intrusive-scan gate.
//!
//! No implicit singleton: callers construct a `Context` explicitly and
//! thread it through every `scan`/`open` call, matching the teacher's
//! pattern of threading state via `&mut self` rather than process globals
//! (`peripheral/mfrc522/mod.rs`, `pcd.rs`).

use crate::connstring;
use crate::device::Device;
use crate::driver::{DriverOps, ScanType};
use crate::drivers;
use crate::error::{Error, Result, TransportError};

pub struct Context {
    drivers: Vec<&'static dyn DriverOps>,
    allow_list: Option<Vec<&'static str>>,
    intrusive_scan_allowed: bool,
    device_connstrings: Vec<String>,
}

impl Context {
    /// All built-in drivers enabled, intrusive scanning allowed
    /// (SPEC_FULL.md §1.3).
    pub fn new() -> Self {
        Context {
            drivers: drivers::built_in_drivers(),
            allow_list: None,
            intrusive_scan_allowed: true,
            device_connstrings: Vec::new(),
        }
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder {
            drivers: drivers::built_in_drivers(),
            allow_list: None,
            intrusive_scan_allowed: true,
            device_connstrings: Vec::new(),
        }
    }

    fn is_allowed(&self, name: &str) -> bool {
        match &self.allow_list {
            Some(allowed) => allowed.iter().any(|&a| a == name),
            None => true,
        }
    }

    fn find_driver(&self, name: &str) -> Option<&'static dyn DriverOps> {
        self.drivers
            .iter()
            .copied()
            .find(|d| d.name() == name && self.is_allowed(d.name()))
    }

    /// Scans every registered, allow-listed driver, honoring
    /// `intrusive_scan_allowed` (spec §4.2), then appends any
    /// configuration-supplied explicit connstrings (spec §6.3).
    pub fn scan(&self) -> Vec<String> {
        self.drivers
            .iter()
            .filter(|d| self.is_allowed(d.name()))
            .filter(|d| self.intrusive_scan_allowed || d.scan_type() == ScanType::NotIntrusive)
            .flat_map(|d| d.scan())
            .chain(self.device_connstrings.iter().cloned())
            .collect()
    }

    /// Opens `connstring`, dispatching on its driver name (spec §4.2).
    pub fn open(&self, connstring: &str) -> Result<Device> {
        let parsed = connstring::parse(connstring);
        let driver = self
            .find_driver(parsed.driver)
            .ok_or_else(|| Error::from(TransportError::NoSuchDevice))?;
        driver.open(parsed.specifier.unwrap_or(""), parsed.baudrate)
    }

    pub fn device_connstrings(&self) -> &[String] {
        &self.device_connstrings
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

/// Builds a [`Context`] with a restricted driver set, denied intrusive
/// scanning, and/or pre-supplied connstrings (spec §6.3 configuration).
pub struct ContextBuilder {
    drivers: Vec<&'static dyn DriverOps>,
    allow_list: Option<Vec<&'static str>>,
    intrusive_scan_allowed: bool,
    device_connstrings: Vec<String>,
}

impl ContextBuilder {
    pub fn allow_drivers(mut self, names: Vec<&'static str>) -> Self {
        self.allow_list = Some(names);
        self
    }

    pub fn deny_intrusive_scan(mut self) -> Self {
        self.intrusive_scan_allowed = false;
        self
    }

    pub fn with_connstring(mut self, connstring: impl Into<String>) -> Self {
        self.device_connstrings.push(connstring.into());
        self
    }

    pub fn build(self) -> Context {
        Context {
            drivers: self.drivers,
            allow_list: self.allow_list,
            intrusive_scan_allowed: self.intrusive_scan_allowed,
            device_connstrings: self.device_connstrings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_allows_every_built_in_driver() {
        let ctx = Context::new();
        for d in &ctx.drivers {
            assert!(ctx.is_allowed(d.name()));
        }
    }

    #[test]
    fn allow_list_restricts_open_and_scan() {
        let ctx = Context::builder().allow_drivers(vec!["pn532_uart"]).build();
        assert!(ctx.is_allowed("pn532_uart"));
        assert!(!ctx.is_allowed("pn53x_usb"));
        assert!(ctx.open("pn53x_usb:").is_err());
    }

    #[test]
    fn explicit_connstrings_surface_from_scan() {
        let ctx = Context::builder()
            .with_connstring("pn532_uart:/dev/ttyUSB0:115200")
            .build();
        assert!(ctx
            .scan()
            .contains(&"pn532_uart:/dev/ttyUSB0:115200".to_string()));
    }
}
