//! Connection-string grammar: `driver_name[:device_specifier[:baudrate]]`
//! (spec §4.2, §6.3).
//!
//! The trailing `:baudrate` segment is only ever numeric, so it is
//! distinguished from a specifier that itself contains a colon (USB's
//! `bus:device-index` form) by attempting to parse it as an integer first.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnString<'a> {
    pub driver: &'a str,
    pub specifier: Option<&'a str>,
    pub baudrate: Option<u32>,
}

/// Parses `connstring` per spec §4.2/§6.3. Never fails: an unparseable or
/// driver-only string simply yields `specifier: None`.
pub fn parse(connstring: &str) -> ConnString<'_> {
    let Some((driver, rest)) = connstring.split_once(':') else {
        return ConnString {
            driver: connstring,
            specifier: None,
            baudrate: None,
        };
    };
    if rest.is_empty() {
        return ConnString { driver, specifier: None, baudrate: None };
    }

    if let Some((head, tail)) = rest.rsplit_once(':') {
        if let Ok(baud) = tail.parse::<u32>() {
            return ConnString {
                driver,
                specifier: Some(head),
                baudrate: Some(baud),
            };
        }
    }

    ConnString {
        driver,
        specifier: Some(rest),
        baudrate: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uart_connstring_splits_specifier_and_baud() {
        let c = parse("pn532_uart:/dev/ttyUSB0:115200");
        assert_eq!(c.driver, "pn532_uart");
        assert_eq!(c.specifier, Some("/dev/ttyUSB0"));
        assert_eq!(c.baudrate, Some(115200));
    }

    #[test]
    fn i2c_connstring_has_no_baud() {
        let c = parse("pn532_i2c:/dev/i2c-1");
        assert_eq!(c.driver, "pn532_i2c");
        assert_eq!(c.specifier, Some("/dev/i2c-1"));
        assert_eq!(c.baudrate, None);
    }

    #[test]
    fn usb_connstring_keeps_bus_and_device_together() {
        // "dev" is not numeric, so the whole tail is the specifier rather
        // than being mistaken for a baud rate.
        let c = parse("acr122_usb:bus:dev");
        assert_eq!(c.specifier, Some("bus:dev"));
        assert_eq!(c.baudrate, None);
    }

    #[test]
    fn pcsc_reader_name_with_spaces_is_kept_whole() {
        let c = parse("pcsc:ACS ACR122U 00 00");
        assert_eq!(c.driver, "pcsc");
        assert_eq!(c.specifier, Some("ACS ACR122U 00 00"));
    }

    #[test]
    fn driver_only_connstring_has_no_specifier() {
        let c = parse("pn53x_usb");
        assert_eq!(c.driver, "pn53x_usb");
        assert_eq!(c.specifier, None);
    }
}
