//! Embedded controller register catalog
//!
//! A register is identified by its 8-bit address alone. The names below
//! document what the default platform wiring uses; any other address can
//! be addressed through [`Register::new`].

use std::fmt;

/// An 8-bit embedded controller register address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(u8);

impl Register {
    /// Fan 1 rate set [%]
    pub const XSS1: Register = Register(0x2C);
    /// Fan 2 rate set [%]
    pub const XSS2: Register = Register(0x2D);
    /// Fan 1 rate get [%]
    pub const XGS1: Register = Register(0x2E);
    /// Fan 2 rate get [%]
    pub const XGS2: Register = Register(0x2F);
    /// Fan 1 level [hundreds of rpm]
    pub const SRP1: Register = Register(0x34);
    /// Fan 2 level [hundreds of rpm]
    pub const SRP2: Register = Register(0x35);
    /// Top of chassis temperature [°C]
    pub const TMP1: Register = Register(0x47);
    /// CPU temperature [°C]
    pub const CPUT: Register = Register(0x57);
    /// Board temperature [°C]
    pub const RTMP: Register = Register(0x58);
    /// Manual fan control flag
    pub const OMCC: Register = Register(0x62);
    /// Fan countdown [s], reverts to automatic control on expiry
    pub const XFCD: Register = Register(0x63);
    /// Fan mode
    pub const HPCM: Register = Register(0x95);
    /// Fan 1 speed, word [rpm]
    pub const RPM1: Register = Register(0xB0);
    /// Fan 2 speed, word [rpm]
    pub const RPM2: Register = Register(0xB2);
    /// GPU temperature [°C]
    pub const GPTM: Register = Register(0xB7);
    /// Fan switch
    pub const SFAN: Register = Register(0xF4);

    const NAMES: &'static [(Register, &'static str)] = &[
        (Self::XSS1, "XSS1"),
        (Self::XSS2, "XSS2"),
        (Self::XGS1, "XGS1"),
        (Self::XGS2, "XGS2"),
        (Self::SRP1, "SRP1"),
        (Self::SRP2, "SRP2"),
        (Self::TMP1, "TMP1"),
        (Self::CPUT, "CPUT"),
        (Self::RTMP, "RTMP"),
        (Self::OMCC, "OMCC"),
        (Self::XFCD, "XFCD"),
        (Self::HPCM, "HPCM"),
        (Self::RPM1, "RPM1"),
        (Self::RPM2, "RPM2"),
        (Self::GPTM, "GPTM"),
        (Self::SFAN, "SFAN"),
    ];

    pub const fn new(address: u8) -> Self {
        Self(address)
    }

    pub const fn address(self) -> u8 {
        self.0
    }

    /// The register holding the high byte of a word starting here
    pub const fn high(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Catalog name, if this address is one of the named registers
    pub fn name(self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(reg, _)| *reg == self)
            .map(|(_, name)| *name)
    }

    /// Look up a catalog register by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(reg, _)| *reg)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:02X})", name, self.0),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

impl From<u8> for Register {
    fn from(address: u8) -> Self {
        Self(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_high_byte_follows_low_byte() {
        assert_eq!(Register::RPM1.high().address(), 0xB1);
        assert_eq!(Register::new(0xFF).high().address(), 0x00);
    }

    #[test]
    fn test_names_are_documentation_only() {
        assert_eq!(Register::from_name("cput"), Some(Register::CPUT));
        assert_eq!(Register::new(0x57), Register::CPUT);
        assert_eq!(Register::new(0x01).name(), None);
        assert_eq!(Register::HPCM.to_string(), "HPCM (0x95)");
        assert_eq!(Register::new(0x01).to_string(), "0x01");
    }
}
