//! Binary codecs for BIOS data structures
//!
//! Every structure is decoded from and encoded to an explicit byte layout;
//! nothing relies on in-memory struct packing.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{OmenfanError, Result};

fn require_len(what: &'static str, buf: &[u8], len: usize) -> Result<()> {
    if buf.len() < len {
        return Err(OmenfanError::invalid_data(
            what,
            format!("need {} bytes, got {}", len, buf.len()),
        ));
    }
    Ok(())
}

// ============================================================================
// Fan mode
// ============================================================================

/// Fan mode byte
///
/// Several names map onto the same byte. [`FanMode::name`] always returns
/// the canonical name; the legacy aliases are accepted by
/// [`FanMode::from_name`] only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FanMode(u8);

struct FanModeName {
    value: u8,
    name: &'static str,
    legacy_alias: bool,
}

const FAN_MODE_NAMES: &[FanModeName] = &[
    FanModeName { value: 0x00, name: "LegacyDefault", legacy_alias: false },
    FanModeName { value: 0x00, name: "L0", legacy_alias: true },
    FanModeName { value: 0x01, name: "LegacyPerformance", legacy_alias: false },
    FanModeName { value: 0x01, name: "L1", legacy_alias: true },
    FanModeName { value: 0x02, name: "LegacyCool", legacy_alias: false },
    FanModeName { value: 0x02, name: "L2", legacy_alias: true },
    FanModeName { value: 0x03, name: "LegacyQuiet", legacy_alias: false },
    FanModeName { value: 0x03, name: "L3", legacy_alias: true },
    FanModeName { value: 0x04, name: "LegacyExtreme", legacy_alias: false },
    FanModeName { value: 0x04, name: "L4", legacy_alias: true },
    FanModeName { value: 0x30, name: "Default", legacy_alias: false },
    FanModeName { value: 0x30, name: "Balanced", legacy_alias: true },
    FanModeName { value: 0x31, name: "Performance", legacy_alias: false },
    FanModeName { value: 0x50, name: "Cool", legacy_alias: false },
];

impl FanMode {
    pub const LEGACY_DEFAULT: FanMode = FanMode(0x00);
    pub const DEFAULT: FanMode = FanMode(0x30);
    pub const PERFORMANCE: FanMode = FanMode(0x31);
    pub const COOL: FanMode = FanMode(0x50);

    pub const fn from_byte(value: u8) -> Self {
        Self(value)
    }

    pub const fn byte(self) -> u8 {
        self.0
    }

    /// Canonical name, if the byte is a known mode
    pub fn name(self) -> Option<&'static str> {
        FAN_MODE_NAMES
            .iter()
            .find(|n| n.value == self.0 && !n.legacy_alias)
            .map(|n| n.name)
    }

    /// Parse a canonical name, a legacy alias, or a `0x..` byte
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(hex) = name.strip_prefix("0x").or_else(|| name.strip_prefix("0X")) {
            return u8::from_str_radix(hex, 16).ok().map(Self);
        }
        FAN_MODE_NAMES
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
            .map(|n| Self(n.value))
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

impl Serialize for FanMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FanMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        FanMode::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown fan mode '{}'", name)))
    }
}

// ============================================================================
// Graphics
// ============================================================================

/// Graphics switching mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuMode {
    Hybrid,
    Discrete,
    Optimus,
}

impl GpuMode {
    pub fn byte(self) -> u8 {
        match self {
            Self::Hybrid => 0x00,
            Self::Discrete => 0x01,
            Self::Optimus => 0x02,
        }
    }

    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Hybrid),
            0x01 => Some(Self::Discrete),
            0x02 => Some(Self::Optimus),
            _ => None,
        }
    }
}

/// GPU power record (4 bytes)
///
/// | byte | field                                  |
/// |------|----------------------------------------|
/// | 0    | custom TGP enabled (0/1)               |
/// | 1    | PPAB enabled (0/1)                     |
/// | 2    | D-state (1-5)                          |
/// | 3    | peak temperature threshold [°C], 0=off |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuPowerData {
    pub custom_tgp: bool,
    pub ppab: bool,
    pub d_state: u8,
    pub peak_temperature: u8,
}

impl GpuPowerData {
    pub const LEN: usize = 4;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len("GPU power", buf, Self::LEN)?;
        Ok(Self {
            custom_tgp: buf[0] != 0,
            ppab: buf[1] != 0,
            d_state: buf[2],
            peak_temperature: buf[3],
        })
    }

    pub fn encode(&self) -> [u8; 4] {
        [
            u8::from(self.custom_tgp),
            u8::from(self.ppab),
            self.d_state,
            self.peak_temperature,
        ]
    }

    /// Preset this record corresponds to
    pub fn level(&self) -> GpuPowerLevel {
        match (self.custom_tgp, self.ppab) {
            (true, true) => GpuPowerLevel::Maximum,
            (true, false) => GpuPowerLevel::Medium,
            _ => GpuPowerLevel::Minimum,
        }
    }
}

/// GPU power presets a fan program can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPowerLevel {
    /// Base power only
    Minimum,
    /// Custom TGP
    Medium,
    /// Custom TGP and PPAB
    Maximum,
}

impl GpuPowerLevel {
    /// Record applying this preset, keeping the other fields of `current`
    pub fn apply_to(self, current: GpuPowerData) -> GpuPowerData {
        let (custom_tgp, ppab) = match self {
            Self::Minimum => (false, false),
            Self::Medium => (true, false),
            Self::Maximum => (true, true),
        };
        GpuPowerData {
            custom_tgp,
            ppab,
            d_state: if current.d_state == 0 { 1 } else { current.d_state },
            peak_temperature: current.peak_temperature,
        }
    }
}

impl fmt::Display for GpuPowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minimum => "Minimum",
            Self::Medium => "Medium",
            Self::Maximum => "Maximum",
        })
    }
}

// ============================================================================
// Fan table
// ============================================================================

/// One row of the firmware fan table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanTableEntry {
    pub fan1_level: u8,
    pub fan2_level: u8,
    pub temperature: u8,
}

/// Firmware fan table (128 bytes)
///
/// Byte 0 is the fan count, byte 1 the number of rows, followed by up to
/// 14 rows of (fan 1 level, fan 2 level, temperature).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FanTable {
    pub fan_count: u8,
    pub entries: Vec<FanTableEntry>,
}

impl FanTable {
    pub const LEN: usize = 128;
    pub const MAX_ENTRIES: usize = 14;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len("fan table", buf, 2 + 3 * Self::MAX_ENTRIES)?;
        let count = usize::from(buf[1]);
        if count > Self::MAX_ENTRIES {
            return Err(OmenfanError::invalid_data(
                "fan table",
                format!("{} rows exceed the maximum of {}", count, Self::MAX_ENTRIES),
            ));
        }
        let entries = buf[2..2 + 3 * count]
            .chunks_exact(3)
            .map(|row| FanTableEntry {
                fan1_level: row[0],
                fan2_level: row[1],
                temperature: row[2],
            })
            .collect();
        Ok(Self {
            fan_count: buf[0],
            entries,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.entries.len() > Self::MAX_ENTRIES {
            return Err(OmenfanError::invalid_data(
                "fan table",
                format!("{} rows exceed the maximum of {}", self.entries.len(), Self::MAX_ENTRIES),
            ));
        }
        let mut buf = vec![0u8; Self::LEN];
        buf[0] = self.fan_count;
        buf[1] = self.entries.len() as u8;
        for (i, entry) in self.entries.iter().enumerate() {
            let at = 2 + 3 * i;
            buf[at] = entry.fan1_level;
            buf[at + 1] = entry.fan2_level;
            buf[at + 2] = entry.temperature;
        }
        Ok(buf)
    }
}

// ============================================================================
// Keyboard
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Keyboard zone color table (128 bytes)
///
/// Byte 0 is the zone count, bytes 1-24 are reserved, and up to four RGB
/// triples start at byte 25.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorTable {
    pub zones: Vec<Rgb>,
}

impl ColorTable {
    pub const LEN: usize = 128;
    pub const MAX_ZONES: usize = 4;
    const ZONES_OFFSET: usize = 25;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len("color table", buf, Self::ZONES_OFFSET + 3 * Self::MAX_ZONES)?;
        let count = usize::from(buf[0]).min(Self::MAX_ZONES);
        let zones = buf[Self::ZONES_OFFSET..Self::ZONES_OFFSET + 3 * count]
            .chunks_exact(3)
            .map(|c| Rgb { r: c[0], g: c[1], b: c[2] })
            .collect();
        Ok(Self { zones })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.zones.len() > Self::MAX_ZONES {
            return Err(OmenfanError::invalid_data(
                "color table",
                format!("{} zones exceed the maximum of {}", self.zones.len(), Self::MAX_ZONES),
            ));
        }
        let mut buf = vec![0u8; Self::LEN];
        buf[0] = self.zones.len() as u8;
        for (i, zone) in self.zones.iter().enumerate() {
            let at = Self::ZONES_OFFSET + 3 * i;
            buf[at..at + 3].copy_from_slice(&[zone.r, zone.g, zone.b]);
        }
        Ok(buf)
    }
}

/// Keyboard layout reported by the BIOS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KbdType {
    Standard,
    WithNumpad,
    TenKeyless,
    PerKeyRgb,
    Other(u8),
}

impl From<u8> for KbdType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Standard,
            0x01 => Self::WithNumpad,
            0x02 => Self::TenKeyless,
            0x03 => Self::PerKeyRgb,
            other => Self::Other(other),
        }
    }
}

/// Keyboard backlight register values
pub mod backlight {
    pub const ON: u8 = 0xE4;
    pub const OFF: u8 = 0x64;
}

// ============================================================================
// System
// ============================================================================

bitflags! {
    /// Capability bits of the system record
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SupportFlags: u8 {
        const SOFTWARE_FAN_CONTROL = 0x01;
        const EXTREME_MODE = 0x02;
        const EXTREME_MODE_UNLOCKED = 0x04;
    }
}

/// System capability record (128 bytes, first 9 meaningful)
///
/// | byte | field                              |
/// |------|------------------------------------|
/// | 0-1  | status flags (LE)                  |
/// | 2    | reserved                           |
/// | 3    | thermal policy version             |
/// | 4    | support flags                      |
/// | 5    | default CPU power limit 4 [W]      |
/// | 6    | BIOS overclocking support (0/1)    |
/// | 7    | GPU mode switch support (0/1)      |
/// | 8    | default CPU power limit with GPU [W] |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemData {
    pub status_flags: u16,
    pub thermal_policy: u8,
    pub support: SupportFlags,
    pub default_cpu_power_limit4: u8,
    pub bios_overclocking: bool,
    pub gpu_mode_switch: bool,
    pub default_cpu_power_limit_with_gpu: u8,
}

impl SystemData {
    pub const LEN: usize = 128;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len("system", buf, 9)?;
        Ok(Self {
            status_flags: u16::from_le_bytes([buf[0], buf[1]]),
            thermal_policy: buf[3],
            support: SupportFlags::from_bits_retain(buf[4]),
            default_cpu_power_limit4: buf[5],
            bios_overclocking: buf[6] != 0,
            gpu_mode_switch: buf[7] != 0,
            default_cpu_power_limit_with_gpu: buf[8],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::LEN];
        buf[..2].copy_from_slice(&self.status_flags.to_le_bytes());
        buf[3] = self.thermal_policy;
        buf[4] = self.support.bits();
        buf[5] = self.default_cpu_power_limit4;
        buf[6] = u8::from(self.bios_overclocking);
        buf[7] = u8::from(self.gpu_mode_switch);
        buf[8] = self.default_cpu_power_limit_with_gpu;
        buf
    }
}

/// Power adapter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterStatus {
    NotSupported,
    MeetsRequirement,
    BelowRequirement,
    BatteryPower,
    NotFunctioning,
    Other(u8),
}

impl AdapterStatus {
    /// Whether the machine runs on external power
    ///
    /// Only [`AdapterStatus::BatteryPower`] counts as battery; other states,
    /// unsupported or unknown ones included, are taken as AC.
    pub fn on_ac(self) -> bool {
        !matches!(self, Self::BatteryPower)
    }
}

impl From<u8> for AdapterStatus {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::NotSupported,
            0x01 => Self::MeetsRequirement,
            0x02 => Self::BelowRequirement,
            0x03 => Self::BatteryPower,
            0x04 => Self::NotFunctioning,
            other => Self::Other(other),
        }
    }
}

/// Fan hardware types, one nibble per fan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanType {
    pub fan1: u8,
    pub fan2: u8,
}

impl From<u8> for FanType {
    fn from(value: u8) -> Self {
        Self {
            fan1: value & 0x0F,
            fan2: value >> 4,
        }
    }
}
