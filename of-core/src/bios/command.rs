//! BIOS command identifiers
//!
//! A call names one of four commands and a 32-bit command type within it.
//! The transport only supports five fixed output buffer sizes, each reached
//! through its own WMI method.

/// Command id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BiosCmd {
    /// General gaming-platform calls
    Default = 0x20008,
    /// Keyboard backlight and color calls
    Keyboard = 0x20009,
    /// Older calls (GPU mode query among them)
    Legacy = 0x00001,
    /// GPU mode switching
    GpuMode = 0x00002,
}

impl BiosCmd {
    pub fn id(self) -> u32 {
        self as u32
    }
}

/// Command types used by the typed calls
pub mod cmd_type {
    pub const GET_ADAPTER: u32 = 0x0F;
    pub const GET_FAN_COUNT: u32 = 0x10;
    pub const SET_FAN_MODE: u32 = 0x1A;
    pub const GET_GPU_POWER: u32 = 0x21;
    pub const SET_GPU_POWER: u32 = 0x22;
    pub const GET_TEMPERATURE: u32 = 0x23;
    pub const GET_MAX_FAN: u32 = 0x26;
    pub const SET_MAX_FAN: u32 = 0x27;
    pub const GET_SYSTEM: u32 = 0x28;
    pub const GET_KBD_TYPE: u32 = 0x2B;
    pub const GET_FAN_TYPE: u32 = 0x2C;
    pub const GET_FAN_LEVEL: u32 = 0x2D;
    pub const SET_FAN_LEVEL: u32 = 0x2E;
    pub const GET_FAN_TABLE: u32 = 0x2F;
    pub const GET_THROTTLING: u32 = 0x35;
    pub const GPU_MODE: u32 = 0x52;

    /// Keyboard command types
    pub const HAS_BACKLIGHT: u32 = 0x01;
    pub const GET_COLOR_TABLE: u32 = 0x02;
    pub const SET_COLOR_TABLE: u32 = 0x03;
    pub const GET_BACKLIGHT: u32 = 0x04;
    pub const SET_BACKLIGHT: u32 = 0x05;
}

/// Output buffer size of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    Zero,
    Four,
    Small,
    Large,
    Huge,
}

impl OutputSize {
    /// Buffer length in bytes
    pub fn len(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::Four => 4,
            Self::Small => 128,
            Self::Large => 1024,
            Self::Huge => 4096,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Self::Zero
    }

    /// WMI method id serving this size
    pub fn method_id(self) -> u32 {
        match self {
            Self::Zero => 1,
            Self::Four => 2,
            Self::Small => 3,
            Self::Large => 4,
            Self::Huge => 5,
        }
    }

    /// The size matching `len` exactly
    pub fn from_len(len: usize) -> Option<Self> {
        [Self::Zero, Self::Four, Self::Small, Self::Large, Self::Huge]
            .into_iter()
            .find(|s| s.len() == len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fixed_sizes_exist() {
        assert_eq!(OutputSize::from_len(128), Some(OutputSize::Small));
        assert_eq!(OutputSize::from_len(4096).map(OutputSize::method_id), Some(5));
        assert_eq!(OutputSize::from_len(64), None);
    }

    #[test]
    fn test_command_ids() {
        assert_eq!(BiosCmd::Default.id(), 0x20008);
        assert_eq!(BiosCmd::Keyboard.id(), 0x20009);
        assert_eq!(BiosCmd::Legacy.id(), 1);
        assert_eq!(BiosCmd::GpuMode.id(), 2);
    }
}
