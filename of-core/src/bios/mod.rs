//! Platform BIOS calls
//!
//! [`Bios`] wraps a [`BiosChannel`] with one typed method per supported
//! call. Calls that some firmware revisions answer unreliably interpret
//! the raw status themselves instead of going through the checked path.

mod channel;
mod command;
mod data;
mod transport;

pub use channel::{decode_response, encode_envelope, BiosChannel, BiosResponse};
pub use command::{cmd_type, BiosCmd, OutputSize};
pub use data::{
    backlight, AdapterStatus, ColorTable, FanMode, FanTable, FanTableEntry, FanType, GpuMode,
    GpuPowerData, GpuPowerLevel, KbdType, Rgb, SupportFlags, SystemData,
};
pub use transport::{parse_buffer, AcpiCallTransport, BiosTransport};

use tracing::{debug, info};

use crate::error::Result;
use crate::settings::BiosSettings;

/// Sentinel preceding the mode byte in a fan mode request
const FAN_MODE_PREFIX: u8 = 0xFF;

/// Typed BIOS calls
pub struct Bios {
    channel: BiosChannel,
}

impl Bios {
    pub fn new(channel: BiosChannel) -> Self {
        Self { channel }
    }

    /// BIOS reached through acpi_call
    pub fn open(settings: &BiosSettings) -> Self {
        let transport = AcpiCallTransport::new(settings);
        if !transport.is_available() {
            info!(
                "{} not present, BIOS calls will fail until acpi_call is loaded",
                settings.acpi_call_path.display()
            );
        }
        Self::new(BiosChannel::new(Box::new(transport), settings.check_errors))
    }

    pub fn channel(&self) -> &BiosChannel {
        &self.channel
    }

    fn query(&self, cmd: BiosCmd, cmd_type: u32, size: OutputSize) -> Result<Vec<u8>> {
        Ok(self.channel.call(cmd, cmd_type, &[0; 4], size)?)
    }

    fn query_byte(&self, cmd: BiosCmd, cmd_type: u32) -> Result<u8> {
        Ok(self.query(cmd, cmd_type, OutputSize::Four)?[0])
    }

    fn command(&self, cmd: BiosCmd, cmd_type: u32, input: &[u8]) -> Result<()> {
        self.channel.call(cmd, cmd_type, input, OutputSize::Zero)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fans
    // ------------------------------------------------------------------

    pub fn fan_count(&self) -> Result<u8> {
        self.query_byte(BiosCmd::Default, cmd_type::GET_FAN_COUNT)
    }

    pub fn fan_type(&self) -> Result<FanType> {
        self.query_byte(BiosCmd::Default, cmd_type::GET_FAN_TYPE).map(FanType::from)
    }

    /// Current (fan 1, fan 2) levels
    pub fn fan_level(&self) -> Result<(u8, u8)> {
        let data = self.query(BiosCmd::Default, cmd_type::GET_FAN_LEVEL, OutputSize::Small)?;
        Ok((data[0], data[1]))
    }

    /// Set both fan levels in one call
    ///
    /// The firmware rejects a (0, 0) pair; use the fan switch to stop both fans.
    pub fn set_fan_level(&self, fan1: u8, fan2: u8) -> Result<()> {
        debug!("Setting fan levels {}/{}", fan1, fan2);
        self.command(BiosCmd::Default, cmd_type::SET_FAN_LEVEL, &[fan1, fan2])
    }

    pub fn fan_table(&self) -> Result<FanTable> {
        let data = self.query(BiosCmd::Default, cmd_type::GET_FAN_TABLE, OutputSize::Small)?;
        FanTable::decode(&data)
    }

    /// Set the fan mode
    ///
    /// The firmware also re-arms the fan countdown as a side effect.
    pub fn set_fan_mode(&self, mode: FanMode) -> Result<()> {
        debug!("Setting fan mode {}", mode);
        self.command(
            BiosCmd::Default,
            cmd_type::SET_FAN_MODE,
            &[FAN_MODE_PREFIX, mode.byte(), 0, 0],
        )
    }

    /// Whether the fans are forced to maximum speed
    pub fn max_fan(&self) -> Result<bool> {
        Ok(self.query_byte(BiosCmd::Default, cmd_type::GET_MAX_FAN)? != 0)
    }

    pub fn set_max_fan(&self, enabled: bool) -> Result<()> {
        self.command(BiosCmd::Default, cmd_type::SET_MAX_FAN, &[u8::from(enabled)])
    }

    // ------------------------------------------------------------------
    // Sensors and power
    // ------------------------------------------------------------------

    /// Firmware temperature reading [°C]
    pub fn temperature(&self) -> Result<u8> {
        Ok(self
            .channel
            .call(BiosCmd::Default, cmd_type::GET_TEMPERATURE, &[0x01, 0, 0, 0], OutputSize::Four)?[0])
    }

    pub fn adapter(&self) -> Result<AdapterStatus> {
        self.query_byte(BiosCmd::Default, cmd_type::GET_ADAPTER).map(AdapterStatus::from)
    }

    /// Whether the firmware is thermally throttling
    pub fn throttling(&self) -> Result<bool> {
        Ok(self.query_byte(BiosCmd::Default, cmd_type::GET_THROTTLING)? != 0)
    }

    pub fn system(&self) -> Result<SystemData> {
        let data = self.query(BiosCmd::Default, cmd_type::GET_SYSTEM, OutputSize::Small)?;
        SystemData::decode(&data)
    }

    // ------------------------------------------------------------------
    // Graphics
    // ------------------------------------------------------------------

    /// Graphics mode; any failure reports [`GpuMode::Hybrid`]
    pub fn gpu_mode(&self) -> GpuMode {
        let response = self
            .channel
            .send(BiosCmd::Legacy, cmd_type::GPU_MODE, &[0; 4], OutputSize::Four);
        if !response.is_success() {
            debug!("GPU mode query returned {}, assuming hybrid", response.status);
            return GpuMode::Hybrid;
        }
        GpuMode::from_byte(response.data[0]).unwrap_or(GpuMode::Hybrid)
    }

    /// Select the graphics mode, effective after reboot
    pub fn set_gpu_mode(&self, mode: GpuMode) -> Result<()> {
        self.command(BiosCmd::GpuMode, cmd_type::GPU_MODE, &[mode.byte(), 0, 0, 0])
    }

    pub fn gpu_power(&self) -> Result<GpuPowerData> {
        let data = self.query(BiosCmd::Default, cmd_type::GET_GPU_POWER, OutputSize::Four)?;
        GpuPowerData::decode(&data)
    }

    pub fn set_gpu_power(&self, power: GpuPowerData) -> Result<()> {
        debug!("Setting GPU power {:?}", power);
        self.command(BiosCmd::Default, cmd_type::SET_GPU_POWER, &power.encode())
    }

    // ------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------

    pub fn kbd_type(&self) -> Result<KbdType> {
        self.query_byte(BiosCmd::Default, cmd_type::GET_KBD_TYPE).map(KbdType::from)
    }

    pub fn has_backlight(&self) -> Result<bool> {
        Ok(self.query_byte(BiosCmd::Keyboard, cmd_type::HAS_BACKLIGHT)? & 0x01 != 0)
    }

    pub fn backlight(&self) -> Result<bool> {
        Ok(self.query_byte(BiosCmd::Keyboard, cmd_type::GET_BACKLIGHT)? == backlight::ON)
    }

    pub fn set_backlight(&self, on: bool) -> Result<()> {
        let value = if on { backlight::ON } else { backlight::OFF };
        self.command(BiosCmd::Keyboard, cmd_type::SET_BACKLIGHT, &[value, 0, 0, 0])
    }

    pub fn color_table(&self) -> Result<ColorTable> {
        let data = self.query(BiosCmd::Keyboard, cmd_type::GET_COLOR_TABLE, OutputSize::Small)?;
        ColorTable::decode(&data)
    }

    pub fn set_color_table(&self, table: &ColorTable) -> Result<()> {
        self.command(BiosCmd::Keyboard, cmd_type::SET_COLOR_TABLE, &table.encode()?)
    }
}
