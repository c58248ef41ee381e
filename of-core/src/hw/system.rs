//! System capability and state queries
//!
//! Capability records that cannot change at runtime are fetched once and
//! cached; power and graphics state is queried fresh every time.

use std::sync::Arc;

use tracing::debug;

use crate::bios::{
    AdapterStatus, Bios, ColorTable, FanTable, FanType, GpuMode, GpuPowerData, KbdType, SystemData,
};
use crate::error::Result;

pub struct SystemInfo {
    bios: Arc<Bios>,
    system: Option<SystemData>,
    fan_count: Option<u8>,
    fan_type: Option<FanType>,
    kbd_type: Option<KbdType>,
    has_backlight: Option<bool>,
}

impl SystemInfo {
    pub fn new(bios: &Arc<Bios>) -> Self {
        Self {
            bios: Arc::clone(bios),
            system: None,
            fan_count: None,
            fan_type: None,
            kbd_type: None,
            has_backlight: None,
        }
    }

    pub fn bios(&self) -> &Bios {
        &self.bios
    }

    pub fn system(&mut self) -> Result<SystemData> {
        if let Some(system) = self.system {
            return Ok(system);
        }
        let system = self.bios.system()?;
        debug!("System capabilities: {:?}", system.support);
        self.system = Some(system);
        Ok(system)
    }

    pub fn fan_count(&mut self) -> Result<u8> {
        if let Some(count) = self.fan_count {
            return Ok(count);
        }
        let count = self.bios.fan_count()?;
        self.fan_count = Some(count);
        Ok(count)
    }

    pub fn fan_type(&mut self) -> Result<FanType> {
        if let Some(fan_type) = self.fan_type {
            return Ok(fan_type);
        }
        let fan_type = self.bios.fan_type()?;
        self.fan_type = Some(fan_type);
        Ok(fan_type)
    }

    /// Firmware default fan table
    pub fn fan_table(&self) -> Result<FanTable> {
        self.bios.fan_table()
    }

    pub fn kbd_type(&mut self) -> Result<KbdType> {
        if let Some(kbd_type) = self.kbd_type {
            return Ok(kbd_type);
        }
        let kbd_type = self.bios.kbd_type()?;
        self.kbd_type = Some(kbd_type);
        Ok(kbd_type)
    }

    pub fn has_backlight(&mut self) -> Result<bool> {
        if let Some(has) = self.has_backlight {
            return Ok(has);
        }
        let has = self.bios.has_backlight()?;
        self.has_backlight = Some(has);
        Ok(has)
    }

    pub fn backlight(&self) -> Result<bool> {
        self.bios.backlight()
    }

    pub fn set_backlight(&self, on: bool) -> Result<()> {
        self.bios.set_backlight(on)
    }

    pub fn color_table(&self) -> Result<ColorTable> {
        self.bios.color_table()
    }

    pub fn set_color_table(&self, table: &ColorTable) -> Result<()> {
        self.bios.set_color_table(table)
    }

    pub fn adapter(&self) -> Result<AdapterStatus> {
        self.bios.adapter()
    }

    pub fn throttling(&self) -> Result<bool> {
        self.bios.throttling()
    }

    pub fn gpu_mode(&self) -> GpuMode {
        self.bios.gpu_mode()
    }

    pub fn set_gpu_mode(&self, mode: GpuMode) -> Result<()> {
        self.bios.set_gpu_mode(mode)
    }

    pub fn gpu_power(&self) -> Result<GpuPowerData> {
        self.bios.gpu_power()
    }

    pub fn set_gpu_power(&self, power: GpuPowerData) -> Result<()> {
        self.bios.set_gpu_power(power)
    }
}
