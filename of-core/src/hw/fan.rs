//! Fans and whole-system fan controls
//!
//! Per-fan values live in EC registers. Setting both levels at once, the
//! fan mode and the maximum speed switch go through the BIOS.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bios::{Bios, FanMode};
use crate::constants::fan;
use crate::ec::{EmbeddedController, Register};
use crate::error::Result;
use crate::hw::component::{Access, DataSize, FnSource, HardwareComponent};
use crate::settings::FanSettings;

/// A (fan 1, fan 2) level pair in hundreds of rpm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FanLevels {
    pub fan1: u8,
    pub fan2: u8,
}

impl FanLevels {
    /// Both fans under automatic control
    pub const AUTO: FanLevels = FanLevels::new(fan::LEVEL_AUTO, fan::LEVEL_AUTO);

    pub const fn new(fan1: u8, fan2: u8) -> Self {
        Self { fan1, fan2 }
    }

    /// Both fans stopped; only reachable through the fan switch
    pub fn is_off(self) -> bool {
        self.fan1 == 0 && self.fan2 == 0
    }
}

impl fmt::Display for FanLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.fan1, self.fan2)
    }
}

/// Which fan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanId {
    Cpu,
    Gpu,
}

impl FanId {
    fn registers(self) -> FanRegisters {
        match self {
            Self::Cpu => FanRegisters {
                level: Register::SRP1,
                rate: Register::XGS1,
                rate_set: Register::XSS1,
                speed: Register::RPM1,
            },
            Self::Gpu => FanRegisters {
                level: Register::SRP2,
                rate: Register::XGS2,
                rate_set: Register::XSS2,
                speed: Register::RPM2,
            },
        }
    }
}

struct FanRegisters {
    level: Register,
    rate: Register,
    rate_set: Register,
    speed: Register,
}

/// One fan actuator
#[derive(Debug)]
pub struct Fan {
    id: FanId,
    level: HardwareComponent,
    rate: HardwareComponent,
    rate_set: HardwareComponent,
    speed: HardwareComponent,
}

impl Fan {
    pub fn new(id: FanId, ec: &Arc<EmbeddedController>, settings: &FanSettings) -> Self {
        let regs = id.registers();
        Self {
            id,
            level: HardwareComponent::ec(ec, regs.level, DataSize::Byte, Access::ReadWrite)
                .without_zero_debounce(),
            rate: HardwareComponent::ec(ec, regs.rate, DataSize::Byte, Access::Read)
                .with_constraint(u16::from(settings.rate_max)),
            rate_set: HardwareComponent::ec(ec, regs.rate_set, DataSize::Byte, Access::Write),
            speed: HardwareComponent::ec(ec, regs.speed, DataSize::Word, Access::Read)
                .with_constraint(settings.speed_constraint()),
        }
    }

    pub fn id(&self) -> FanId {
        self.id
    }

    /// Level [hundreds of rpm]
    pub fn level(&mut self) -> u8 {
        self.level.read() as u8
    }

    pub fn set_level(&mut self, level: u8) -> Result<()> {
        self.level.set_value(u16::from(level))
    }

    /// Rate [%]
    pub fn rate(&mut self) -> u8 {
        self.rate.read() as u8
    }

    pub fn set_rate(&mut self, rate: u8) -> Result<()> {
        self.rate_set.set_value(u16::from(rate))
    }

    /// Speed [rpm]
    pub fn speed(&mut self) -> u16 {
        self.speed.read()
    }

    pub fn speed_component(&self) -> &HardwareComponent {
        &self.speed
    }
}

/// Both fans plus the global controls
pub struct FanArray {
    bios: Arc<Bios>,
    fans: [Fan; 2],
    manual: HardwareComponent,
    switch: HardwareComponent,
    mode: HardwareComponent,
    countdown: HardwareComponent,
}

impl FanArray {
    pub fn new(ec: &Arc<EmbeddedController>, bios: &Arc<Bios>, settings: &FanSettings) -> Self {
        let mode_ec = Arc::clone(ec);
        let mode_bios = Arc::clone(bios);
        let mode_source = FnSource::new()
            .with_read(move || Ok(u16::from(mode_ec.read_byte(Register::HPCM)?)))
            .with_write(move |value| mode_bios.set_fan_mode(FanMode::from_byte(value as u8)));

        Self {
            bios: Arc::clone(bios),
            fans: [Fan::new(FanId::Cpu, ec, settings), Fan::new(FanId::Gpu, ec, settings)],
            manual: HardwareComponent::ec(ec, Register::OMCC, DataSize::Byte, Access::ReadWrite)
                .without_zero_debounce(),
            switch: HardwareComponent::ec(ec, Register::SFAN, DataSize::Byte, Access::ReadWrite)
                .without_zero_debounce(),
            mode: HardwareComponent::new("HPCM", Access::ReadWrite, mode_source).without_zero_debounce(),
            countdown: HardwareComponent::ec(ec, Register::XFCD, DataSize::Byte, Access::ReadWrite)
                .without_zero_debounce(),
        }
    }

    pub fn fan(&mut self, id: FanId) -> &mut Fan {
        match id {
            FanId::Cpu => &mut self.fans[0],
            FanId::Gpu => &mut self.fans[1],
        }
    }

    pub fn fans(&mut self) -> &mut [Fan; 2] {
        &mut self.fans
    }

    pub fn levels(&self) -> Result<FanLevels> {
        let (fan1, fan2) = self.bios.fan_level()?;
        Ok(FanLevels::new(fan1, fan2))
    }

    /// Set both levels in one call
    ///
    /// The firmware refuses a (0, 0) pair; stop the fans with
    /// [`FanArray::set_switch`] instead.
    pub fn set_levels(&self, levels: FanLevels) -> Result<()> {
        self.bios.set_fan_level(levels.fan1, levels.fan2)
    }

    pub fn manual(&mut self) -> bool {
        self.manual.read() != u16::from(fan::MANUAL_OFF)
    }

    pub fn set_manual(&mut self, on: bool) -> Result<()> {
        let value = if on { fan::MANUAL_ON } else { fan::MANUAL_OFF };
        self.manual.set_value(u16::from(value))
    }

    /// Whether the fans are switched on
    pub fn switch(&mut self) -> bool {
        self.switch.read() != u16::from(fan::SWITCH_OFF)
    }

    pub fn set_switch(&mut self, on: bool) -> Result<()> {
        let value = if on { fan::SWITCH_ON } else { fan::SWITCH_OFF };
        self.switch.set_value(u16::from(value))
    }

    pub fn mode(&mut self) -> Result<FanMode> {
        Ok(FanMode::from_byte(self.mode.try_read()? as u8))
    }

    /// Set the fan mode, which also re-arms the countdown
    pub fn set_mode(&mut self, mode: FanMode) -> Result<()> {
        self.mode.set_value(u16::from(mode.byte()))
    }

    /// Seconds left before the firmware reverts to automatic control
    pub fn countdown(&mut self) -> Result<u8> {
        Ok(self.countdown.try_read()? as u8)
    }

    pub fn set_countdown(&mut self, seconds: u8) -> Result<()> {
        self.countdown.set_value(u16::from(seconds))
    }

    pub fn max_speed(&self) -> Result<bool> {
        self.bios.max_fan()
    }

    pub fn set_max_speed(&self, on: bool) -> Result<()> {
        self.bios.set_max_fan(on)
    }
}
