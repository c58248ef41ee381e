//! Temperature sensors

use std::sync::Arc;

use crate::bios::Bios;
use crate::constants::temperature;
use crate::ec::{EmbeddedController, Register};
use crate::hw::component::{Access, DataSize, FnSource, HardwareComponent};

/// Name of the firmware-reported sensor
pub const BIOS_SENSOR: &str = "BIOS";

/// A named temperature reading that may or may not count towards the maximum
#[derive(Debug)]
pub struct TemperatureSensor {
    used: bool,
    component: HardwareComponent,
}

impl TemperatureSensor {
    pub fn new(component: HardwareComponent, used: bool) -> Self {
        Self {
            used,
            component: component.with_constraint(temperature::CONSTRAINT),
        }
    }

    /// Sensor over an EC temperature register
    pub fn ec(ec: &Arc<EmbeddedController>, register: Register, used: bool) -> Self {
        Self::new(HardwareComponent::ec(ec, register, DataSize::Byte, Access::Read), used)
    }

    /// Sensor over the BIOS temperature call
    pub fn bios(bios: &Arc<Bios>, used: bool) -> Self {
        let bios = Arc::clone(bios);
        let source = FnSource::new().with_read(move || Ok(u16::from(bios.temperature()?)));
        Self::new(HardwareComponent::new(BIOS_SENSOR, Access::Read, source), used)
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn set_used(&mut self, used: bool) {
        self.used = used;
    }

    pub fn update(&mut self) -> bool {
        self.component.update()
    }

    /// Last accepted reading [°C]
    pub fn value(&self) -> u16 {
        self.component.value()
    }

    pub fn component(&self) -> &HardwareComponent {
        &self.component
    }
}
