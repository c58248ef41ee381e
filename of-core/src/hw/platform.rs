//! Default platform wiring
//!
//! Composes the fans, the system queries and the temperature sensors over
//! one embedded controller and one BIOS.

use std::sync::Arc;

use tracing::debug;

use crate::bios::Bios;
use crate::ec::{EmbeddedController, Register};
use crate::hw::fan::FanArray;
use crate::hw::sensor::{TemperatureSensor, BIOS_SENSOR};
use crate::hw::system::SystemInfo;
use crate::settings::Settings;

/// EC temperature registers and whether they count by default
const EC_SENSORS: &[(Register, bool)] = &[
    (Register::CPUT, true),
    (Register::GPTM, true),
    (Register::RTMP, true),
    (Register::TMP1, false),
];

pub struct Platform {
    ec: Arc<EmbeddedController>,
    bios: Arc<Bios>,
    fans: FanArray,
    system: SystemInfo,
    sensors: Vec<TemperatureSensor>,
}

impl Platform {
    pub fn new(ec: Arc<EmbeddedController>, bios: Arc<Bios>, settings: &Settings) -> Self {
        let mut sensors: Vec<TemperatureSensor> = EC_SENSORS
            .iter()
            .map(|&(register, used)| TemperatureSensor::ec(&ec, register, used))
            .collect();
        sensors.push(TemperatureSensor::bios(&bios, false));

        for sensor in &mut sensors {
            if let Some(used) = settings.sensor_used(sensor.name()) {
                sensor.set_used(used);
            }
        }
        debug!(
            "Temperature sensors in use: {:?}",
            sensors.iter().filter(|s| s.is_used()).map(TemperatureSensor::name).collect::<Vec<_>>()
        );

        Self {
            fans: FanArray::new(&ec, &bios, &settings.fan),
            system: SystemInfo::new(&bios),
            sensors,
            ec,
            bios,
        }
    }

    pub fn ec(&self) -> &Arc<EmbeddedController> {
        &self.ec
    }

    pub fn bios(&self) -> &Arc<Bios> {
        &self.bios
    }

    pub fn fans(&mut self) -> &mut FanArray {
        &mut self.fans
    }

    pub fn system(&mut self) -> &mut SystemInfo {
        &mut self.system
    }

    pub fn sensors(&self) -> &[TemperatureSensor] {
        &self.sensors
    }

    pub fn sensor_mut(&mut self, name: &str) -> Option<&mut TemperatureSensor> {
        self.sensors.iter_mut().find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Read every sensor in use
    pub fn update_sensors(&mut self) {
        for sensor in self.sensors.iter_mut().filter(|s| s.is_used()) {
            sensor.update();
        }
    }

    /// Highest reading among the sensors in use [°C]
    ///
    /// With `force` the sensors are read first; otherwise the cached
    /// readings are compared.
    pub fn max_temperature(&mut self, force: bool) -> u16 {
        if force {
            self.update_sensors();
        }
        self.sensors
            .iter()
            .filter(|s| s.is_used())
            .map(TemperatureSensor::value)
            .max()
            .unwrap_or(0)
    }
}

