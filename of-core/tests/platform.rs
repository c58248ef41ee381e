/*
 * Integration tests for the hardware layer
 *
 * Sensors, fans and system queries wired over the simulated machine.
 */

mod common;

use common::Rig;
use of_core::constants::fan;
use of_core::ec::Register;
use of_core::hw::{Access, DataSize, FanId, FanLevels, HardwareComponent};
use of_core::settings::{SensorSetting, Settings};
use of_core::{FanMode, GpuMode};

#[test]
fn test_implausible_temperature_is_discarded() {
    let rig = Rig::new();
    let mut cput = HardwareComponent::ec(&rig.ec, Register::CPUT, DataSize::Byte, Access::Read).with_constraint(99);

    rig.set_temperatures(45, 0);
    assert!(cput.update());
    rig.set_temperatures(150, 0);
    assert!(!cput.update());
    assert_eq!(cput.value(), 45);
}

#[test]
fn test_max_temperature_uses_only_sensors_in_use() {
    let rig = Rig::new();
    let settings = Settings {
        sensors: vec![SensorSetting { name: "GPTM".into(), used: false }],
        ..Settings::default()
    };
    let mut platform = rig.platform(&settings);

    rig.set_temperatures(52, 77);
    rig.machine.lock().set_reg(Register::TMP1, 90);
    assert_eq!(platform.max_temperature(true), 52);

    platform.sensor_mut("GPTM").unwrap().set_used(true);
    assert_eq!(platform.max_temperature(true), 77);
}

#[test]
fn test_max_temperature_without_force_uses_cache() {
    let rig = Rig::new();
    let mut platform = rig.platform(&Settings::default());

    rig.set_temperatures(60, 40);
    assert_eq!(platform.max_temperature(true), 60);
    rig.set_temperatures(70, 40);
    assert_eq!(platform.max_temperature(false), 60);
    assert_eq!(platform.max_temperature(true), 70);
}

#[test]
fn test_fan_speed_spikes_are_rejected() {
    let rig = Rig::new();
    let settings = Settings::default();
    let mut platform = rig.platform(&settings);
    let limit = settings.fan.speed_constraint();

    rig.ec.write_word(Register::RPM1, 3200).unwrap();
    assert_eq!(platform.fans().fan(FanId::Cpu).speed(), 3200);
    rig.ec.write_word(Register::RPM1, limit + 1).unwrap();
    assert_eq!(platform.fans().fan(FanId::Cpu).speed(), 3200);
}

#[test]
fn test_fan_array_controls() {
    let rig = Rig::new();
    let mut platform = rig.platform(&Settings::default());
    let fans = platform.fans();

    fans.set_levels(FanLevels::new(30, 33)).unwrap();
    assert_eq!(fans.levels().unwrap(), FanLevels::new(30, 33));
    assert_eq!(fans.fan(FanId::Gpu).level(), 33);

    fans.set_manual(true).unwrap();
    assert!(fans.manual());
    assert_eq!(rig.machine.lock().reg(Register::OMCC), fan::MANUAL_ON);

    fans.set_switch(false).unwrap();
    assert!(!fans.switch());
    fans.set_switch(true).unwrap();
    assert!(fans.switch());

    fans.set_mode(FanMode::PERFORMANCE).unwrap();
    assert_eq!(fans.mode().unwrap(), FanMode::PERFORMANCE);
    assert_eq!(fans.countdown().unwrap(), common::FIRMWARE_COUNTDOWN);

    fans.set_countdown(0).unwrap();
    assert_eq!(fans.countdown().unwrap(), 0);

    fans.set_max_speed(true).unwrap();
    assert!(fans.max_speed().unwrap());
}

#[test]
fn test_rate_set_reaches_register() {
    let rig = Rig::new();
    let mut platform = rig.platform(&Settings::default());

    platform.fans().fan(FanId::Cpu).set_rate(45).unwrap();
    assert_eq!(rig.machine.lock().reg(Register::XSS1), 45);
}

#[test]
fn test_system_queries() {
    let rig = Rig::new();
    let mut platform = rig.platform(&Settings::default());

    assert_eq!(platform.system().gpu_mode(), GpuMode::Hybrid);
    assert!(platform.system().adapter().unwrap().on_ac());
    rig.machine.lock().adapter = 0x03;
    assert!(!platform.system().adapter().unwrap().on_ac());
    // Not answered by the simulated firmware
    assert!(platform.system().system().is_err());
}
