//! Hardware abstraction over the embedded controller and BIOS

pub mod component;
pub mod fan;
pub mod platform;
pub mod sensor;
pub mod system;

pub use component::{Access, ComponentSource, DataSize, EcRegisterSource, FnSource, HardwareComponent, Trend};
pub use fan::{Fan, FanArray, FanId, FanLevels};
pub use platform::Platform;
pub use sensor::{TemperatureSensor, BIOS_SENSOR};
pub use system::SystemInfo;
