//! Omenfan Core Library
//!
//! Thermal and fan control for laptops whose fans are driven through an
//! embedded controller and a vendor BIOS interface.
//!
//! # Module Structure
//!
//! - `ec/` - Embedded controller port handshake and machine-wide lock
//! - `bios/` - BIOS call envelope, status codes and binary codecs
//! - `hw/` - Hardware components, fans, sensors and platform wiring
//! - `program/` - Fan program definitions and state machine
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use of_core::{load_settings, Bios, EmbeddedController, FanProgram, Platform};
//!
//! let settings = load_settings(&of_core::constants::paths::config_file()).unwrap();
//! let ec = Arc::new(EmbeddedController::open(&settings.ec).unwrap());
//! let bios = Arc::new(Bios::open(&settings.bios));
//! let platform = Platform::new(ec, bios, &settings);
//!
//! let mut program = FanProgram::new(platform, settings.catalog(), settings.fan.clone());
//! program.run("Balanced", false).unwrap();
//! ```

pub mod bios;
pub mod constants;
pub mod ec;
pub mod error;
pub mod hw;
pub mod program;
pub mod settings;

pub use bios::{Bios, BiosChannel, FanMode, GpuMode, GpuPowerLevel};
pub use ec::{EmbeddedController, Register};
pub use error::{BiosError, EcError, OmenfanError, Result};
pub use hw::{FanLevels, Platform};
pub use program::{FanProgram, FanProgramData, ProgramCatalog, ProgramState, Severity};
pub use settings::{load_settings, save_settings, Settings};
