//! Fan program state machine
//!
//! ```text
//!          run            suspend
//!   Idle ───────▶ Running ───────▶ Suspended
//!    ▲              │  ▲   resume      │
//!    │  terminate   │  └───────────────┤
//!    └──────────────┴──────────────────┘
//! ```
//!
//! While running, every [`FanProgram::update`] picks the fan levels for the
//! current maximum temperature, keeps the program's fan mode and GPU power
//! preset asserted and re-arms the firmware countdown before it expires.
//! Suspending and terminating hand the fans back to the firmware and
//! restore the fan mode and GPU power captured when the program started.

mod data;
mod status;

pub use data::{threshold_index, FanProgramData, ProgramCatalog};
pub use status::{Severity, StatusCallback};

pub use crate::hw::FanLevels;

use tracing::{info, warn};

use crate::bios::{FanMode, GpuPowerData};
use crate::error::{OmenfanError, Result};
use crate::hw::Platform;
use crate::settings::FanSettings;
use status::StatusReporter;

/// Externally visible program state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    Idle,
    Running,
    Suspended,
}

/// Hardware state captured before the first program started
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    fan_mode: FanMode,
    gpu_power: Option<GpuPowerData>,
}

#[derive(Debug)]
struct ActiveProgram {
    program: FanProgramData,
    thresholds: Vec<u8>,
    alternate: bool,
    suspended: bool,
    fans_off: bool,
    last_levels: Option<FanLevels>,
    snapshot: Snapshot,
}

impl ActiveProgram {
    fn levels_for(&self, temperature: u16) -> (u8, FanLevels) {
        let threshold = self.thresholds[threshold_index(&self.thresholds, temperature)];
        (threshold, self.program.levels[&threshold])
    }
}

/// Runs at most one fan program at a time over a [`Platform`]
pub struct FanProgram {
    platform: Platform,
    catalog: ProgramCatalog,
    settings: FanSettings,
    status: StatusReporter,
    active: Option<ActiveProgram>,
}

impl FanProgram {
    pub fn new(platform: Platform, catalog: ProgramCatalog, settings: FanSettings) -> Self {
        Self {
            platform,
            catalog,
            settings,
            status: StatusReporter::default(),
            active: None,
        }
    }

    /// Receive status messages from now on
    pub fn set_callback(&mut self, callback: StatusCallback) {
        self.status.set_callback(Some(callback));
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut Platform {
        &mut self.platform
    }

    pub fn catalog(&self) -> &ProgramCatalog {
        &self.catalog
    }

    pub fn state(&self) -> ProgramState {
        match &self.active {
            None => ProgramState::Idle,
            Some(active) if active.suspended => ProgramState::Suspended,
            Some(_) => ProgramState::Running,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.program.name.as_str())
    }

    pub fn is_alternate(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.alternate)
    }

    /// Start `name`, or switch to it if a program is already active
    ///
    /// Switching keeps the snapshot taken by the first program, so
    /// terminating always restores the state from before any program ran.
    pub fn run(&mut self, name: &str, alternate: bool) -> Result<()> {
        let program = self
            .catalog
            .get(name)
            .cloned()
            .ok_or_else(|| OmenfanError::ProgramNotFound(name.to_string()))?;
        program.validate()?;

        // Nothing changes unless the snapshot can be taken
        let (snapshot, fans_off) = match self.active.as_ref().map(|a| (a.snapshot, a.fans_off)) {
            Some(kept) => kept,
            None => (self.take_snapshot()?, false),
        };

        info!("Running fan program {}", program.name);
        self.status.emit(
            Severity::Important,
            &format!(
                "Fan program {} started{}",
                program.name,
                if alternate { " (alternate)" } else { "" }
            ),
        );

        self.active = Some(ActiveProgram {
            thresholds: program.thresholds(),
            program,
            alternate,
            suspended: false,
            fans_off,
            last_levels: None,
            snapshot,
        });
        if self.settings.level_needs_manual {
            self.platform.fans().set_manual(true)?;
        }
        self.update()
    }

    fn take_snapshot(&mut self) -> Result<Snapshot> {
        let fan_mode = self.platform.fans().mode()?;
        let gpu_power = match self.platform.system().gpu_power() {
            Ok(power) => Some(power),
            Err(e) => {
                warn!("GPU power state unavailable, it will not be restored: {}", e);
                None
            }
        };
        Ok(Snapshot { fan_mode, gpu_power })
    }

    /// Apply the program for the current temperature
    ///
    /// Does nothing unless a program is running.
    pub fn update(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|a| !a.suspended) else {
            return Ok(());
        };

        let temperature = self.platform.max_temperature(true);
        let (threshold, levels) = active.levels_for(temperature);
        let fans = self.platform.fans();

        // The firmware refuses a (0, 0) level pair
        if levels.is_off() {
            if !active.fans_off {
                fans.set_switch(false)?;
                active.fans_off = true;
            }
        } else {
            if active.fans_off {
                fans.set_switch(true)?;
                active.fans_off = false;
            }
            fans.set_levels(levels)?;
        }

        let target_mode = active.program.fan_mode;
        let mut countdown_reset = false;
        if !self.settings.mode_check_first || fans.mode()? != target_mode {
            fans.set_mode(target_mode)?;
            countdown_reset = true;
        }

        if !countdown_reset {
            let remaining = fans.countdown()?;
            if remaining < self.settings.countdown_extend_threshold {
                fans.set_countdown(self.settings.countdown_extend_interval)?;
            }
        }

        let target_power = active.program.gpu_power;
        match self.platform.system().gpu_power() {
            Ok(current) if current.level() != target_power => {
                self.platform.system().set_gpu_power(target_power.apply_to(current))?;
            }
            Ok(_) => {}
            Err(e) => warn!("GPU power state unavailable: {}", e),
        }

        let severity = if active.last_levels == Some(levels) {
            Severity::Verbose
        } else {
            Severity::Notice
        };
        active.last_levels = Some(levels);
        self.status.emit(
            severity,
            &format!(
                "{}: {}°C, level {}°C, fans {}",
                active.program.name,
                temperature,
                threshold,
                if levels.is_off() { "off".to_string() } else { levels.to_string() }
            ),
        );
        Ok(())
    }

    /// Hand control back to the firmware, keeping the program enabled
    pub fn suspend(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|a| !a.suspended) else {
            return Ok(());
        };
        active.suspended = true;
        let name = active.program.name.clone();

        let result = self.restore();
        self.status.emit(Severity::Notice, &format!("Fan program {} suspended", name));
        result
    }

    /// Take control again after [`FanProgram::suspend`]
    pub fn resume(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|a| a.suspended) else {
            return Ok(());
        };
        active.suspended = false;
        let name = active.program.name.clone();

        if self.settings.level_needs_manual {
            self.platform.fans().set_manual(true)?;
        }
        self.status.emit(Severity::Notice, &format!("Fan program {} resumed", name));
        self.update()
    }

    /// Stop the active program and restore the pre-program state
    pub fn terminate(&mut self) -> Result<()> {
        let Some(active) = self.active.as_ref() else {
            return Ok(());
        };
        let name = active.program.name.clone();
        let result = if active.suspended { Ok(()) } else { self.restore() };
        self.active = None;

        info!("Fan program {} ended", name);
        self.status.emit(Severity::Important, &format!("Fan program {} ended", name));
        result
    }

    /// Undo the fan and GPU overrides of the active program
    ///
    /// Every step is attempted; the first failure is returned.
    fn restore(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let snapshot = active.snapshot;
        let fans_off = std::mem::take(&mut active.fans_off);
        active.last_levels = None;

        let mut outcome = Ok(());
        let mut record = |result: Result<()>| {
            if let Err(e) = result {
                warn!("Restoring fan state: {}", e);
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        };

        let fans = self.platform.fans();
        if fans_off {
            record(fans.set_switch(true));
        }
        record(fans.set_levels(FanLevels::AUTO));
        if self.settings.level_needs_manual {
            record(fans.set_manual(false));
        }
        record(fans.set_mode(snapshot.fan_mode));
        if let Some(power) = snapshot.gpu_power {
            record(self.platform.system().set_gpu_power(power));
        }
        outcome
    }
}
