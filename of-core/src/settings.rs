//! Omenfan Settings
//!
//! JSON configuration stored in /etc/omenfan/config.json. Every field has a
//! default so a partial (or empty) file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::constants::{ec, fan, paths, timing};
use crate::error::{OmenfanError, Result};
use crate::program::{FanProgramData, ProgramCatalog};

/// What to do once output-ready waits keep failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadWaitFallback {
    /// Stop polling for output-ready for the rest of the process lifetime
    #[default]
    Bypass,
    /// Keep polling regardless of how many waits failed
    KeepPolling,
}

/// Embedded controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EcSettings {
    /// Whole-sequence attempts per read or write
    pub retry_limit: u32,

    /// Status polls per wait step
    pub wait_limit: u32,

    /// Pause between unsuccessful status polls, in microseconds
    pub poll_delay_us: u64,

    /// Failed output-ready waits tolerated before the fallback applies
    pub read_wait_fail_limit: u32,

    pub read_wait_fallback: ReadWaitFallback,

    /// Lock acquisition timeout per transaction
    pub lock_timeout_ms: u64,

    /// Machine-wide lock file
    pub lock_path: PathBuf,

    pub command_port: u16,
    pub data_port: u16,
}

impl Default for EcSettings {
    fn default() -> Self {
        Self {
            retry_limit: ec::DEFAULT_RETRY_LIMIT,
            wait_limit: ec::DEFAULT_WAIT_LIMIT,
            poll_delay_us: ec::DEFAULT_POLL_DELAY_US,
            read_wait_fail_limit: ec::DEFAULT_READ_WAIT_FAIL_LIMIT,
            read_wait_fallback: ReadWaitFallback::default(),
            lock_timeout_ms: ec::DEFAULT_LOCK_TIMEOUT_MS,
            lock_path: PathBuf::from(paths::EC_LOCK_FILE),
            command_port: ec::COMMAND_PORT,
            data_port: ec::DATA_PORT,
        }
    }
}

/// BIOS call settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiosSettings {
    /// Raise errors for non-zero status codes on unforced checks
    ///
    /// Some devices return non-zero codes for calls that still work.
    pub check_errors: bool,

    /// acpi_call interface
    pub acpi_call_path: PathBuf,

    /// WMI method evaluated for BIOS calls
    pub wmi_method: String,
}

impl Default for BiosSettings {
    fn default() -> Self {
        Self {
            check_errors: true,
            acpi_call_path: PathBuf::from(paths::ACPI_CALL),
            wmi_method: crate::constants::bios::DEFAULT_WMI_METHOD.to_string(),
        }
    }
}

/// Fan control settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FanSettings {
    /// Highest fan level the hardware supports (hundreds of rpm)
    pub level_max: u8,

    /// Highest believable fan rate in percent
    pub rate_max: u8,

    /// Allowance over `level_max` before a speed reading is rejected
    pub speed_tolerance_pct: u16,

    /// Set the manual flag while a fan program runs
    pub level_needs_manual: bool,

    /// Only re-assert the fan mode when it differs from the target
    ///
    /// Saves EC traffic; unconditional re-assertion also re-arms the
    /// countdown on every update.
    pub mode_check_first: bool,

    /// Re-arm the countdown once it drops below this many seconds
    pub countdown_extend_threshold: u8,

    /// Countdown written when re-arming
    pub countdown_extend_interval: u8,

    /// Fan program update period
    pub update_interval_ms: u64,
}

impl Default for FanSettings {
    fn default() -> Self {
        Self {
            level_max: fan::DEFAULT_LEVEL_MAX,
            rate_max: fan::DEFAULT_RATE_MAX,
            speed_tolerance_pct: fan::DEFAULT_SPEED_TOLERANCE_PCT,
            level_needs_manual: false,
            mode_check_first: true,
            countdown_extend_threshold: fan::DEFAULT_COUNTDOWN_EXTEND_THRESHOLD,
            countdown_extend_interval: fan::DEFAULT_COUNTDOWN_EXTEND_INTERVAL,
            update_interval_ms: timing::DEFAULT_UPDATE_INTERVAL_MS,
        }
    }
}

impl FanSettings {
    /// Highest believable fan speed in rpm
    pub fn speed_constraint(&self) -> u16 {
        let max_rpm = u32::from(self.level_max) * u32::from(fan::LEVEL_UNIT_RPM);
        let limit = max_rpm * (100 + u32::from(self.speed_tolerance_pct)) / 100;
        u16::try_from(limit).unwrap_or(u16::MAX)
    }
}

/// Whether a temperature sensor counts towards the maximum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSetting {
    pub name: String,
    #[serde(rename = "use")]
    pub used: bool,
}

/// Complete configuration surface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ec: EcSettings,
    pub bios: BiosSettings,
    pub fan: FanSettings,

    /// Sensor use overrides; sensors not listed keep their platform default
    pub sensors: Vec<SensorSetting>,

    /// Fan program catalog
    pub programs: Vec<FanProgramData>,

    /// Program run on AC power
    pub default_program: Option<String>,

    /// Program run on battery power
    pub alternate_program: Option<String>,
}

impl Settings {
    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        if self.fan.level_max == 0 || self.fan.level_max == fan::LEVEL_AUTO {
            return Err(OmenfanError::invalid_config(
                "fan.level_max",
                format!("{} is not a usable maximum level", self.fan.level_max),
            ));
        }
        if self.fan.update_interval_ms < timing::MIN_UPDATE_INTERVAL.as_millis() as u64 {
            return Err(OmenfanError::invalid_config(
                "fan.update_interval_ms",
                format!("must be at least {} ms", timing::MIN_UPDATE_INTERVAL.as_millis()),
            ));
        }

        let mut seen = HashSet::new();
        for program in &self.programs {
            if !seen.insert(program.name.as_str()) {
                return Err(OmenfanError::invalid_config(
                    "programs",
                    format!("duplicate program name '{}'", program.name),
                ));
            }
            program.validate()?;
        }

        for (field, name) in [
            ("default_program", &self.default_program),
            ("alternate_program", &self.alternate_program),
        ] {
            if let Some(name) = name {
                if !seen.contains(name.as_str()) {
                    return Err(OmenfanError::invalid_config(
                        field,
                        format!("unknown program '{}'", name),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Build the program catalog from the configured programs
    pub fn catalog(&self) -> ProgramCatalog {
        ProgramCatalog::new(self.programs.iter().cloned())
    }

    /// Configured use flag for a sensor, if any
    pub fn sensor_used(&self, name: &str) -> Option<bool> {
        self.sensors
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.used)
    }
}

/// Load and validate settings from `path`
///
/// A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        info!("No configuration at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    let content = fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;
    settings.validate()?;
    debug!(
        "Loaded {} fan programs from {}",
        settings.programs.len(),
        path.display()
    );
    Ok(settings)
}

/// Write settings to `path` atomically
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    settings.validate()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        OmenfanError::Io(e)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bios::{FanMode, GpuPowerLevel};
    use crate::program::FanLevels;
    use tempfile::TempDir;

    fn program(name: &str) -> FanProgramData {
        FanProgramData::new(
            name,
            FanMode::PERFORMANCE,
            GpuPowerLevel::Maximum,
            [(40, FanLevels::new(10, 10)), (60, FanLevels::new(20, 20))],
        )
    }

    #[test]
    fn test_empty_document_is_valid() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.ec.retry_limit, ec::DEFAULT_RETRY_LIMIT);
        assert_eq!(settings.ec.read_wait_fallback, ReadWaitFallback::Bypass);
        assert!(settings.bios.check_errors);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let json = r#"{ "ec": { "retry_limit": 5, "read_wait_fallback": "keep_polling" },
                        "sensors": [ { "name": "GPTM", "use": false } ] }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.ec.retry_limit, 5);
        assert_eq!(settings.ec.wait_limit, ec::DEFAULT_WAIT_LIMIT);
        assert_eq!(settings.ec.poll_delay_us, ec::DEFAULT_POLL_DELAY_US);
        assert_eq!(settings.ec.read_wait_fallback, ReadWaitFallback::KeepPolling);
        assert_eq!(settings.sensor_used("gptm"), Some(false));
        assert_eq!(settings.sensor_used("CPUT"), None);
    }

    #[test]
    fn test_speed_constraint_includes_tolerance() {
        let fan = FanSettings { level_max: 50, speed_tolerance_pct: 20, ..FanSettings::default() };
        assert_eq!(fan.speed_constraint(), 6000);
    }

    #[test]
    fn test_validate_rejects_unknown_default_program() {
        let settings = Settings {
            programs: vec![program("Quiet")],
            default_program: Some("Loud".into()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(OmenfanError::InvalidConfig { ref field, .. }) if field == "default_program"
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_programs() {
        let settings = Settings {
            programs: vec![program("Quiet"), program("Quiet")],
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("omenfan").join("config.json");
        let settings = Settings {
            programs: vec![program("Quiet")],
            default_program: Some("Quiet".into()),
            ..Settings::default()
        };
        save_settings(&path, &settings).unwrap();

        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.default_program.as_deref(), Some("Quiet"));
        assert_eq!(loaded.programs[0].fan_mode, FanMode::PERFORMANCE);
        assert!(loaded.catalog().get("Quiet").is_some());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(&dir.path().join("absent.json")).unwrap();
        assert!(settings.programs.is_empty());
    }
}
