//! Fan program definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bios::{FanMode, GpuPowerLevel};
use crate::constants::fan;
use crate::error::{OmenfanError, Result};
use crate::hw::FanLevels;

/// A named temperature to fan level policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanProgramData {
    pub name: String,

    /// Fan mode kept asserted while the program runs
    pub fan_mode: FanMode,

    /// GPU power preset kept asserted while the program runs
    pub gpu_power: GpuPowerLevel,

    /// Temperature threshold [°C] to fan levels
    pub levels: BTreeMap<u8, FanLevels>,
}

impl FanProgramData {
    pub fn new(
        name: impl Into<String>,
        fan_mode: FanMode,
        gpu_power: GpuPowerLevel,
        levels: impl IntoIterator<Item = (u8, FanLevels)>,
    ) -> Self {
        Self {
            name: name.into(),
            fan_mode,
            gpu_power,
            levels: levels.into_iter().collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let field = || format!("programs.{}", self.name);
        if self.name.trim().is_empty() {
            return Err(OmenfanError::invalid_config("programs", "program name is empty"));
        }
        if self.levels.is_empty() {
            return Err(OmenfanError::invalid_config(field(), "no temperature thresholds"));
        }
        if let Some((temp, _)) = self
            .levels
            .iter()
            .find(|(_, l)| l.fan1 == fan::LEVEL_AUTO || l.fan2 == fan::LEVEL_AUTO)
        {
            return Err(OmenfanError::invalid_config(
                field(),
                format!("level at {}°C uses the automatic sentinel", temp),
            ));
        }
        Ok(())
    }

    /// Thresholds in ascending order
    pub fn thresholds(&self) -> Vec<u8> {
        self.levels.keys().copied().collect()
    }
}

/// Index of the threshold governing `temperature`
///
/// The greatest threshold not above `temperature`, or the lowest one when
/// `temperature` is below all of them. `thresholds` must be sorted and
/// non-empty.
pub fn threshold_index(thresholds: &[u8], temperature: u16) -> usize {
    let temperature = u8::try_from(temperature).unwrap_or(u8::MAX);
    match thresholds.binary_search(&temperature) {
        Ok(i) => i,
        Err(i) => i.saturating_sub(1),
    }
}

/// All configured programs, looked up by name
#[derive(Debug, Clone, Default)]
pub struct ProgramCatalog {
    programs: Vec<FanProgramData>,
}

impl ProgramCatalog {
    pub fn new(programs: impl IntoIterator<Item = FanProgramData>) -> Self {
        Self {
            programs: programs.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FanProgramData> {
        self.programs.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
