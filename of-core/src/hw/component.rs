//! Constrained, trend-tracking hardware values
//!
//! A [`HardwareComponent`] caches the last two accepted readings of one
//! value backed by an EC register or a BIOS call. Readings above the
//! plausibility constraint are dropped, and a zero following a non-zero
//! value is held back once since the EC briefly reports zero on glitches.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ec::{EmbeddedController, Register};
use crate::error::Result;

/// What a component may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Width of the backing value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSize {
    Byte,
    Word,
}

/// Direction of the last accepted change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Ascending,
    Descending,
    Unchanged,
}

/// Where a component reads from and writes to
pub trait ComponentSource: Send + Sync {
    fn read(&self) -> Result<u16>;
    fn write(&self, value: u16) -> Result<()>;
}

/// A byte or word EC register
pub struct EcRegisterSource {
    ec: Arc<EmbeddedController>,
    register: Register,
    size: DataSize,
}

impl EcRegisterSource {
    pub fn new(ec: Arc<EmbeddedController>, register: Register, size: DataSize) -> Self {
        Self { ec, register, size }
    }
}

impl ComponentSource for EcRegisterSource {
    fn read(&self) -> Result<u16> {
        Ok(match self.size {
            DataSize::Byte => u16::from(self.ec.read_byte(self.register)?),
            DataSize::Word => self.ec.read_word(self.register)?,
        })
    }

    fn write(&self, value: u16) -> Result<()> {
        let register = self.register;
        match self.size {
            DataSize::Byte => self.ec.transaction(|p| p.try_write_byte(register, value as u8))??,
            DataSize::Word => self.ec.transaction(|p| p.try_write_word(register, value))??,
        }
        Ok(())
    }
}

type ReadFn = Box<dyn Fn() -> Result<u16> + Send + Sync>;
type WriteFn = Box<dyn Fn(u16) -> Result<()> + Send + Sync>;

/// A value served by closures, typically wrapping BIOS calls
///
/// Missing halves are never called; the component's [`Access`] guards them.
#[derive(Default)]
pub struct FnSource {
    read: Option<ReadFn>,
    write: Option<WriteFn>,
}

impl FnSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read(mut self, read: impl Fn() -> Result<u16> + Send + Sync + 'static) -> Self {
        self.read = Some(Box::new(read));
        self
    }

    pub fn with_write(mut self, write: impl Fn(u16) -> Result<()> + Send + Sync + 'static) -> Self {
        self.write = Some(Box::new(write));
        self
    }
}

impl ComponentSource for FnSource {
    fn read(&self) -> Result<u16> {
        match &self.read {
            Some(read) => read(),
            None => Ok(0),
        }
    }

    fn write(&self, value: u16) -> Result<()> {
        match &self.write {
            Some(write) => write(value),
            None => Ok(()),
        }
    }
}

/// One hardware value with access rights and a plausibility bound
pub struct HardwareComponent {
    name: String,
    access: Access,
    constraint: Option<u16>,
    zero_debounce: bool,
    /// A zero reading was held back; the next zero is accepted
    zero_held: bool,
    source: Box<dyn ComponentSource>,
    value: u16,
    previous: u16,
}

impl HardwareComponent {
    pub fn new(name: impl Into<String>, access: Access, source: impl ComponentSource + 'static) -> Self {
        Self {
            name: name.into(),
            access,
            constraint: None,
            zero_debounce: true,
            zero_held: false,
            source: Box::new(source),
            value: 0,
            previous: 0,
        }
    }

    /// Component over an EC register
    pub fn ec(ec: &Arc<EmbeddedController>, register: Register, size: DataSize, access: Access) -> Self {
        let name = register.name().map_or_else(|| register.to_string(), str::to_string);
        Self::new(name, access, EcRegisterSource::new(Arc::clone(ec), register, size))
    }

    /// Reject readings above `max`
    pub fn with_constraint(mut self, max: u16) -> Self {
        self.constraint = Some(max);
        self
    }

    /// Accept zero readings immediately
    ///
    /// For control registers where zero is an ordinary setting.
    pub fn without_zero_debounce(mut self) -> Self {
        self.zero_debounce = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn constraint(&self) -> Option<u16> {
        self.constraint
    }

    /// Last accepted value
    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn previous(&self) -> u16 {
        self.previous
    }

    /// Read the source and accept the reading if plausible
    ///
    /// Returns whether the cached value changed hands. Source failures are
    /// returned and leave the cache untouched.
    ///
    /// # Panics
    ///
    /// If the component is not readable.
    pub fn refresh(&mut self) -> Result<bool> {
        assert!(self.access.can_read(), "hardware component {} is not readable", self.name);

        let reading = self.source.read()?;

        if let Some(max) = self.constraint {
            if reading > max {
                warn!("Discarding {} reading {} above constraint {}", self.name, reading, max);
                return Ok(false);
            }
        }

        if self.zero_debounce && reading == 0 && self.value != 0 && !self.zero_held {
            debug!("Holding back zero reading of {}", self.name);
            self.zero_held = true;
            return Ok(false);
        }

        self.zero_held = false;
        self.previous = self.value;
        self.value = reading;
        Ok(true)
    }

    /// [`HardwareComponent::refresh`], logging source failures
    pub fn update(&mut self) -> bool {
        self.refresh().unwrap_or_else(|e| {
            warn!("Reading {} failed: {}", self.name, e);
            false
        })
    }

    /// Update and return the value, falling back to the cache on failure
    pub fn read(&mut self) -> u16 {
        self.update();
        self.value
    }

    /// Refresh and return the value, propagating source failures
    pub fn try_read(&mut self) -> Result<u16> {
        self.refresh()?;
        Ok(self.value)
    }

    pub fn trend(&self) -> Trend {
        match self.value.cmp(&self.previous) {
            std::cmp::Ordering::Greater => Trend::Ascending,
            std::cmp::Ordering::Less => Trend::Descending,
            std::cmp::Ordering::Equal => Trend::Unchanged,
        }
    }

    /// Write through to the source, then refresh from it if readable
    ///
    /// A write-only component caches the written value instead.
    ///
    /// # Panics
    ///
    /// If the component is not writable.
    pub fn set_value(&mut self, value: u16) -> Result<()> {
        assert!(self.access.can_write(), "hardware component {} is not writable", self.name);

        self.source.write(value)?;
        if self.access.can_read() {
            self.refresh()?;
        } else {
            self.previous = self.value;
            self.value = value;
        }
        Ok(())
    }
}

impl std::fmt::Debug for HardwareComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareComponent")
            .field("name", &self.name)
            .field("access", &self.access)
            .field("constraint", &self.constraint)
            .field("zero_debounce", &self.zero_debounce)
            .field("zero_held", &self.zero_held)
            .field("value", &self.value)
            .field("previous", &self.previous)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OmenfanError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Source replaying queued readings and recording writes
    #[derive(Clone, Default)]
    struct Scripted {
        readings: Arc<Mutex<VecDeque<Result<u16>>>>,
        writes: Arc<Mutex<Vec<u16>>>,
    }

    impl Scripted {
        fn with_readings(readings: &[u16]) -> Self {
            let source = Self::default();
            source.readings.lock().extend(readings.iter().copied().map(Ok));
            source
        }
    }

    impl ComponentSource for Scripted {
        fn read(&self) -> Result<u16> {
            self.readings.lock().pop_front().unwrap_or(Ok(0))
        }

        fn write(&self, value: u16) -> Result<()> {
            self.writes.lock().push(value);
            self.readings.lock().push_back(Ok(value));
            Ok(())
        }
    }

    #[test]
    fn test_reading_above_constraint_is_discarded() {
        let mut temp = HardwareComponent::new("CPUT", Access::Read, Scripted::with_readings(&[45, 150]))
            .with_constraint(99);

        assert!(temp.update());
        assert!(!temp.update());
        assert_eq!(temp.value(), 45);
        assert_eq!(temp.previous(), 0);
    }

    #[test]
    fn test_single_zero_is_held_back_once() {
        let mut temp = HardwareComponent::new("CPUT", Access::Read, Scripted::with_readings(&[40, 50, 0, 0]));

        assert!(temp.update());
        assert!(temp.update());
        assert!(!temp.update());
        assert_eq!(temp.value(), 50);
        assert!(temp.update());
        assert_eq!(temp.value(), 0);

        let mut temp = HardwareComponent::new("CPUT", Access::Read, Scripted::with_readings(&[40, 0, 0]));
        assert!(temp.update());
        assert!(!temp.update());
        assert_eq!(temp.value(), 40);
        assert!(temp.update());
        assert_eq!(temp.value(), 0);
    }

    #[test]
    fn test_zero_after_recovery_is_held_back_again() {
        let mut temp = HardwareComponent::new("CPUT", Access::Read, Scripted::with_readings(&[40, 0, 0, 45, 0]));
        temp.update();
        temp.update();
        assert!(temp.update());
        assert!(temp.update());
        assert_eq!(temp.value(), 45);
        assert!(!temp.update());
        assert_eq!(temp.value(), 45);
        assert_eq!(temp.trend(), Trend::Ascending);
    }

    #[test]
    fn test_zero_then_recovery_continues_normally() {
        let mut temp = HardwareComponent::new("CPUT", Access::Read, Scripted::with_readings(&[40, 50, 0, 52]));
        temp.update();
        temp.update();
        assert!(!temp.update());
        assert!(temp.update());
        assert_eq!(temp.value(), 52);
    }

    #[test]
    fn test_zero_accepted_without_debounce() {
        let mut switch = HardwareComponent::new("SFAN", Access::ReadWrite, Scripted::with_readings(&[2, 2, 0]))
            .without_zero_debounce();
        switch.update();
        switch.update();
        assert!(switch.update());
        assert_eq!(switch.value(), 0);
    }

    #[test]
    fn test_trend() {
        let mut temp = HardwareComponent::new("GPTM", Access::Read, Scripted::with_readings(&[60, 55, 55]));
        temp.update();
        assert_eq!(temp.trend(), Trend::Ascending);
        temp.update();
        assert_eq!(temp.trend(), Trend::Descending);
        temp.update();
        assert_eq!(temp.trend(), Trend::Unchanged);
    }

    #[test]
    fn test_read_failure_keeps_cache() {
        let source = Scripted::with_readings(&[70]);
        source.readings.lock().push_back(Err(OmenfanError::generic("EC busy")));
        let mut temp = HardwareComponent::new("RTMP", Access::Read, source);

        assert!(temp.update());
        assert!(!temp.update());
        assert_eq!(temp.value(), 70);
    }

    #[test]
    fn test_refresh_propagates_source_failure() {
        let source = Scripted::with_readings(&[0x30]);
        source.readings.lock().push_back(Err(OmenfanError::generic("EC busy")));
        let mut mode = HardwareComponent::new("HPCM", Access::ReadWrite, source).without_zero_debounce();

        assert_eq!(mode.try_read().unwrap(), 0x30);
        assert!(mode.refresh().is_err());
        assert_eq!(mode.value(), 0x30);
    }

    #[test]
    fn test_set_value_reads_back() {
        let source = Scripted::default();
        let mut countdown = HardwareComponent::new("XFCD", Access::ReadWrite, source.clone());

        countdown.set_value(120).unwrap();
        assert_eq!(*source.writes.lock(), vec![120]);
        assert_eq!(countdown.value(), 120);
    }

    #[test]
    fn test_write_only_caches_written_value() {
        let source = Scripted::default();
        let mut rate = HardwareComponent::new("XSS1", Access::Write, source.clone());
        rate.set_value(40).unwrap();
        assert_eq!(rate.value(), 40);
        assert!(source.readings.lock().len() == 1);
    }

    #[test]
    #[should_panic(expected = "not writable")]
    fn test_write_to_read_only_panics() {
        let mut temp = HardwareComponent::new("CPUT", Access::Read, Scripted::default());
        let _ = temp.set_value(1);
    }

    #[test]
    #[should_panic(expected = "not readable")]
    fn test_read_of_write_only_panics() {
        let mut rate = HardwareComponent::new("XSS1", Access::Write, Scripted::default());
        rate.update();
    }

    #[test]
    fn test_fn_source() {
        let source = FnSource::new().with_read(|| Ok(42));
        let mut temp = HardwareComponent::new("BIOS", Access::Read, source);
        assert_eq!(temp.read(), 42);
    }
}
