//! Embedded controller command/data handshake
//!
//! Every byte transfer is a short conversation over two ports:
//!
//! 1. Wait for `INPUT_FULL` to clear, write the read or write opcode to the
//!    command port.
//! 2. Wait for `INPUT_FULL` to clear, write the register address to the data
//!    port.
//! 3. Reads wait for `INPUT_FULL` to clear and then for `OUTPUT_FULL` to be
//!    set before reading the data port. Writes wait for `INPUT_FULL` to clear
//!    and write the value.
//!
//! Public calls retry the whole sequence a bounded number of times and never
//! fail: an exhausted read yields the last value obtained (zero if nothing was
//! read). Plausibility checks belong to the component layer.

use std::time::Duration;

use tracing::{trace, warn};

use crate::constants::ec::{opcode, status};
use crate::ec::port::EcLink;
use crate::ec::register::Register;
use crate::error::EcError;
use crate::settings::{EcSettings, ReadWaitFallback};

/// Handshake state for one embedded controller
pub struct EcProtocol {
    link: Box<dyn EcLink>,
    command_port: u16,
    data_port: u16,
    retry_limit: u32,
    wait_limit: u32,
    poll_delay: Duration,
    read_wait_fail_limit: u32,
    read_wait_fallback: ReadWaitFallback,
    /// Consecutive failed output-ready waits, reset by any successful wait
    read_wait_fail_count: u32,
}

impl EcProtocol {
    pub fn new(link: Box<dyn EcLink>, settings: &EcSettings) -> Self {
        Self {
            link,
            command_port: settings.command_port,
            data_port: settings.data_port,
            retry_limit: settings.retry_limit.max(1),
            wait_limit: settings.wait_limit.max(1),
            poll_delay: Duration::from_micros(settings.poll_delay_us),
            read_wait_fail_limit: settings.read_wait_fail_limit,
            read_wait_fallback: settings.read_wait_fallback,
            read_wait_fail_count: 0,
        }
    }

    /// Failed output-ready waits counted so far
    pub fn read_wait_fail_count(&self) -> u32 {
        self.read_wait_fail_count
    }

    /// Whether output-ready waits are currently skipped
    pub fn read_wait_bypassed(&self) -> bool {
        self.read_wait_fallback == ReadWaitFallback::Bypass
            && self.read_wait_fail_count > self.read_wait_fail_limit
    }

    fn status(&self) -> Option<u8> {
        self.link.read_port(self.command_port).ok()
    }

    /// Poll the status port until `ready` holds, pausing between misses
    fn poll(&self, ready: impl Fn(u8) -> bool) -> bool {
        for attempt in 0..self.wait_limit {
            if self.status().is_some_and(&ready) {
                return true;
            }
            if attempt + 1 < self.wait_limit && !self.poll_delay.is_zero() {
                std::thread::sleep(self.poll_delay);
            }
        }
        false
    }

    /// Wait until the controller has consumed the input buffer
    fn wait_write(&self) -> bool {
        self.poll(|s| s & status::INPUT_FULL == 0)
    }

    /// Wait until the controller signals data in the output buffer
    fn wait_read(&mut self) -> bool {
        if self.read_wait_bypassed() {
            return true;
        }
        let ready = self.poll(|s| s & status::OUTPUT_FULL != 0);
        if ready {
            self.read_wait_fail_count = 0;
        } else {
            self.read_wait_fail_count = self.read_wait_fail_count.saturating_add(1);
            if self.read_wait_bypassed() {
                warn!(
                    "EC stopped signaling output ready after {} failed waits, no longer polling for it",
                    self.read_wait_fail_count
                );
            }
        }
        ready
    }

    fn send_command(&self, command: u8) -> bool {
        self.wait_write() && self.link.write_port(self.command_port, command).is_ok()
    }

    fn send_data(&self, data: u8) -> bool {
        self.wait_write() && self.link.write_port(self.data_port, data).is_ok()
    }

    fn read_byte_once(&mut self, register: Register) -> Option<u8> {
        if !self.send_command(opcode::READ) || !self.send_data(register.address()) {
            return None;
        }
        if !self.wait_write() || !self.wait_read() {
            return None;
        }
        self.link.read_port(self.data_port).ok()
    }

    fn write_byte_once(&mut self, register: Register, value: u8) -> bool {
        self.send_command(opcode::WRITE)
            && self.send_data(register.address())
            && self.send_data(value)
    }

    fn read_word_once(&mut self, register: Register) -> Option<u16> {
        let low = self.read_byte_once(register)?;
        let high = self.read_byte_once(register.high())?;
        Some(u16::from_le_bytes([low, high]))
    }

    fn write_word_once(&mut self, register: Register, value: u16) -> bool {
        let [low, high] = value.to_le_bytes();
        self.write_byte_once(register, low) && self.write_byte_once(register.high(), high)
    }

    /// Read a byte, reporting exhaustion as an error
    pub fn try_read_byte(&mut self, register: Register) -> Result<u8, EcError> {
        for _ in 0..self.retry_limit {
            if let Some(value) = self.read_byte_once(register) {
                trace!("EC read {} = 0x{:02X}", register, value);
                return Ok(value);
            }
        }
        Err(EcError::ReadExhausted {
            register: register.address(),
            attempts: self.retry_limit,
        })
    }

    /// Read a word (low byte at `register`), reporting exhaustion as an error
    pub fn try_read_word(&mut self, register: Register) -> Result<u16, EcError> {
        for _ in 0..self.retry_limit {
            if let Some(value) = self.read_word_once(register) {
                trace!("EC read word {} = 0x{:04X}", register, value);
                return Ok(value);
            }
        }
        Err(EcError::ReadExhausted {
            register: register.address(),
            attempts: self.retry_limit,
        })
    }

    /// Write a byte, reporting exhaustion as an error
    pub fn try_write_byte(&mut self, register: Register, value: u8) -> Result<(), EcError> {
        for _ in 0..self.retry_limit {
            if self.write_byte_once(register, value) {
                trace!("EC write {} = 0x{:02X}", register, value);
                return Ok(());
            }
        }
        Err(EcError::WriteExhausted {
            register: register.address(),
            attempts: self.retry_limit,
        })
    }

    /// Write a word (low byte at `register`), reporting exhaustion as an error
    pub fn try_write_word(&mut self, register: Register, value: u16) -> Result<(), EcError> {
        for _ in 0..self.retry_limit {
            if self.write_word_once(register, value) {
                trace!("EC write word {} = 0x{:04X}", register, value);
                return Ok(());
            }
        }
        Err(EcError::WriteExhausted {
            register: register.address(),
            attempts: self.retry_limit,
        })
    }

    /// Read a byte, falling back to zero when every attempt fails
    pub fn read_byte(&mut self, register: Register) -> u8 {
        self.try_read_byte(register).unwrap_or_else(|e| {
            warn!("{}", e);
            0
        })
    }

    /// Read a word, falling back to zero when every attempt fails
    pub fn read_word(&mut self, register: Register) -> u16 {
        self.try_read_word(register).unwrap_or_else(|e| {
            warn!("{}", e);
            0
        })
    }

    /// Write a byte, returning whether any attempt succeeded
    pub fn write_byte(&mut self, register: Register, value: u8) -> bool {
        self.try_write_byte(register, value)
            .map_err(|e| warn!("{}", e))
            .is_ok()
    }

    /// Write a word, returning whether any attempt succeeded
    pub fn write_word(&mut self, register: Register, value: u16) -> bool {
        self.try_write_word(register, value)
            .map_err(|e| warn!("{}", e))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::port::MockEcLink;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn settings() -> EcSettings {
        EcSettings {
            retry_limit: 3,
            wait_limit: 4,
            read_wait_fail_limit: 2,
            ..EcSettings::default()
        }
    }

    /// A link whose controller never accepts input
    fn stuck_input_link() -> MockEcLink {
        let mut link = MockEcLink::new();
        link.expect_read_port()
            .returning(|_| Ok(status::INPUT_FULL));
        link.expect_write_port().returning(|_, _| Ok(()));
        link
    }

    #[test]
    fn test_exhausted_read_returns_zero_instead_of_failing() {
        let mut proto = EcProtocol::new(Box::new(stuck_input_link()), &settings());
        assert_eq!(proto.read_byte(Register::CPUT), 0);
        assert_eq!(proto.read_word(Register::RPM1), 0);
    }

    #[test]
    fn test_try_read_reports_exhaustion() {
        let mut proto = EcProtocol::new(Box::new(stuck_input_link()), &settings());
        assert_eq!(
            proto.try_read_byte(Register::CPUT),
            Err(EcError::ReadExhausted { register: 0x57, attempts: 3 })
        );
    }

    #[test]
    fn test_exhausted_write_reports_false() {
        let mut proto = EcProtocol::new(Box::new(stuck_input_link()), &settings());
        assert!(!proto.write_byte(Register::XSS1, 10));
        assert!(!proto.write_word(Register::RPM1, 1000));
    }

    #[test]
    fn test_io_errors_count_as_failed_polls() {
        let mut link = MockEcLink::new();
        link.expect_read_port()
            .returning(|_| Err(io::Error::new(io::ErrorKind::Other, "port gone")));
        link.expect_write_port().never();
        let mut proto = EcProtocol::new(Box::new(link), &settings());
        assert_eq!(proto.read_byte(Register::CPUT), 0);
    }

    /// Ready for input but never signaling output: reads always hit wait_read
    fn silent_output_link(polls: Arc<AtomicU32>) -> MockEcLink {
        let mut link = MockEcLink::new();
        link.expect_read_port().returning(move |port| {
            if port == crate::constants::ec::COMMAND_PORT {
                polls.fetch_add(1, Ordering::SeqCst);
                Ok(0x00)
            } else {
                Ok(0x2A)
            }
        });
        link.expect_write_port().returning(|_, _| Ok(()));
        link
    }

    #[test]
    fn test_read_wait_bypass_after_fail_limit() {
        let polls = Arc::new(AtomicU32::new(0));
        let mut proto = EcProtocol::new(Box::new(silent_output_link(polls.clone())), &settings());

        // Three attempts each fail the output wait: count goes 1, 2, 3 > limit 2
        assert_eq!(proto.try_read_byte(Register::CPUT).ok(), None);
        assert_eq!(proto.read_wait_fail_count(), 3);
        assert!(proto.read_wait_bypassed());

        // From now on the output wait is skipped and the data port is read
        assert_eq!(proto.read_byte(Register::CPUT), 0x2A);
    }

    #[test]
    fn test_keep_polling_never_bypasses() {
        let polls = Arc::new(AtomicU32::new(0));
        let settings = EcSettings {
            read_wait_fallback: ReadWaitFallback::KeepPolling,
            ..settings()
        };
        let mut proto = EcProtocol::new(Box::new(silent_output_link(polls)), &settings);

        for _ in 0..5 {
            assert_eq!(proto.read_byte(Register::CPUT), 0);
        }
        assert!(proto.read_wait_fail_count() > settings.read_wait_fail_limit);
        assert!(!proto.read_wait_bypassed());
    }

    #[test]
    fn test_polls_pause_between_misses() {
        let polls = Arc::new(AtomicU32::new(0));
        let mut link = MockEcLink::new();
        let counter = polls.clone();
        link.expect_read_port().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(status::INPUT_FULL)
        });
        link.expect_write_port().never();
        let settings = EcSettings {
            retry_limit: 1,
            poll_delay_us: 2000,
            ..settings()
        };
        let mut proto = EcProtocol::new(Box::new(link), &settings);

        let started = std::time::Instant::now();
        assert!(!proto.write_byte(Register::XSS1, 10));
        assert_eq!(polls.load(Ordering::SeqCst), 4);
        assert!(started.elapsed() >= Duration::from_micros(3 * 2000));
    }
}
