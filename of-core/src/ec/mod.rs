//! Embedded controller access
//!
//! [`EmbeddedController`] pairs the handshake protocol with the machine-wide
//! lock. Each byte or word call is one locked transaction; sequences that
//! span several calls are not atomic with respect to other processes.

mod lock;
mod port;
mod protocol;
mod register;

pub use lock::{EcLock, NamedLock};
pub use port::{DevPortLink, EcLink};
pub use protocol::EcProtocol;
pub use register::Register;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::EcError;
use crate::settings::EcSettings;

/// Locked access to one embedded controller
pub struct EmbeddedController {
    protocol: Mutex<EcProtocol>,
    lock: Box<dyn EcLock>,
    lock_timeout_ms: u64,
}

impl EmbeddedController {
    pub fn new(link: Box<dyn EcLink>, lock: Box<dyn EcLock>, settings: &EcSettings) -> Self {
        Self {
            protocol: Mutex::new(EcProtocol::new(link, settings)),
            lock,
            lock_timeout_ms: settings.lock_timeout_ms,
        }
    }

    /// Open `/dev/port` and the configured lock file
    pub fn open(settings: &EcSettings) -> std::io::Result<Self> {
        let link = DevPortLink::open()?;
        let lock = NamedLock::open(&settings.lock_path);
        Ok(Self::new(Box::new(link), Box::new(lock), settings))
    }

    /// Run `f` while holding the machine-wide lock
    pub fn transaction<T>(&self, f: impl FnOnce(&mut EcProtocol) -> T) -> Result<T, EcError> {
        if !self.lock.request(self.lock_timeout_ms) {
            warn!("EC lock not acquired within {} ms", self.lock_timeout_ms);
            return Err(EcError::LockTimeout {
                timeout_ms: self.lock_timeout_ms,
            });
        }
        let result = {
            let mut protocol = self.protocol.lock();
            f(&mut protocol)
        };
        self.lock.release();
        Ok(result)
    }

    pub fn read_byte(&self, register: Register) -> Result<u8, EcError> {
        self.transaction(|p| p.read_byte(register))
    }

    pub fn read_word(&self, register: Register) -> Result<u16, EcError> {
        self.transaction(|p| p.read_word(register))
    }

    /// Write a byte; `Ok(false)` when every attempt failed the handshake
    pub fn write_byte(&self, register: Register, value: u8) -> Result<bool, EcError> {
        self.transaction(|p| p.write_byte(register, value))
    }

    /// Write a word; `Ok(false)` when every attempt failed the handshake
    pub fn write_word(&self, register: Register, value: u16) -> Result<bool, EcError> {
        self.transaction(|p| p.write_word(register, value))
    }
}
