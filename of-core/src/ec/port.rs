//! Raw I/O port access
//!
//! The embedded controller is reachable only through two I/O ports. The
//! host environment supplies byte-wide port reads and writes through
//! [`EcLink`]; on Linux [`DevPortLink`] provides them over `/dev/port`.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use tracing::debug;

/// Byte-wide port access supplied by the host
#[cfg_attr(test, mockall::automock)]
pub trait EcLink: Send {
    /// Read one byte from `port`
    fn read_port(&self, port: u16) -> io::Result<u8>;

    /// Write one byte to `port`
    fn write_port(&self, port: u16, value: u8) -> io::Result<()>;
}

/// Port access through the `/dev/port` character device
///
/// The file offset is the port number. Requires root (CAP_SYS_RAWIO).
pub struct DevPortLink {
    file: File,
}

impl DevPortLink {
    /// Open the default `/dev/port` device
    pub fn open() -> io::Result<Self> {
        Self::open_path(Path::new(crate::constants::paths::DEV_PORT))
    }

    /// Open a port device at a custom path
    pub fn open_path(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!("Opened port device {}", path.display());
        Ok(Self { file })
    }
}

impl EcLink for DevPortLink {
    fn read_port(&self, port: u16) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.file.read_exact_at(&mut buf, u64::from(port))?;
        Ok(buf[0])
    }

    fn write_port(&self, port: u16, value: u8) -> io::Result<()> {
        self.file.write_all_at(&[value], u64::from(port))
    }
}
