//! BIOS call transport
//!
//! The transport moves an encoded envelope to the firmware's WMI method for
//! a given output size and hands back the raw response buffer. It knows
//! nothing about commands or status codes.
//!
//! [`AcpiCallTransport`] evaluates the WMI method through the `acpi_call`
//! kernel module: the request is written to `/proc/acpi/call` as
//! `<method> <instance> <method id> b<hex bytes>` and the result read back
//! as a `{0x.., 0x..}` buffer listing.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::bios::command::OutputSize;
use crate::settings::BiosSettings;

/// Firmware call transport
#[cfg_attr(test, mockall::automock)]
pub trait BiosTransport: Send + Sync {
    /// Invoke the method serving `size` with `input`, returning the raw response
    fn invoke(&self, size: OutputSize, input: &[u8]) -> io::Result<Vec<u8>>;
}

/// Transport through the acpi_call kernel interface
pub struct AcpiCallTransport {
    call_path: PathBuf,
    method: String,
}

impl AcpiCallTransport {
    pub fn new(settings: &BiosSettings) -> Self {
        Self {
            call_path: settings.acpi_call_path.clone(),
            method: settings.wmi_method.clone(),
        }
    }

    /// Whether the acpi_call interface is present
    pub fn is_available(&self) -> bool {
        self.call_path.exists()
    }

    fn format_request(&self, size: OutputSize, input: &[u8]) -> String {
        let mut request = format!("{} 0x0 0x{:x} b", self.method, size.method_id());
        for byte in input {
            let _ = write!(request, "{:02x}", byte);
        }
        request
    }
}

/// Parse an acpi_call buffer listing such as `{0x01, 0x02}`
///
/// Anything else (`Error: ...`, `not called`, a bare integer) is a failure.
pub fn parse_buffer(reply: &str) -> io::Result<Vec<u8>> {
    let reply = reply.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    let inner = reply
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("unexpected acpi_call reply '{}'", reply)))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let hex = item.strip_prefix("0x").unwrap_or(item);
            u8::from_str_radix(hex, 16).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("bad byte '{}': {}", item, e))
            })
        })
        .collect()
}

impl BiosTransport for AcpiCallTransport {
    fn invoke(&self, size: OutputSize, input: &[u8]) -> io::Result<Vec<u8>> {
        let request = self.format_request(size, input);
        debug!("acpi_call request for method {} ({} bytes)", size.method_id(), input.len());
        fs::write(&self.call_path, request.as_bytes())?;
        let reply = fs::read_to_string(&self.call_path)?;
        parse_buffer(&reply)
    }
}
