//! BIOS call envelope and status checking
//!
//! Request layout (little-endian):
//!
//! | offset | size | field          |
//! |--------|------|----------------|
//! | 0      | 4    | signature SECU |
//! | 4      | 4    | command id     |
//! | 8      | 4    | command type   |
//! | 12     | 4    | data size      |
//! | 16     | n    | data           |
//!
//! Response layout: 4 bytes echoed signature, 4 bytes return code, then the
//! output buffer of the requested size.

use tracing::{debug, warn};

use crate::bios::command::{BiosCmd, OutputSize};
use crate::bios::transport::BiosTransport;
use crate::constants::bios::{HEADER_LEN, RESPONSE_HEADER_LEN, SIGNATURE};
use crate::error::BiosError;

/// Raw outcome of one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiosResponse {
    /// Return code; negative for client-side failures
    pub status: i32,
    /// Output buffer, exactly the requested size on success
    pub data: Vec<u8>,
}

impl BiosResponse {
    fn transport_failure() -> Self {
        Self {
            status: BiosError::TRANSPORT_STATUS,
            data: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Encode a request envelope
pub fn encode_envelope(cmd: BiosCmd, cmd_type: u32, input: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + input.len());
    buf.extend_from_slice(&SIGNATURE);
    buf.extend_from_slice(&cmd.id().to_le_bytes());
    buf.extend_from_slice(&cmd_type.to_le_bytes());
    buf.extend_from_slice(&(input.len() as u32).to_le_bytes());
    buf.extend_from_slice(input);
    buf
}

/// Decode a raw response, fitting the data to `size`
pub fn decode_response(raw: &[u8], size: OutputSize) -> BiosResponse {
    if raw.len() < RESPONSE_HEADER_LEN {
        return BiosResponse::transport_failure();
    }
    let status = i32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
    let mut data = raw[RESPONSE_HEADER_LEN..].to_vec();
    data.resize(size.len(), 0);
    BiosResponse { status, data }
}

/// Dispatches BIOS calls over a transport
pub struct BiosChannel {
    transport: Box<dyn BiosTransport>,
    check_errors: bool,
}

impl BiosChannel {
    pub fn new(transport: Box<dyn BiosTransport>, check_errors: bool) -> Self {
        Self {
            transport,
            check_errors,
        }
    }

    /// Send a call with input data, requesting `size` bytes of output
    pub fn send(&self, cmd: BiosCmd, cmd_type: u32, input: &[u8], size: OutputSize) -> BiosResponse {
        let envelope = encode_envelope(cmd, cmd_type, input);
        match self.transport.invoke(size, &envelope) {
            Ok(raw) => {
                let response = decode_response(&raw, size);
                debug!(
                    "BIOS call 0x{:X}/0x{:02X} returned status {}",
                    cmd.id(),
                    cmd_type,
                    response.status
                );
                response
            }
            Err(e) => {
                warn!("BIOS call 0x{:X}/0x{:02X} failed: {}", cmd.id(), cmd_type, e);
                BiosResponse::transport_failure()
            }
        }
    }

    /// Send a call without input data and without output
    pub fn send_no_input(&self, cmd: BiosCmd, cmd_type: u32) -> BiosResponse {
        self.send(cmd, cmd_type, &[], OutputSize::Zero)
    }

    /// Map a status code to an outcome
    ///
    /// Transport failures always fail. Other non-zero codes fail unless
    /// checking is disabled by configuration and `force` is not set.
    pub fn check(&self, status: i32, force: bool) -> Result<(), BiosError> {
        if status == 0 {
            return Ok(());
        }
        let err = BiosError::from_status(status);
        if err != BiosError::Transport && !force && !self.check_errors {
            debug!("Ignoring BIOS status {} (checking disabled)", status);
            return Ok(());
        }
        Err(err)
    }

    /// Send and check in one step, returning the output buffer
    pub fn call(&self, cmd: BiosCmd, cmd_type: u32, input: &[u8], size: OutputSize) -> Result<Vec<u8>, BiosError> {
        let response = self.send(cmd, cmd_type, input, size);
        self.check(response.status, false)?;
        Ok(response.data)
    }
}
