//! Unified error handling for Omenfan
//!
//! This crate provides the error types used across all Omenfan components.
//! Embedded controller and BIOS failures keep their own small taxonomies so
//! callers can match on them, and both convert into [`OmenfanError`].

use std::io;

/// Result type alias using OmenfanError
pub type Result<T> = std::result::Result<T, OmenfanError>;

/// Embedded controller access failures
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EcError {
    /// The machine-wide EC lock could not be acquired in time
    #[error("EC lock not acquired within {timeout_ms} ms")]
    LockTimeout { timeout_ms: u64 },

    /// Every read attempt of a register failed the handshake
    #[error("EC read of register 0x{register:02X} failed after {attempts} attempts")]
    ReadExhausted { register: u8, attempts: u32 },

    /// Every write attempt of a register failed the handshake
    #[error("EC write of register 0x{register:02X} failed after {attempts} attempts")]
    WriteExhausted { register: u8, attempts: u32 },
}

/// BIOS call failures, mapped from the integer status of a call
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiosError {
    /// The transport itself failed (client-side status -1)
    #[error("BIOS transport failure")]
    Transport,

    /// Status 3
    #[error("BIOS command not supported")]
    Unsupported,

    /// Status 5
    #[error("BIOS buffer size mismatch")]
    BufferSize,

    /// Any other non-zero status
    #[error("BIOS returned vendor-specific status {code}")]
    Vendor { code: i32 },
}

impl BiosError {
    /// Status code reserved for client-side failures
    pub const TRANSPORT_STATUS: i32 = -1;
    /// Status code for an unsupported command
    pub const UNSUPPORTED_STATUS: i32 = 3;
    /// Status code for a buffer size mismatch
    pub const BUFFER_SIZE_STATUS: i32 = 5;

    /// Map a non-zero status code onto the taxonomy
    ///
    /// Any negative code is a client-side failure.
    pub fn from_status(code: i32) -> Self {
        match code {
            c if c < 0 => Self::Transport,
            Self::UNSUPPORTED_STATUS => Self::Unsupported,
            Self::BUFFER_SIZE_STATUS => Self::BufferSize,
            code => Self::Vendor { code },
        }
    }

    /// Raw status code this error stands for
    pub fn status(&self) -> i32 {
        match self {
            Self::Transport => Self::TRANSPORT_STATUS,
            Self::Unsupported => Self::UNSUPPORTED_STATUS,
            Self::BufferSize => Self::BUFFER_SIZE_STATUS,
            Self::Vendor { code } => *code,
        }
    }
}

/// Unified error type for all Omenfan operations
#[derive(thiserror::Error, Debug)]
pub enum OmenfanError {
    // ============================================================================
    // I/O and Configuration Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Hardware Access Errors
    // ============================================================================
    #[error("Embedded controller error: {0}")]
    Ec(#[from] EcError),

    #[error("BIOS error: {0}")]
    Bios(#[from] BiosError),

    #[error("Invalid {what} data: {reason}")]
    InvalidData {
        what: &'static str,
        reason: String,
    },

    // ============================================================================
    // Fan Program Errors
    // ============================================================================
    #[error("Fan program not found: {0}")]
    ProgramNotFound(String),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Generic(String),
}

impl OmenfanError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid configuration value error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid data error for a decoded structure
    pub fn invalid_data(what: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            what,
            reason: reason.into(),
        }
    }
}

impl From<String> for OmenfanError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

impl From<&str> for OmenfanError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_distinguishes_codes() {
        assert_eq!(BiosError::from_status(3), BiosError::Unsupported);
        assert_eq!(BiosError::from_status(5), BiosError::BufferSize);
        assert_eq!(BiosError::from_status(-1), BiosError::Transport);
        assert_eq!(BiosError::from_status(-7), BiosError::Transport);
        assert_eq!(BiosError::from_status(4), BiosError::Vendor { code: 4 });
    }

    #[test]
    fn test_vendor_code_is_kept_for_diagnostics() {
        let err = BiosError::from_status(0x1234);
        assert_eq!(err.status(), 0x1234);
        assert!(err.to_string().contains("4660"));
    }

    #[test]
    fn test_conversion_into_unified_error() {
        let err: OmenfanError = EcError::LockTimeout { timeout_ms: 200 }.into();
        assert!(matches!(err, OmenfanError::Ec(EcError::LockTimeout { timeout_ms: 200 })));

        let err: OmenfanError = BiosError::Unsupported.into();
        assert!(err.to_string().contains("not supported"));
    }
}
