//! Constants and configuration defaults for Omenfan
//!
//! Centralizes port addresses, protocol opcodes, buffer sizes and the
//! defaults behind every configurable value. Add new magic numbers here.

use std::time::Duration;

/// System paths
pub mod paths {
    /// Configuration directory
    pub const CONFIG_DIR: &str = "/etc/omenfan";

    /// Configuration file inside [`CONFIG_DIR`]
    pub const CONFIG_FILE: &str = "config.json";

    /// Machine-wide EC lock file, shared by every process touching the EC
    pub const EC_LOCK_FILE: &str = "/run/lock/omenfan-ec.lock";

    /// Linux raw I/O port device
    pub const DEV_PORT: &str = "/dev/port";

    /// acpi_call kernel module interface
    pub const ACPI_CALL: &str = "/proc/acpi/call";

    /// Default configuration file path
    pub fn config_file() -> std::path::PathBuf {
        std::path::Path::new(CONFIG_DIR).join(CONFIG_FILE)
    }
}

/// Embedded controller protocol
pub mod ec {
    /// Command and status port
    pub const COMMAND_PORT: u16 = 0x66;

    /// Data port
    pub const DATA_PORT: u16 = 0x62;

    /// Status bits read from the command port
    pub mod status {
        /// Data is waiting in the output buffer
        pub const OUTPUT_FULL: u8 = 0x01;
        /// The controller has not consumed the input buffer yet
        pub const INPUT_FULL: u8 = 0x02;
    }

    /// Command opcodes
    pub mod opcode {
        pub const READ: u8 = 0x80;
        pub const WRITE: u8 = 0x81;
    }

    /// Whole-sequence attempts per public read or write
    pub const DEFAULT_RETRY_LIMIT: u32 = 3;

    /// Status polls per wait step
    pub const DEFAULT_WAIT_LIMIT: u32 = 30;

    /// Pause between unsuccessful status polls, in microseconds
    pub const DEFAULT_POLL_DELAY_US: u64 = 10;

    /// Failed output-ready waits tolerated before the fallback kicks in
    pub const DEFAULT_READ_WAIT_FAIL_LIMIT: u32 = 15;

    /// Lock acquisition timeout for one transaction
    pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 200;

    /// Pause between lock acquisition attempts
    pub const LOCK_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(1);
}

/// BIOS call envelope
pub mod bios {
    /// Envelope signature ("SECU")
    pub const SIGNATURE: [u8; 4] = *b"SECU";

    /// Envelope header: signature, command, command type, data size
    pub const HEADER_LEN: usize = 16;

    /// Response header: signature echo and return code
    pub const RESPONSE_HEADER_LEN: usize = 8;

    /// WMI method path evaluated through acpi_call
    pub const DEFAULT_WMI_METHOD: &str = "\\_SB.WMID.WMAA";
}

/// Fan control bounds and defaults
pub mod fan {
    /// Fan level unit in rpm (levels are reported in hundreds of rpm)
    pub const LEVEL_UNIT_RPM: u16 = 100;

    /// Highest believable fan level when nothing is configured
    pub const DEFAULT_LEVEL_MAX: u8 = 55;

    /// Highest believable fan rate in percent
    pub const DEFAULT_RATE_MAX: u8 = 100;

    /// Allowance over the maximum level before a speed reading is rejected
    pub const DEFAULT_SPEED_TOLERANCE_PCT: u16 = 20;

    /// Level sentinel handing a fan back to automatic control
    pub const LEVEL_AUTO: u8 = 0xFF;

    /// Manual mode register values
    pub const MANUAL_ON: u8 = 0x06;
    pub const MANUAL_OFF: u8 = 0x00;

    /// Fan switch register values
    pub const SWITCH_ON: u8 = 0x00;
    pub const SWITCH_OFF: u8 = 0x02;

    /// Countdown below which the fan program re-arms it (seconds)
    pub const DEFAULT_COUNTDOWN_EXTEND_THRESHOLD: u8 = 30;

    /// Countdown value written when re-arming (seconds)
    pub const DEFAULT_COUNTDOWN_EXTEND_INTERVAL: u8 = 120;
}

/// Temperature bounds
pub mod temperature {
    /// Highest believable sensor reading in °C
    pub const CONSTRAINT: u16 = 99;
}

/// Timing values
pub mod timing {
    use super::Duration;

    /// Default fan program update interval
    pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 3000;

    /// Shortest accepted update interval
    pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(500);
}
