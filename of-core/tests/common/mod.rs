/*
 * Simulated hardware shared by the integration tests
 *
 * SimulatedEc honors the port handshake over a 256-byte register file.
 * SimulatedBios decodes call envelopes and answers from the same register
 * file, so BIOS side effects (fan mode, countdown, levels) are visible
 * through EC reads the way they are on real machines.
 */

#![allow(dead_code)]

use std::sync::Arc;

use of_core::bios::{cmd_type, BiosChannel, BiosCmd, BiosTransport, GpuPowerData, OutputSize};
use of_core::constants::ec::{opcode, status};
use of_core::ec::{EcLink, EmbeddedController, NamedLock, Register};
use of_core::settings::{EcSettings, Settings};
use of_core::{Bios, Platform};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Countdown the simulated firmware arms on a fan mode change
pub const FIRMWARE_COUNTDOWN: u8 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    ReadAddress,
    WriteAddress,
    WriteData(u8),
}

/// Machine state behind both simulated channels
#[derive(Debug)]
pub struct Machine {
    pub registers: [u8; 256],
    pub gpu_power: GpuPowerData,
    pub adapter: u8,
    pub bios_temperature: u8,
    pub max_fan: bool,
    /// Every BIOS call as (command, command type, input)
    pub calls: Vec<(u32, u32, Vec<u8>)>,
    phase: Phase,
    output: Option<u8>,
}

impl Machine {
    pub fn calls_of(&self, kind: u32) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter(|(_, t, _)| *t == kind)
            .map(|(_, _, input)| input.clone())
            .collect()
    }

    pub fn reg(&self, register: Register) -> u8 {
        self.registers[usize::from(register.address())]
    }

    pub fn set_reg(&mut self, register: Register, value: u8) {
        self.registers[usize::from(register.address())] = value;
    }
}

pub type SharedMachine = Arc<Mutex<Machine>>;

pub fn machine() -> SharedMachine {
    Arc::new(Mutex::new(Machine {
        registers: [0; 256],
        gpu_power: GpuPowerData { custom_tgp: false, ppab: false, d_state: 1, peak_temperature: 0 },
        adapter: 0x01,
        bios_temperature: 0,
        max_fan: false,
        calls: Vec::new(),
        phase: Phase::Idle,
        output: None,
    }))
}

/// EC answering the handshake over the shared register file
pub struct SimulatedEc {
    machine: SharedMachine,
    command_port: u16,
    data_port: u16,
}

impl SimulatedEc {
    pub fn new(machine: &SharedMachine) -> Self {
        let settings = EcSettings::default();
        Self {
            machine: Arc::clone(machine),
            command_port: settings.command_port,
            data_port: settings.data_port,
        }
    }
}

impl EcLink for SimulatedEc {
    fn read_port(&self, port: u16) -> std::io::Result<u8> {
        let mut m = self.machine.lock();
        if port == self.command_port {
            Ok(if m.output.is_some() { status::OUTPUT_FULL } else { 0 })
        } else if port == self.data_port {
            Ok(m.output.take().unwrap_or(0))
        } else {
            Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown port"))
        }
    }

    fn write_port(&self, port: u16, value: u8) -> std::io::Result<()> {
        let mut guard = self.machine.lock();
        let m = &mut *guard;
        if port == self.command_port {
            m.phase = match value {
                opcode::READ => Phase::ReadAddress,
                opcode::WRITE => Phase::WriteAddress,
                _ => Phase::Idle,
            };
            return Ok(());
        }
        let phase = m.phase;
        m.phase = match phase {
            Phase::ReadAddress => {
                m.output = Some(m.registers[usize::from(value)]);
                Phase::Idle
            }
            Phase::WriteAddress => Phase::WriteData(value),
            Phase::WriteData(address) => {
                m.registers[usize::from(address)] = value;
                Phase::Idle
            }
            Phase::Idle => Phase::Idle,
        };
        Ok(())
    }
}

/// BIOS answering the calls the platform issues
pub struct SimulatedBios {
    machine: SharedMachine,
}

impl SimulatedBios {
    pub fn new(machine: &SharedMachine) -> Self {
        Self { machine: Arc::clone(machine) }
    }

    fn answer(m: &mut Machine, cmd: u32, kind: u32, input: &[u8]) -> (i32, Vec<u8>) {
        if cmd == BiosCmd::Legacy.id() && kind == cmd_type::GPU_MODE {
            return (3, Vec::new());
        }
        if cmd != BiosCmd::Default.id() {
            return (3, Vec::new());
        }
        match kind {
            cmd_type::SET_FAN_MODE => {
                m.set_reg(Register::HPCM, input[1]);
                m.set_reg(Register::XFCD, FIRMWARE_COUNTDOWN);
                (0, Vec::new())
            }
            cmd_type::GET_FAN_LEVEL => (0, vec![m.reg(Register::SRP1), m.reg(Register::SRP2)]),
            cmd_type::SET_FAN_LEVEL => {
                if input[0] == 0 && input[1] == 0 {
                    return (6, Vec::new());
                }
                m.set_reg(Register::SRP1, input[0]);
                m.set_reg(Register::SRP2, input[1]);
                (0, Vec::new())
            }
            cmd_type::GET_GPU_POWER => (0, m.gpu_power.encode().to_vec()),
            cmd_type::SET_GPU_POWER => match GpuPowerData::decode(input) {
                Ok(power) => {
                    m.gpu_power = power;
                    (0, Vec::new())
                }
                Err(_) => (5, Vec::new()),
            },
            cmd_type::GET_ADAPTER => (0, vec![m.adapter]),
            cmd_type::GET_TEMPERATURE => (0, vec![m.bios_temperature]),
            cmd_type::GET_MAX_FAN => (0, vec![u8::from(m.max_fan)]),
            cmd_type::SET_MAX_FAN => {
                m.max_fan = input.first().copied().unwrap_or(0) != 0;
                (0, Vec::new())
            }
            _ => (3, Vec::new()),
        }
    }
}

impl BiosTransport for SimulatedBios {
    fn invoke(&self, _size: OutputSize, input: &[u8]) -> std::io::Result<Vec<u8>> {
        let word = |at: usize| u32::from_le_bytes([input[at], input[at + 1], input[at + 2], input[at + 3]]);
        assert_eq!(&input[..4], b"SECU");
        let (cmd, kind, len) = (word(4), word(8), word(12) as usize);
        let data = &input[16..16 + len];

        let mut guard = self.machine.lock();
        guard.calls.push((cmd, kind, data.to_vec()));
        let (code, output) = Self::answer(&mut guard, cmd, kind, data);

        let mut reply = b"SECU".to_vec();
        reply.extend_from_slice(&code.to_le_bytes());
        reply.extend_from_slice(&output);
        Ok(reply)
    }
}

/// A complete simulated machine wired into a platform
pub struct Rig {
    pub machine: SharedMachine,
    pub ec: Arc<EmbeddedController>,
    pub bios: Arc<Bios>,
    // Holds the lock file
    _dir: TempDir,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_lock_timeout(EcSettings::default().lock_timeout_ms)
    }

    pub fn with_lock_timeout(lock_timeout_ms: u64) -> Self {
        let machine = machine();
        let dir = TempDir::new().unwrap();
        let settings = EcSettings {
            lock_path: dir.path().join("ec.lock"),
            lock_timeout_ms,
            ..EcSettings::default()
        };
        let lock = NamedLock::open(&settings.lock_path);
        let ec = EmbeddedController::new(Box::new(SimulatedEc::new(&machine)), Box::new(lock), &settings);
        let bios = Bios::new(BiosChannel::new(Box::new(SimulatedBios::new(&machine)), true));
        Self {
            machine,
            ec: Arc::new(ec),
            bios: Arc::new(bios),
            _dir: dir,
        }
    }

    /// Lock file shared with other processes using the EC
    pub fn lock_path(&self) -> std::path::PathBuf {
        self._dir.path().join("ec.lock")
    }

    pub fn platform(&self, settings: &Settings) -> Platform {
        Platform::new(Arc::clone(&self.ec), Arc::clone(&self.bios), settings)
    }

    pub fn set_temperatures(&self, cpu: u8, gpu: u8) {
        let mut m = self.machine.lock();
        m.set_reg(Register::CPUT, cpu);
        m.set_reg(Register::GPTM, gpu);
    }
}
