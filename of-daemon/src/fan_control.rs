//! Fan Control Loop
//!
//! Drives the fan program on a fixed interval and reacts to signals.
//!
//! - **Power source**: the alternate program runs on battery, the default
//!   program on AC power
//! - **Sleep hooks**: SIGUSR1 suspends the program, SIGUSR2 resumes it
//! - **Shutdown**: SIGINT/SIGTERM terminate the program, restoring the
//!   firmware fan state

use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use of_core::{FanProgram, ProgramState};

/// Programs the loop switches between
#[derive(Debug, Clone)]
pub struct ProgramSelection {
    pub default: String,
    pub alternate: Option<String>,
}

impl ProgramSelection {
    /// Program for the current power source and whether it is the alternate
    pub fn select(&self, on_ac: bool) -> (&str, bool) {
        match (&self.alternate, on_ac) {
            (Some(alternate), false) => (alternate.as_str(), true),
            _ => (self.default.as_str(), false),
        }
    }
}

/// Run until a termination signal arrives
pub async fn run_control_loop(
    mut program: FanProgram,
    selection: ProgramSelection,
    interval: Duration,
) -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;
    let mut sigusr2 = signal(SignalKind::user_defined2())?;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => tick(&mut program, &selection),
            _ = sigusr1.recv() => {
                info!("SIGNAL: SIGUSR1 - suspending fan program");
                if let Err(e) = program.suspend() {
                    warn!("Suspend incomplete: {}", e);
                }
            }
            _ = sigusr2.recv() => {
                info!("SIGNAL: SIGUSR2 - resuming fan program");
                if let Err(e) = program.resume() {
                    warn!("Resume failed: {}", e);
                }
            }
            _ = sigint.recv() => {
                info!("SIGNAL: Received SIGINT - initiating shutdown");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGNAL: Received SIGTERM - initiating shutdown");
                break;
            }
        }
    }

    program.terminate()?;
    info!("SHUTDOWN: Fan control handed back to firmware");
    Ok(())
}

fn tick(program: &mut FanProgram, selection: &ProgramSelection) {
    if program.state() == ProgramState::Suspended {
        debug!("Fan program suspended, skipping update");
        return;
    }

    let on_ac = match program.platform_mut().system().adapter() {
        Ok(adapter) => adapter.on_ac(),
        Err(e) => {
            debug!("Adapter status unavailable, assuming AC power: {}", e);
            true
        }
    };
    let (name, alternate) = selection.select(on_ac);

    let result = if program.active_name() != Some(name) || program.is_alternate() != alternate {
        if program.state() != ProgramState::Idle {
            info!(
                "Switching to {} program {}",
                if alternate { "alternate" } else { "default" },
                name
            );
        }
        program.run(name, alternate)
    } else {
        program.update()
    };

    if let Err(e) = result {
        warn!("Fan program update failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternate_only_on_battery() {
        let selection = ProgramSelection {
            default: "Balanced".into(),
            alternate: Some("Silent".into()),
        };
        assert_eq!(selection.select(true), ("Balanced", false));
        assert_eq!(selection.select(false), ("Silent", true));
    }

    #[test]
    fn test_default_on_battery_without_alternate() {
        let selection = ProgramSelection {
            default: "Balanced".into(),
            alternate: None,
        };
        assert_eq!(selection.select(false), ("Balanced", false));
    }
}
