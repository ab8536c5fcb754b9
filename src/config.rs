//! Bench configuration.
//!
//! Everything a characterisation run needs to know up front, loaded once
//! from JSON and never mutated. Timings and serial settings are carried for
//! the code that drives the bench; the codec itself only needs the thruster
//! id, the control mode and the fault-bit policy.

use crate::command::{ControlMode, Direction, ThrusterCommand, ThrusterId, MAX_RPM};
use crate::error::{CodecError, Result};
use crate::packet::{CommandPacket, PacketEncoder};
use crate::reply::{FaultBitPolicy, ReplyDecoder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

const DEFAULT_SUPPLY_VOLTAGE: f64 = 320.0;
const DEFAULT_RPM_SWEEP: [u16; 9] = [500, 800, 1000, 1200, 1400, 1600, 1800, 2000, 2200];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhaseTiming {
    pub reverse_ms: u64,
    /// Pause with the thruster stopped between reversing and running forward.
    pub wait_ms: u64,
    pub run_ms: u64,
    pub acquisition_ms: u64,
    pub settle_ms: u64,
}

impl Default for PhaseTiming {
    fn default() -> Self {
        Self {
            reverse_ms: 3_000,
            wait_ms: 800,
            run_ms: 4_000,
            acquisition_ms: 3_000,
            settle_ms: 270_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialSettings {
    pub thruster_port: String,
    pub thruster_baud: u32,
    pub load_cell_port: String,
    pub load_cell_baud: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            thruster_port: "/dev/ttyUSB0".into(),
            thruster_baud: 57_600,
            load_cell_port: "/dev/ttyUSB1".into(),
            load_cell_baud: 9_600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub thruster_id: ThrusterId,
    pub direction: Direction,
    pub mode: ControlMode,
    pub fault_policy: FaultBitPolicy,
    pub supply_voltage: f64,
    pub rpm_sweep: Vec<u16>,
    pub timing: PhaseTiming,
    pub serial: SerialSettings,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            thruster_id: ThrusterId::default(),
            direction: Direction::Forward,
            mode: ControlMode::ClosedLoop,
            fault_policy: FaultBitPolicy::default(),
            supply_voltage: DEFAULT_SUPPLY_VOLTAGE,
            rpm_sweep: DEFAULT_RPM_SWEEP.to_vec(),
            timing: PhaseTiming::default(),
            serial: SerialSettings::default(),
        }
    }
}

impl BenchConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CodecError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CodecError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&json)?;
        info!(path = %path.display(), thruster = %config.thruster_id, "loaded bench configuration");
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CodecError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpm_sweep.is_empty() {
            return Err(CodecError::Config("rpm sweep is empty".into()));
        }
        if !self.supply_voltage.is_finite() || self.supply_voltage <= 0.0 {
            return Err(CodecError::Config(format!(
                "supply voltage must be positive, got {}",
                self.supply_voltage
            )));
        }
        if self.timing.acquisition_ms > self.timing.run_ms {
            return Err(CodecError::Config(format!(
                "acquisition window {} ms is longer than the {} ms run",
                self.timing.acquisition_ms, self.timing.run_ms
            )));
        }
        for rpm in self.rpm_sweep.iter().filter(|rpm| **rpm > MAX_RPM) {
            warn!(rpm, cap = MAX_RPM, "sweep step will be clamped");
        }
        Ok(())
    }

    pub fn encoder(&self) -> PacketEncoder {
        PacketEncoder::for_thruster(self.thruster_id)
    }

    pub fn decoder(&self) -> ReplyDecoder {
        ReplyDecoder::with_policy(self.fault_policy)
    }

    /// One command per sweep step, in sweep order.
    pub fn sweep_commands(&self) -> Vec<ThrusterCommand> {
        self.rpm_sweep
            .iter()
            .map(|rpm| ThrusterCommand::new(*rpm, self.direction, self.mode))
            .collect()
    }

    pub fn sweep_packets(&self) -> Vec<CommandPacket> {
        let encoder = self.encoder();
        self.sweep_commands()
            .iter()
            .map(|command| encoder.encode_command(command))
            .collect()
    }
}
