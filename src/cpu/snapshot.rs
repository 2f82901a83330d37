//! Whole-machine snapshots.
//!
//! A snapshot captures everything needed to rebuild an [`Rpu`]: registers,
//! execution state, cycle count, and the full memory contents. Snapshots
//! serialize to JSON for the CLI's `--snapshot` option and the wasm bindings.

use crate::cpu::{Bit, Instruction, Memory, Registers, Rpu, RpuState};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Serializable machine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpuSnapshot {
    pub ip: usize,
    pub accumulator: Bit,
    pub state: RpuState,
    pub cycles: u64,
    /// Last executed instruction, if any.
    #[serde(default)]
    pub last_instruction: Option<Instruction>,
    pub memory: Vec<u8>,
}

impl RpuSnapshot {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Json(e.to_string()))
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|e| SnapshotError::Json(e.to_string()))
    }
}

impl Rpu {
    /// Capture the current machine state.
    pub fn snapshot(&self) -> RpuSnapshot {
        RpuSnapshot {
            ip: self.regs.ip,
            accumulator: self.regs.acc,
            state: self.state,
            cycles: self.cycles,
            last_instruction: self.last_instruction(),
            memory: self.mem.as_bytes().to_vec(),
        }
    }

    /// Rebuild a machine from a snapshot.
    ///
    /// Memory capacity is taken from the snapshot's memory length.
    pub fn from_snapshot(snapshot: &RpuSnapshot) -> Result<Self, SnapshotError> {
        let capacity = snapshot.memory.len();
        if capacity == 0 {
            return Err(SnapshotError::EmptyMemory);
        }
        if snapshot.ip > capacity {
            return Err(SnapshotError::IpOutOfRange { ip: snapshot.ip, capacity });
        }

        let regs = Registers { ip: snapshot.ip, acc: snapshot.accumulator };
        let mut rpu = Rpu::from_parts(regs, Memory::with_capacity(capacity, &snapshot.memory));
        rpu.state = snapshot.state;
        rpu.cycles = snapshot.cycles;
        rpu.last_instr = snapshot.last_instruction;
        Ok(rpu)
    }
}

/// Errors that can occur when saving or restoring snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot JSON error: {0}")]
    Json(String),

    #[error("snapshot has no memory")]
    EmptyMemory,

    #[error("snapshot IP {ip:#x} beyond memory capacity {capacity:#x}")]
    IpOutOfRange { ip: usize, capacity: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_restores_state() {
        // LOAD 0x13 reads bit 3 of byte 2, outside the instruction word
        let mut rpu = Rpu::with_capacity(16, &[0x00, 0x13]);
        rpu.mem.write_byte(2, 0x08).unwrap();
        rpu.step().unwrap();
        assert_eq!(rpu.current_accumulator(), Bit::One);

        let restored = Rpu::from_snapshot(&rpu.snapshot()).unwrap();

        assert_eq!(restored.snapshot(), rpu.snapshot());
        assert_eq!(restored.mem.capacity(), 16);
        assert_eq!(restored.current_ip(), 2);
        assert_eq!(restored.current_accumulator(), Bit::One);
        assert_eq!(restored.last_instruction(), Some(Instruction::load(0x13).unwrap()));
    }

    #[test]
    fn test_snapshot_without_last_instruction_field() {
        let json = r#"{"ip":0,"accumulator":"One","state":"Running","cycles":0,"memory":[0,0]}"#;
        let rpu = Rpu::from_snapshot(&RpuSnapshot::from_json(json).unwrap()).unwrap();

        assert_eq!(rpu.last_instruction(), None);
        assert_eq!(rpu.current_accumulator(), Bit::One);
    }

    #[test]
    fn test_snapshot_json() {
        let rpu = Rpu::with_capacity(4, &[0x80, 0x01]);
        let json = rpu.snapshot().to_json().unwrap();

        assert!(json.contains("\"accumulator\": \"Zero\""));
        assert_eq!(RpuSnapshot::from_json(&json).unwrap(), rpu.snapshot());
    }

    #[test]
    fn test_snapshot_validation() {
        let mut snapshot = Rpu::with_capacity(4, &[]).snapshot();
        snapshot.ip = 5;
        assert!(matches!(
            Rpu::from_snapshot(&snapshot),
            Err(SnapshotError::IpOutOfRange { ip: 5, capacity: 4 })
        ));

        snapshot.memory.clear();
        assert_eq!(Rpu::from_snapshot(&snapshot).unwrap_err(), SnapshotError::EmptyMemory);

        assert!(matches!(RpuSnapshot::from_json("{"), Err(SnapshotError::Json(_))));
    }
}
