//! Planning audit log.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dag::DAG;
use crate::error::ConfigError;
use crate::vm::Vm;

/// One committed allocation: the task, its VM and the reserved execution window.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AuditRecord {
    pub task: usize,
    pub task_name: String,
    pub vm: u32,
    pub owner: usize,
    pub start_time: f64,
    pub finish_time: f64,
}

impl std::fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "planned task {} on VM {} for scheduler {} at {:.3}-{:.3}",
            self.task_name, self.vm, self.owner, self.start_time, self.finish_time
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct Task {
    pub name: String,
    pub length: f64,
    pub pes: u32,
    pub parents: Vec<usize>,
    pub children: Vec<usize>,
}

/// Everything needed to inspect a plan offline: the graph, the VM pool and the records in commit order.
#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct AuditLog {
    pub tasks: Vec<Task>,
    pub vms: Vec<Vm>,
    pub records: Vec<AuditRecord>,
}

impl AuditLog {
    pub fn new(dag: &DAG, vms: &[Vm], records: &[AuditRecord]) -> Self {
        Self {
            tasks: dag
                .get_tasks()
                .iter()
                .map(|task| Task {
                    name: task.name.clone(),
                    length: task.length,
                    pes: task.pes,
                    parents: task.parents().to_vec(),
                    children: task.children().to_vec(),
                })
                .collect(),
            vms: vms.to_vec(),
            records: records.to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, filename: P) -> Result<(), ConfigError> {
        File::create(filename)?.write_all(self.to_json()?.as_bytes())?;
        Ok(())
    }
}
