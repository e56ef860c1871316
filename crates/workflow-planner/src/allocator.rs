//! Commitment of clusters to VMs.

use std::collections::HashMap;

use crate::audit::AuditRecord;
use crate::cost_model::CostModel;
use crate::dag::DAG;
use crate::error::{PlanningError, Result};
use crate::timeline::Schedules;
use crate::vm::Vm;

/// Finish times and VMs of tasks.
///
/// Finish times start as tentative estimates and are replaced by committed values when a task is allocated.
/// VMs are stored as positions in the pool and are set only for allocated tasks.
pub struct Placements {
    finish_times: Vec<f64>,
    vms: Vec<Option<usize>>,
}

impl Placements {
    pub fn new(finish_estimates: Vec<f64>) -> Self {
        let task_count = finish_estimates.len();
        Self {
            finish_times: finish_estimates,
            vms: vec![None; task_count],
        }
    }

    pub fn finish_times(&self) -> &[f64] {
        &self.finish_times
    }

    pub fn finish_time(&self, task: usize) -> f64 {
        self.finish_times[task]
    }

    pub fn vm(&self, task: usize) -> Option<usize> {
        self.vms[task]
    }

    /// Time when all inputs of `task` are available on `vm`.
    ///
    /// Parents listed in `pending` are placed on `vm` but not committed yet, their finish times are taken from there.
    /// Data from a parent on another VM arrives after the parent finishes plus the transfer cost of the edge.
    pub fn ready_time(
        &self,
        task: usize,
        vm: usize,
        pending: &HashMap<usize, f64>,
        dag: &DAG,
        costs: &CostModel,
    ) -> Result<f64> {
        let mut ready_time: f64 = 0.;
        for &parent in dag.parents(task) {
            let parent_ready = if let Some(&finish_time) = pending.get(&parent) {
                finish_time
            } else {
                match self.vms[parent] {
                    Some(parent_vm) if parent_vm == vm => self.finish_times[parent],
                    Some(_) => self.finish_times[parent] + costs.transfer_cost(parent, task),
                    None => {
                        return Err(PlanningError::MalformedGraph(format!(
                            "task {} is placed before its parent {}",
                            dag.get_task(task).name,
                            dag.get_task(parent).name
                        )))
                    }
                }
            };
            ready_time = ready_time.max(parent_ready);
        }
        Ok(ready_time)
    }

    fn commit(&mut self, task: usize, vm: usize, finish_time: f64) {
        self.finish_times[task] = finish_time;
        self.vms[task] = Some(vm);
    }
}

/// Commits every task of `cluster`, in order, to the VM at position `vm`.
///
/// Each task takes the earliest slot after its ready time, its committed finish time replaces the estimate,
/// and one audit record is produced per task.
pub fn allocate(
    cluster: &[usize],
    vm: usize,
    vms: &[Vm],
    dag: &DAG,
    costs: &CostModel,
    schedules: &mut Schedules,
    placements: &mut Placements,
) -> Result<Vec<AuditRecord>> {
    let mut records = Vec::with_capacity(cluster.len());
    for &task in cluster {
        let ready_time = placements.ready_time(task, vm, &HashMap::new(), dag, costs)?;
        let slot = schedules.reserve(task, vm, ready_time, costs);
        placements.commit(task, vm, slot.finish_time);

        let record = AuditRecord {
            task,
            task_name: dag.get_task(task).name.clone(),
            vm: vms[vm].id,
            owner: vms[vm].owner,
            start_time: slot.start_time,
            finish_time: slot.finish_time,
        };
        log::debug!(
            "planning task {} on VM {} (owner {}) at {:.3}-{:.3}",
            record.task_name,
            record.vm,
            record.owner,
            record.start_time,
            record.finish_time
        );
        records.push(record);
    }
    Ok(records)
}
