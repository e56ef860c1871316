//! Choice of the VM for a cluster.

use std::collections::HashMap;

use crate::allocator::Placements;
use crate::cost_model::CostModel;
use crate::dag::DAG;
use crate::error::{PlanningError, Result};
use crate::timeline::Schedules;
use crate::vm::Vm;

/// VM picked for a cluster, as a position in the pool, with the finish time of the last cluster task on it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VmChoice {
    pub vm: usize,
    pub finish_time: f64,
}

/// Finish time of the whole cluster if it were placed on `vm`, `None` if some task can't run there.
///
/// The cluster is tried on a copy of the VM timeline, so the committed schedule stays untouched.
pub fn evaluate_cluster(
    cluster: &[usize],
    vm: usize,
    dag: &DAG,
    costs: &CostModel,
    schedules: &Schedules,
    placements: &Placements,
) -> Result<Option<f64>> {
    if cluster.iter().any(|&task| !costs.is_feasible(task, vm)) {
        return Ok(None);
    }
    let mut timeline = schedules.timeline(vm).clone();
    let mut pending = HashMap::with_capacity(cluster.len());
    let mut last_finish = None;
    for &task in cluster {
        let ready_time = placements.ready_time(task, vm, &pending, dag, costs)?;
        let finish_time = timeline.find_finish_time(task, costs.computation_cost(task, vm), ready_time, true);
        pending.insert(task, finish_time);
        last_finish = Some(finish_time);
    }
    Ok(last_finish)
}

/// Picks the VM on which the last task of `cluster` finishes earliest. Ties go to the smaller VM id.
///
/// Fails with [`PlanningError::InfeasibleAssignment`] when no VM has enough PEs for every cluster task.
pub fn select_vm(
    cluster: &[usize],
    vms: &[Vm],
    dag: &DAG,
    costs: &CostModel,
    schedules: &Schedules,
    placements: &Placements,
) -> Result<VmChoice> {
    let mut vm_order = (0..vms.len()).collect::<Vec<_>>();
    vm_order.sort_by_key(|&vm| vms[vm].id);

    let mut best: Option<VmChoice> = None;
    for vm in vm_order {
        let finish_time = match evaluate_cluster(cluster, vm, dag, costs, schedules, placements)? {
            Some(finish_time) => finish_time,
            None => continue,
        };
        if best.map_or(true, |choice| finish_time < choice.finish_time) {
            best = Some(VmChoice { vm, finish_time });
        }
    }

    best.ok_or_else(|| {
        // a VM fitting the most demanding task fits the whole cluster
        let task = cluster
            .iter()
            .copied()
            .max_by_key(|&task| dag.get_task(task).pes)
            .unwrap_or_default();
        log::error!(
            "couldn't plan task {}, since every VM has less PEs than it requires",
            dag.get_task(task).name
        );
        PlanningError::InfeasibleAssignment {
            task,
            name: dag.get_task(task).name.clone(),
            pes: dag.get_task(task).pes,
        }
    })
}
