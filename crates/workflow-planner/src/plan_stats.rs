use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::planner::Plan;
use crate::vm::Vm;

/// Usage of a single VM by a plan.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VmStats {
    pub vm: u32,
    pub task_count: usize,
    /// Total execution time of tasks planned on the VM.
    pub busy_time: f64,
    pub first_start: f64,
    pub last_finish: f64,
    /// Price of the VM usage from its first task start to its last task finish.
    pub cost: f64,
}

/// Metrics of a plan, computed from the expected start and finish times of tasks.
#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct PlanStats {
    /// Finish time of the last task.
    pub makespan: f64,
    /// Total task execution time (in seconds).
    pub total_task_time: f64,
    /// The number of VMs with at least one task.
    pub used_vm_count: usize,
    /// Ratio of busy time to `makespan` summed over all VMs.
    pub utilization: f64,
    /// Same as `utilization`, but over used VMs only.
    pub utilization_used: f64,
    /// Ratio of busy time to the time between the first task start and the last task finish, summed over used VMs.
    /// That is, a VM is considered to be turned on only while it is needed.
    pub utilization_active: f64,
    /// Per-VM usage, ordered by VM id.
    pub vms: Vec<VmStats>,
    /// Total cost of used VMs.
    pub total_cost: f64,
}

fn ratio(value: f64, total: f64) -> f64 {
    if total > 0. {
        value / total
    } else {
        0.
    }
}

impl PlanStats {
    /// Computes plan metrics. VM usage is charged per started `pricing_interval`.
    pub fn new(plan: &Plan, vms: &[Vm], pricing_interval: f64) -> Self {
        let prices = vms.iter().map(|vm| (vm.id, vm.price)).collect::<BTreeMap<_, _>>();
        let mut usage: BTreeMap<u32, VmStats> = BTreeMap::new();
        let mut stats = Self::default();

        for assignment in plan.assignments.iter() {
            let duration = assignment.finish_time - assignment.start_time;
            stats.total_task_time += duration;
            stats.makespan = stats.makespan.max(assignment.finish_time);
            let vm = usage.entry(assignment.vm).or_insert(VmStats {
                vm: assignment.vm,
                task_count: 0,
                busy_time: 0.,
                first_start: assignment.start_time,
                last_finish: assignment.finish_time,
                cost: 0.,
            });
            vm.task_count += 1;
            vm.busy_time += duration;
            vm.first_start = vm.first_start.min(assignment.start_time);
            vm.last_finish = vm.last_finish.max(assignment.finish_time);
        }

        let mut total_active = 0.;
        for vm in usage.values_mut() {
            let duration = vm.last_finish - vm.first_start;
            total_active += duration;
            let n_intervals = (duration - 1e-9).div_euclid(pricing_interval) + 1.0;
            vm.cost = n_intervals * prices.get(&vm.vm).copied().unwrap_or_default();
            stats.total_cost += vm.cost;
        }

        stats.used_vm_count = usage.len();
        stats.utilization = ratio(stats.total_task_time, stats.makespan * vms.len() as f64);
        stats.utilization_used = ratio(stats.total_task_time, stats.makespan * stats.used_vm_count as f64);
        stats.utilization_active = ratio(stats.total_task_time, total_active);
        stats.vms = usage.into_values().collect();
        stats
    }
}
