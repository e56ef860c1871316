//! Computation and transfer cost estimation.

use std::collections::{BTreeSet, HashMap};

use crate::dag::DAG;
use crate::error::{PlanningError, Result};
use crate::vm::Vm;

/// Computation cost of a task on a VM that has fewer PEs than the task requires.
pub const INFEASIBLE: f64 = f64::INFINITY;

const BYTES_PER_MB: f64 = 1_000_000.;

/// Cost tables of one planning run.
///
/// Computation costs are indexed by task id and by the position of the VM in the pool.
/// Transfer costs exist only for graph edges, every other pair of tasks has zero transfer cost.
pub struct CostModel {
    computation: Vec<Vec<f64>>,
    transfer: HashMap<(usize, usize), f64>,
    max_bandwidth: f64,
}

impl CostModel {
    /// Validates the VM pool and fills both cost tables.
    pub fn new(dag: &DAG, vms: &[Vm]) -> Result<Self> {
        validate_vms(vms)?;
        validate_tasks(dag)?;
        let mut model = Self {
            computation: Vec::new(),
            transfer: HashMap::new(),
            max_bandwidth: max_bandwidth(vms),
        };
        model.compute_computation_costs(dag, vms);
        model.compute_transfer_costs(dag)?;
        Ok(model)
    }

    /// Time in seconds to run each task on each VM, [`INFEASIBLE`] if the VM has too few PEs.
    fn compute_computation_costs(&mut self, dag: &DAG, vms: &[Vm]) {
        self.computation = dag
            .get_tasks()
            .iter()
            .map(|task| {
                vms.iter()
                    .map(|vm| {
                        if vm.pes < task.pes {
                            INFEASIBLE
                        } else {
                            task.length / vm.speed
                        }
                    })
                    .collect()
            })
            .collect();
    }

    /// Time in seconds to move the files of every edge, assuming the largest bandwidth in the pool.
    fn compute_transfer_costs(&mut self, dag: &DAG) -> Result<()> {
        for parent in dag.get_tasks().iter() {
            for &child in parent.children() {
                let megabytes = matched_bytes(dag, parent.id, child) as f64 / BYTES_PER_MB;
                if megabytes == 0. {
                    continue;
                }
                if self.max_bandwidth <= 0. {
                    return Err(PlanningError::InvalidVmPool(format!(
                        "edge {} -> {} transfers data, but no VM has positive bandwidth",
                        parent.name,
                        dag.get_task(child).name
                    )));
                }
                self.transfer
                    .insert((parent.id, child), megabytes * 8. / self.max_bandwidth);
            }
        }
        Ok(())
    }

    pub fn computation_cost(&self, task: usize, vm: usize) -> f64 {
        self.computation[task][vm]
    }

    pub fn transfer_cost(&self, parent: usize, child: usize) -> f64 {
        self.transfer.get(&(parent, child)).copied().unwrap_or(0.)
    }

    /// Cost of the task on its fastest feasible VM, [`INFEASIBLE`] if there is none.
    pub fn min_computation_cost(&self, task: usize) -> f64 {
        self.computation[task].iter().copied().fold(INFEASIBLE, f64::min)
    }

    pub fn is_feasible(&self, task: usize, vm: usize) -> bool {
        self.computation[task][vm] != INFEASIBLE
    }

    pub fn max_bandwidth(&self) -> f64 {
        self.max_bandwidth
    }

    pub fn vm_count(&self) -> usize {
        self.computation.first().map_or(0, |row| row.len())
    }
}

/// Sums sizes of the child's inputs that match an output of the parent by name.
fn matched_bytes(dag: &DAG, parent: usize, child: usize) -> u64 {
    let child = dag.get_task(child);
    dag.get_task(parent)
        .outputs()
        .filter_map(|output| child.inputs().find(|input| input.name == output.name))
        .map(|input| input.size)
        .sum()
}

fn max_bandwidth(vms: &[Vm]) -> f64 {
    vms.iter().map(|vm| vm.bandwidth).fold(0., f64::max)
}

fn validate_vms(vms: &[Vm]) -> Result<()> {
    if vms.is_empty() {
        return Err(PlanningError::InvalidVmPool("no VMs".to_string()));
    }
    let mut ids = BTreeSet::new();
    for vm in vms {
        if !ids.insert(vm.id) {
            return Err(PlanningError::InvalidVmPool(format!("duplicate VM id {}", vm.id)));
        }
        if !(vm.speed > 0. && vm.speed.is_finite()) {
            return Err(PlanningError::InvalidVmPool(format!(
                "VM {} has invalid speed {}",
                vm.id, vm.speed
            )));
        }
    }
    Ok(())
}

fn validate_tasks(dag: &DAG) -> Result<()> {
    for task in dag.get_tasks() {
        if !(task.length >= 0. && task.length.is_finite()) {
            return Err(PlanningError::MalformedGraph(format!(
                "task {} has invalid length {}",
                task.name, task.length
            )));
        }
    }
    Ok(())
}
