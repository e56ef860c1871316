//! Planner interface and the planning pipeline shared by all strategies.

use serde::{Deserialize, Serialize};

use crate::allocator::{allocate, Placements};
use crate::audit::{AuditLog, AuditRecord};
use crate::cluster::{ClusterSelector, ClusteringPolicy};
use crate::cost_model::CostModel;
use crate::dag::DAG;
use crate::error::{PlanningError, Result};
use crate::rank::{calc_ranks, estimate_finish_times};
use crate::timeline::Schedules;
use crate::vm::Vm;
use crate::vm_selector::select_vm;

/// Static planning strategy: maps every task of a workflow to a VM before execution.
///
/// Implementations don't modify the graph, the returned [`Plan`] is applied separately with [`Plan::apply`].
pub trait Planner {
    fn name(&self) -> String;
    fn plan(&self, dag: &DAG, vms: &[Vm]) -> Result<Plan>;
}

/// Final placement of one task.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Assignment {
    pub task: usize,
    pub vm: u32,
    pub owner: usize,
    pub start_time: f64,
    pub finish_time: f64,
}

/// Result of a successful planning run.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Plan {
    pub planner: String,
    /// Assignments indexed by task id.
    pub assignments: Vec<Assignment>,
    /// Clusters in the order they were committed.
    pub clusters: Vec<Vec<usize>>,
    /// Allocation records in commit order.
    pub audit_log: Vec<AuditRecord>,
    pub ranks: Vec<f64>,
    pub makespan: f64,
}

impl Plan {
    pub fn assignment(&self, task: usize) -> &Assignment {
        &self.assignments[task]
    }

    /// Writes VM and owner ids onto the tasks.
    ///
    /// Nothing is written if any task of the graph already has an assignment.
    pub fn apply(&self, dag: &mut DAG) -> Result<()> {
        if self.assignments.len() != dag.task_count() {
            return Err(PlanningError::MalformedGraph(format!(
                "plan covers {} tasks, but the graph has {}",
                self.assignments.len(),
                dag.task_count()
            )));
        }
        if let Some(task) = dag.get_tasks().iter().find(|task| task.vm().is_some()) {
            return Err(PlanningError::AlreadyAssigned { task: task.id });
        }
        for assignment in self.assignments.iter() {
            dag.get_task_mut(assignment.task)
                .assign(assignment.vm, assignment.owner)?;
        }
        Ok(())
    }

    pub fn audit(&self, dag: &DAG, vms: &[Vm]) -> AuditLog {
        AuditLog::new(dag, vms, &self.audit_log)
    }
}

/// Stages of a planning run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlannerState {
    /// Graph and VM pool are supplied.
    Init,
    /// Computation and transfer costs are known.
    CostComputed,
    /// Every task has a rank, the unscheduled queue is built.
    Ranked,
    /// Clusters are being selected and committed.
    Scheduling,
    /// Every task has a VM.
    Done,
}

/// A single planning run over one graph and one VM pool.
///
/// The run owns all intermediate state (costs, ranks, timelines, the unscheduled queue).
/// When it fails, that state is dropped with it.
pub struct PlanningRun<'a> {
    dag: &'a DAG,
    vms: &'a [Vm],
    planner: String,
    policy: ClusteringPolicy,
    insertion: bool,
    state: PlannerState,
}

impl<'a> PlanningRun<'a> {
    pub fn new(dag: &'a DAG, vms: &'a [Vm], planner: String, policy: ClusteringPolicy, insertion: bool) -> Self {
        Self {
            dag,
            vms,
            planner,
            policy,
            insertion,
            state: PlannerState::Init,
        }
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    fn advance(&mut self, state: PlannerState) {
        log::debug!("[{}] {:?} -> {:?}", self.planner, self.state, state);
        self.state = state;
    }

    /// Plans the whole graph. A run can be started only once, later calls fail with
    /// [`PlanningError::RunAlreadyStarted`].
    pub fn run(&mut self) -> Result<Plan> {
        if self.state != PlannerState::Init {
            return Err(PlanningError::RunAlreadyStarted);
        }
        let dag = self.dag;
        let vms = self.vms;
        log::info!(
            "[{}] planning {} tasks on {} VMs",
            self.planner,
            dag.task_count(),
            vms.len()
        );

        let costs = CostModel::new(dag, vms)?;
        for (i, vm) in vms.iter().enumerate() {
            if dag.task_count() > 0 && (0..dag.task_count()).all(|task| !costs.is_feasible(task, i)) {
                log::warn!("[{}] VM {} has too few PEs for any task", self.planner, vm.id);
            }
        }
        self.advance(PlannerState::CostComputed);

        let ranks = calc_ranks(dag, &costs)?;
        let mut placements = Placements::new(estimate_finish_times(dag, &costs)?);
        let mut selector = ClusterSelector::new(&ranks, self.policy);
        self.advance(PlannerState::Ranked);

        self.advance(PlannerState::Scheduling);
        let mut schedules = Schedules::new(vms.len(), self.insertion);
        let mut audit_log = Vec::with_capacity(dag.task_count());
        let mut clusters = Vec::new();
        while let Some(cluster) = selector.next_cluster(dag, &ranks, placements.finish_times())? {
            let choice = select_vm(&cluster, vms, dag, &costs, &schedules, &placements)?;
            log::debug!(
                "[{}] cluster {:?} goes to VM {}, finishing at {:.3}",
                self.planner,
                cluster.iter().map(|&t| dag.get_task(t).name.as_str()).collect::<Vec<_>>(),
                vms[choice.vm].id,
                choice.finish_time
            );
            audit_log.extend(allocate(
                &cluster,
                choice.vm,
                vms,
                dag,
                &costs,
                &mut schedules,
                &mut placements,
            )?);
            let remaining = selector.unscheduled().len();
            selector.mark_scheduled(&cluster);
            debug_assert!(selector.unscheduled().len() < remaining);
            clusters.push(cluster);
        }

        let mut assignments = audit_log
            .iter()
            .map(|record| Assignment {
                task: record.task,
                vm: record.vm,
                owner: record.owner,
                start_time: record.start_time,
                finish_time: record.finish_time,
            })
            .collect::<Vec<_>>();
        assignments.sort_by_key(|assignment| assignment.task);
        if assignments.len() != dag.task_count() {
            return Err(PlanningError::MalformedGraph(format!(
                "only {} of {} tasks were planned",
                assignments.len(),
                dag.task_count()
            )));
        }
        let makespan = assignments
            .iter()
            .map(|assignment| assignment.finish_time)
            .fold(0., f64::max);

        self.advance(PlannerState::Done);
        log::info!("[{}] expected makespan: {:.3}", self.planner, makespan);

        Ok(Plan {
            planner: self.planner.clone(),
            assignments,
            clusters,
            audit_log,
            ranks,
            makespan,
        })
    }
}
