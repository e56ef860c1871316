//! Upward ranks and tentative finish time estimates.

use std::collections::VecDeque;

use crate::cost_model::CostModel;
use crate::dag::DAG;
use crate::error::{PlanningError, Result};

/// Orders tasks so that every parent precedes its children (Kahn's algorithm).
///
/// Tasks left over when no task without unprocessed parents remains lie on a cycle,
/// which is reported as [`PlanningError::MalformedGraph`].
pub fn topological_order(dag: &DAG) -> Result<Vec<usize>> {
    let task_count = dag.task_count();
    let mut pending_parents = (0..task_count)
        .map(|task| dag.parents(task).len())
        .collect::<Vec<_>>();
    let mut ready = (0..task_count)
        .filter(|&task| pending_parents[task] == 0)
        .collect::<VecDeque<_>>();

    let mut order = Vec::with_capacity(task_count);
    while let Some(task) = ready.pop_front() {
        order.push(task);
        for &child in dag.children(task) {
            pending_parents[child] -= 1;
            if pending_parents[child] == 0 {
                ready.push_back(child);
            }
        }
    }

    if order.len() < task_count {
        let stuck = (0..task_count)
            .filter(|&task| pending_parents[task] > 0)
            .collect::<Vec<_>>();
        return Err(PlanningError::MalformedGraph(format!(
            "cycle detected at task {} ({} tasks can't be ordered)",
            dag.get_task(stuck[0]).name,
            stuck.len()
        )));
    }
    Ok(order)
}

/// Computes the upward rank of every task:
/// `rank(t) = min cost(t) + max over children c of (transfer(t, c) + rank(c))`.
///
/// Tasks are visited in reverse topological order, so each rank is computed once from the finished ranks
/// of its children.
pub fn calc_ranks(dag: &DAG, costs: &CostModel) -> Result<Vec<f64>> {
    let mut ranks = vec![0.; dag.task_count()];
    for v in topological_order(dag)?.into_iter().rev() {
        let mut max = 0.;
        for &child in dag.children(v) {
            max = f64::max(max, costs.transfer_cost(v, child) + ranks[child]);
        }
        ranks[v] = costs.min_computation_cost(v) + max;
    }
    Ok(ranks)
}

/// Tentative earliest finish time of every task, assuming each task runs on its fastest VM
/// as soon as all parents finished and sent their data.
pub fn estimate_finish_times(dag: &DAG, costs: &CostModel) -> Result<Vec<f64>> {
    let mut estimates = vec![0.; dag.task_count()];
    for v in topological_order(dag)? {
        let mut ready = 0.;
        for &parent in dag.parents(v) {
            ready = f64::max(ready, estimates[parent] + costs.transfer_cost(parent, v));
        }
        estimates[v] = ready + costs.min_computation_cost(v);
    }
    Ok(estimates)
}
