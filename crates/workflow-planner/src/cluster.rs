//! Selection of task clusters.

use std::collections::HashSet;

use crate::dag::DAG;
use crate::error::{PlanningError, Result};

/// How tasks are grouped before being mapped to VMs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusteringPolicy {
    /// Every cluster holds a single task.
    Single,
    /// A cluster is a chain grown from the seed along its most urgent eligible successor.
    Chain,
}

/// Keeps unscheduled tasks in priority order and produces clusters from them.
///
/// Priority is the upward rank in descending order, ties are broken by smaller task id.
/// A task is eligible for a cluster only when every parent is already scheduled or precedes it in the cluster.
pub struct ClusterSelector {
    queue: Vec<usize>,
    scheduled: Vec<bool>,
    policy: ClusteringPolicy,
}

impl ClusterSelector {
    pub fn new(ranks: &[f64], policy: ClusteringPolicy) -> Self {
        let mut queue = (0..ranks.len()).collect::<Vec<_>>();
        queue.sort_by(|&a, &b| ranks[b].total_cmp(&ranks[a]).then(a.cmp(&b)));
        Self {
            queue,
            scheduled: vec![false; ranks.len()],
            policy,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Unscheduled tasks in priority order.
    pub fn unscheduled(&self) -> &[usize] {
        &self.queue
    }

    pub fn is_scheduled(&self, task: usize) -> bool {
        self.scheduled[task]
    }

    /// Removes the tasks of a committed cluster from the queue.
    pub fn mark_scheduled(&mut self, cluster: &[usize]) {
        for &task in cluster {
            self.scheduled[task] = true;
        }
        let scheduled = &self.scheduled;
        self.queue.retain(|&task| !scheduled[task]);
    }

    /// Builds the next cluster, `None` once every task is scheduled.
    ///
    /// The seed is the highest-priority task whose parents are all scheduled. With [`ClusteringPolicy::Chain`]
    /// the cluster then grows along the eligible child maximizing `rank + finish estimate`.
    pub fn next_cluster(&self, dag: &DAG, ranks: &[f64], finish_times: &[f64]) -> Result<Option<Vec<usize>>> {
        if self.queue.is_empty() {
            return Ok(None);
        }
        let seed = self
            .queue
            .iter()
            .copied()
            .find(|&task| self.is_eligible(task, &HashSet::new(), dag))
            .ok_or_else(|| {
                PlanningError::MalformedGraph(format!(
                    "none of {} unscheduled tasks has all parents scheduled",
                    self.queue.len()
                ))
            })?;

        let mut cluster = vec![seed];
        if self.policy == ClusteringPolicy::Single {
            return Ok(Some(cluster));
        }

        let mut members = HashSet::from([seed]);
        let mut head = seed;
        while self.has_unscheduled_successor(head, &members, dag) {
            let next = self
                .best_successor(head, &members, dag, ranks, finish_times)
                .ok_or(PlanningError::ClusteringAnomaly { task: head })?;
            cluster.push(next);
            members.insert(next);
            head = next;
        }
        Ok(Some(cluster))
    }

    fn is_eligible(&self, task: usize, cluster: &HashSet<usize>, dag: &DAG) -> bool {
        !self.scheduled[task]
            && !cluster.contains(&task)
            && dag
                .parents(task)
                .iter()
                .all(|parent| self.scheduled[*parent] || cluster.contains(parent))
    }

    fn has_unscheduled_successor(&self, task: usize, cluster: &HashSet<usize>, dag: &DAG) -> bool {
        dag.children(task)
            .iter()
            .any(|&child| self.is_eligible(child, cluster, dag))
    }

    fn best_successor(
        &self,
        task: usize,
        cluster: &HashSet<usize>,
        dag: &DAG,
        ranks: &[f64],
        finish_times: &[f64],
    ) -> Option<usize> {
        dag.children(task)
            .iter()
            .copied()
            .filter(|&child| self.is_eligible(child, cluster, dag))
            .max_by(|&a, &b| {
                (ranks[a] + finish_times[a])
                    .total_cmp(&(ranks[b] + finish_times[b]))
                    .then_with(|| b.cmp(&a))
            })
    }
}
