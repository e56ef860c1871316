//! Per-VM reservation timelines.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::Bound::{Excluded, Included, Unbounded};

use serde::{Deserialize, Serialize};

use crate::cost_model::CostModel;

/// Execution window of one task reserved on a VM.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub start_time: f64,
    pub finish_time: f64,
    pub task: usize,
}

impl ScheduledTask {
    pub fn new(start_time: f64, finish_time: f64, task: usize) -> ScheduledTask {
        ScheduledTask {
            start_time,
            finish_time,
            task,
        }
    }

    /// Sorts before every reservation starting at `time` or later.
    fn probe(time: f64) -> ScheduledTask {
        ScheduledTask::new(time, f64::NEG_INFINITY, 0)
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start_time
            .total_cmp(&other.start_time)
            .then(self.finish_time.total_cmp(&other.finish_time))
            .then(self.task.cmp(&other.task))
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledTask {}

/// Ordered, non-overlapping reservations of a single VM.
#[derive(Clone, Debug)]
pub struct Timeline {
    reservations: BTreeSet<ScheduledTask>,
    last_finish: f64,
    insertion: bool,
}

impl Timeline {
    /// Creates an empty timeline. With `insertion` disabled, tasks are only appended after the last reservation.
    pub fn new(insertion: bool) -> Self {
        Self {
            reservations: BTreeSet::new(),
            last_finish: 0.,
            insertion,
        }
    }

    /// Finds the earliest start time not before `ready_time` at which `duration` fits between reservations.
    pub fn find_slot(&self, ready_time: f64, duration: f64) -> f64 {
        let last_finish = self.last_finish_time();
        if !self.insertion {
            return ready_time.max(last_finish);
        }
        if ready_time >= last_finish {
            return ready_time;
        }

        let mut possible_starts = self
            .reservations
            .iter()
            .map(|scheduled_task| scheduled_task.finish_time)
            .filter(|&a| a >= ready_time)
            .collect::<Vec<_>>();
        possible_starts.push(ready_time);
        possible_starts.sort_by(|a, b| a.total_cmp(b));
        possible_starts.dedup();

        for &possible_start in possible_starts.iter() {
            if self.fits(possible_start, duration) {
                return possible_start;
            }
        }
        // the start after the last reservation always fits
        last_finish
    }

    fn fits(&self, start: f64, duration: f64) -> bool {
        let next = self
            .reservations
            .range((Excluded(ScheduledTask::probe(start)), Unbounded))
            .next();
        let prev = self
            .reservations
            .range((Unbounded, Included(ScheduledTask::probe(start))))
            .next_back();
        if let Some(scheduled_task) = prev {
            if scheduled_task.finish_time > start {
                return false;
            }
        }
        if let Some(scheduled_task) = next {
            if scheduled_task.start_time < start + duration {
                return false;
            }
        }
        true
    }

    /// Returns the earliest finish time of `task` started not before `ready_time`.
    /// If `commit` is true, also reserves the found slot.
    pub fn find_finish_time(&mut self, task: usize, duration: f64, ready_time: f64, commit: bool) -> f64 {
        if commit {
            self.reserve(task, duration, ready_time).finish_time
        } else {
            self.find_slot(ready_time, duration) + duration
        }
    }

    /// Reserves the earliest slot for `task` and returns it.
    pub fn reserve(&mut self, task: usize, duration: f64, ready_time: f64) -> ScheduledTask {
        let start = self.find_slot(ready_time, duration);
        let scheduled_task = ScheduledTask::new(start, start + duration, task);
        self.reservations.insert(scheduled_task);
        self.last_finish = self.last_finish.max(scheduled_task.finish_time);
        scheduled_task
    }

    pub fn last_finish_time(&self) -> f64 {
        self.last_finish
    }

    pub fn reservations(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.reservations.iter()
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}

/// Timelines of all VMs of the pool, indexed by VM position.
#[derive(Clone, Debug)]
pub struct Schedules {
    timelines: Vec<Timeline>,
}

impl Schedules {
    pub fn new(vm_count: usize, insertion: bool) -> Self {
        Self {
            timelines: (0..vm_count).map(|_| Timeline::new(insertion)).collect(),
        }
    }

    /// Reserves the earliest slot for `task` on `vm` using its computation cost as the slot length.
    pub fn reserve(&mut self, task: usize, vm: usize, ready_time: f64, costs: &CostModel) -> ScheduledTask {
        let duration = costs.computation_cost(task, vm);
        self.timelines[vm].reserve(task, duration, ready_time)
    }

    pub fn timeline(&self, vm: usize) -> &Timeline {
        &self.timelines[vm]
    }

    pub fn timelines(&self) -> &[Timeline] {
        &self.timelines
    }
}
