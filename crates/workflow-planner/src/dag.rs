//! Workflow graph.

use crate::error::{PlanningError, Result};
use crate::file_item::FileType;
use crate::task::*;

/// Directed acyclic graph of workflow tasks.
///
/// Tasks live in an arena and are referenced by their index, which is also the task id.
/// Edges are stored twice, as the parent list of the child and the child list of the parent.
#[derive(Clone, Default)]
pub struct DAG {
    tasks: Vec<Task>,
}

impl DAG {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn add_task(&mut self, name: &str, length: f64, pes: u32) -> usize {
        let task_id = self.tasks.len();
        self.tasks.push(Task::new(task_id, name, length, pes));
        task_id
    }

    pub fn get_task(&self, task_id: usize) -> &Task {
        &self.tasks[task_id]
    }

    pub fn get_task_mut(&mut self, task_id: usize) -> &mut Task {
        &mut self.tasks[task_id]
    }

    pub fn get_tasks(&self) -> &Vec<Task> {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn add_file(&mut self, task_id: usize, name: &str, size: u64, file_type: FileType) -> Result<()> {
        self.check_task(task_id)?;
        self.tasks[task_id].add_file(name, size, file_type);
        Ok(())
    }

    /// Adds an edge `parent -> child`. Repeated edges are ignored.
    ///
    /// Acyclicity is not checked here, cycles are reported when ranks are computed.
    pub fn add_dependency(&mut self, parent: usize, child: usize) -> Result<()> {
        self.check_task(parent)?;
        self.check_task(child)?;
        if parent == child {
            return Err(PlanningError::MalformedGraph(format!(
                "task {} depends on itself",
                self.tasks[parent].name
            )));
        }
        if self.tasks[parent].children.contains(&child) {
            return Ok(());
        }
        self.tasks[parent].children.push(child);
        self.tasks[child].parents.push(parent);
        Ok(())
    }

    pub fn parents(&self, task_id: usize) -> &[usize] {
        self.tasks[task_id].parents()
    }

    pub fn children(&self, task_id: usize) -> &[usize] {
        self.tasks[task_id].children()
    }

    pub fn entry_tasks(&self) -> impl Iterator<Item = usize> + '_ {
        self.tasks.iter().filter(|t| t.is_entry()).map(|t| t.id)
    }

    pub fn exit_tasks(&self) -> impl Iterator<Item = usize> + '_ {
        self.tasks.iter().filter(|t| t.is_exit()).map(|t| t.id)
    }

    pub fn edge_count(&self) -> usize {
        self.tasks.iter().map(|t| t.children.len()).sum()
    }

    /// Returns true when every task carries a VM assignment.
    pub fn is_planned(&self) -> bool {
        self.tasks.iter().all(|t| t.state == TaskState::Planned)
    }

    fn check_task(&self, task_id: usize) -> Result<()> {
        if task_id >= self.tasks.len() {
            return Err(PlanningError::MalformedGraph(format!("task {} does not exist", task_id)));
        }
        Ok(())
    }
}
