//! Workflow task.

use crate::error::{PlanningError, Result};
use crate::file_item::{FileItem, FileType};

/// Represents a workflow task state.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum TaskState {
    /// No VM has been assigned yet.
    Unplanned,
    /// The task carries a VM and owner assignment.
    Planned,
}

/// Represents a workflow task.
///
/// Described by its length in instructions and the number of processing elements (PEs) it needs.
/// Dependencies are explicit parent/child edges; the attached files are only used to estimate how much data
/// flows along each edge.
#[derive(Clone, Debug)]
pub struct Task {
    pub id: usize,
    pub name: String,
    /// Total instruction length (MI).
    pub length: f64,
    /// Number of required processing elements.
    pub pes: u32,
    pub files: Vec<FileItem>,
    pub state: TaskState,
    pub(crate) parents: Vec<usize>,
    pub(crate) children: Vec<usize>,
    vm: Option<u32>,
    owner: Option<usize>,
}

impl Task {
    /// Creates new task.
    pub fn new(id: usize, name: &str, length: f64, pes: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            length,
            pes,
            files: Vec::new(),
            state: TaskState::Unplanned,
            parents: Vec::new(),
            children: Vec::new(),
            vm: None,
            owner: None,
        }
    }

    /// Attaches a file to the task.
    pub fn add_file(&mut self, name: &str, size: u64, file_type: FileType) {
        self.files.push(FileItem::new(name, size, file_type));
    }

    pub fn inputs(&self) -> impl Iterator<Item = &FileItem> {
        self.files.iter().filter(|f| f.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &FileItem> {
        self.files.iter().filter(|f| f.is_output())
    }

    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn is_entry(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_exit(&self) -> bool {
        self.children.is_empty()
    }

    /// Id of the assigned VM, if the task is planned.
    pub fn vm(&self) -> Option<u32> {
        self.vm
    }

    /// Id of the scheduler owning the assigned VM, if the task is planned.
    pub fn owner(&self) -> Option<usize> {
        self.owner
    }

    /// Sets the VM and owner of the task. Each task can be assigned only once.
    pub fn assign(&mut self, vm: u32, owner: usize) -> Result<()> {
        if self.state == TaskState::Planned {
            return Err(PlanningError::AlreadyAssigned { task: self.id });
        }
        self.vm = Some(vm);
        self.owner = Some(owner);
        self.state = TaskState::Planned;
        Ok(())
    }
}
