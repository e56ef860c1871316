//! File item.

use serde::{Deserialize, Serialize};

/// Direction of a file relative to the task it is attached to.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// The file is read by the task.
    Input,
    /// The file is produced by the task.
    Output,
}

/// Represents a named data artifact attached to a [task](crate::task::Task).
///
/// Files connect tasks only by name: an output of a parent and an input of its child with the same name
/// are the same artifact, and its size contributes to the transfer cost of the edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileItem {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    pub file_type: FileType,
}

impl FileItem {
    /// Creates new file item.
    pub fn new(name: &str, size: u64, file_type: FileType) -> Self {
        Self {
            name: name.to_string(),
            size,
            file_type,
        }
    }

    pub fn is_input(&self) -> bool {
        self.file_type == FileType::Input
    }

    pub fn is_output(&self) -> bool {
        self.file_type == FileType::Output
    }
}
