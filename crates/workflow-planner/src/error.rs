//! Planning and configuration errors.

use thiserror::Error;

/// Failure of a planning run.
///
/// Planning is deterministic, so none of these are retried: the same inputs would produce the same failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanningError {
    /// No VM in the pool has enough processing elements for the task.
    #[error("task {name} ({task}) requires {pes} PEs, but no VM provides that many")]
    InfeasibleAssignment { task: usize, name: String, pes: u32 },

    /// The task graph contains a cycle or references a task that does not exist.
    #[error("malformed workflow graph: {0}")]
    MalformedGraph(String),

    /// Successor selection found no child although the eligibility check reported one.
    #[error("clustering anomaly: no eligible successor of task {task} could be selected")]
    ClusteringAnomaly { task: usize },

    #[error("invalid VM pool: {0}")]
    InvalidVmPool(String),

    /// The task already carries a VM assignment.
    #[error("task {task} is already assigned to a VM")]
    AlreadyAssigned { task: usize },

    #[error("planning run was already started")]
    RunAlreadyStarted,
}

pub type Result<T> = std::result::Result<T, PlanningError>;

/// Failure while loading planner or VM pool configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("can't parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("can't serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid planner parameters: {0}")]
    InvalidPlannerParams(String),

    #[error("unknown planner: {0}")]
    UnknownPlanner(String),
}
