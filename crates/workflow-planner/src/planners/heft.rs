use crate::cluster::ClusteringPolicy;
use crate::dag::DAG;
use crate::error::Result;
use crate::planner::{Plan, Planner, PlanningRun};
use crate::planner_resolver::PlannerParams;
use crate::vm::Vm;

/// Heterogeneous Earliest Finish Time.
///
/// Tasks are taken one by one in descending order of upward rank and each goes to the VM
/// giving it the earliest finish time.
pub struct HeftPlanner {
    insertion: bool,
}

impl HeftPlanner {
    pub fn new() -> Self {
        HeftPlanner { insertion: true }
    }

    /// Enables or disables placing tasks into idle gaps between reservations.
    pub fn with_insertion(mut self, insertion: bool) -> Self {
        self.insertion = insertion;
        self
    }

    pub fn from_planner_params(params: &PlannerParams) -> Self {
        Self::new().with_insertion(params.get("insertion").unwrap_or(true))
    }
}

impl Default for HeftPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner for HeftPlanner {
    fn name(&self) -> String {
        "heft".to_string()
    }

    fn plan(&self, dag: &DAG, vms: &[Vm]) -> Result<Plan> {
        PlanningRun::new(dag, vms, self.name(), ClusteringPolicy::Single, self.insertion).run()
    }
}
