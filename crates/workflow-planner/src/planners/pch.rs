use crate::cluster::ClusteringPolicy;
use crate::dag::DAG;
use crate::error::Result;
use crate::planner::{Plan, Planner, PlanningRun};
use crate::planner_resolver::PlannerParams;
use crate::vm::Vm;

/// Path Clustering Heuristic.
///
/// Tasks are grouped into chains: starting from the highest-ranked task that can be planned, the chain follows
/// the successor with the largest `rank + finish estimate` whose other parents are already planned.
/// Each chain is placed on the single VM where its last task finishes earliest, so the data passed along
/// the chain never crosses VMs.
pub struct PchPlanner {
    insertion: bool,
}

impl PchPlanner {
    pub fn new() -> Self {
        PchPlanner { insertion: true }
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

impl Default for PchPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner for PchPlanner {
    fn name(&self) -> String {
        "pch".to_string()
    }

    fn plan(&self, dag: &DAG, vms: &[Vm]) -> Result<Plan> {
        PlanningRun::new(dag, vms, self.name(), ClusteringPolicy::Chain, self.insertion).run()
    }
}
