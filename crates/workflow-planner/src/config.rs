//! Planner configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::planner::Planner;
use crate::planner_resolver::{default_planner_resolver, PlannerParams};

fn default_planner() -> String {
    "Pch".to_string()
}

fn default_pricing_interval() -> f64 {
    60.
}

/// Planner settings, usually read from YAML:
///
/// ```yaml
/// planner: Heft[insertion=false]
/// pricing_interval: 3600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Planner name with parameters (default: `Pch`).
    #[serde(default = "default_planner")]
    pub planner: String,
    /// Billing interval of VM usage in seconds (default: 60).
    #[serde(default = "default_pricing_interval")]
    pub pricing_interval: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            planner: default_planner(),
            pricing_interval: default_pricing_interval(),
        }
    }
}

impl PlannerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load<P: AsRef<Path>>(file: P) -> Result<Self, ConfigError> {
        Self::from_yaml_str(&std::fs::read_to_string(file)?)
    }

    /// Creates the configured planner.
    pub fn make_planner(&self) -> Result<Box<dyn Planner>, ConfigError> {
        let params: PlannerParams = self.planner.parse()?;
        default_planner_resolver(&params).ok_or_else(|| ConfigError::UnknownPlanner(params.name().to_string()))
    }
}
