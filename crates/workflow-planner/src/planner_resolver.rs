use std::collections::BTreeMap;
use std::str::FromStr;

use itertools::Itertools;

use crate::error::ConfigError;
use crate::planner::Planner;
use crate::planners::heft::HeftPlanner;
use crate::planners::pch::PchPlanner;

/// Planner name with optional parameters, written as `Name` or `Name[key=value,...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerParams {
    name: String,
    params: BTreeMap<String, String>,
}

impl FromStr for PlannerParams {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidPlannerParams(format!("{s:?}: {reason}"));

        let (name, params) = match s.split_once('[') {
            None => (s, None),
            Some((name, rest)) => {
                let params = rest.strip_suffix(']').ok_or_else(|| invalid("missing closing bracket"))?;
                (name, Some(params))
            }
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("empty planner name"));
        }

        let mut parsed = BTreeMap::new();
        for param in params.into_iter().flat_map(|params| params.split(',')) {
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| invalid("expected key=value"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(invalid("empty parameter name"));
            }
            if parsed.insert(key.to_string(), value.trim().to_string()).is_some() {
                return Err(invalid("repeated parameter"));
            }
        }

        Ok(Self {
            name: name.to_string(),
            params: parsed,
        })
    }
}

impl PlannerParams {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Typed value of a parameter, `None` if it is missing or doesn't parse as `T`.
    pub fn get<T: FromStr, K: AsRef<str>>(&self, name: K) -> Option<T> {
        self.params.get(name.as_ref()).and_then(|s| s.parse().ok())
    }
}

impl std::fmt::Display for PlannerParams {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(
                f,
                "{}[{}]",
                self.name,
                self.params.iter().map(|(k, v)| format!("{k}={v}")).join(",")
            )
        }
    }
}

pub fn default_planner_resolver(params: &PlannerParams) -> Option<Box<dyn Planner>> {
    match params.name.as_ref() {
        "Pch" => Some(Box::new(PchPlanner::from_planner_params(params))),
        "Heft" => Some(Box::new(HeftPlanner::from_planner_params(params))),
        _ => None,
    }
}
