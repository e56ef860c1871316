//! VM model.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Represents a virtual machine that can execute workflow tasks.
///
/// Described by the number of processing elements (PEs), their speed in MIPS and the VM bandwidth in Mbit/s.
/// `owner` is the id of the scheduler (broker) the VM belongs to, tasks planned on the VM are handed to it.
/// `price` is charged per started pricing interval of VM usage and only matters for reporting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vm {
    pub id: u32,
    /// Processing speed in MIPS.
    pub speed: f64,
    pub pes: u32,
    /// Bandwidth in Mbit/s.
    pub bandwidth: f64,
    #[serde(default)]
    pub owner: usize,
    #[serde(default)]
    pub price: f64,
}

impl Vm {
    pub fn new(id: u32, speed: f64, pes: u32, bandwidth: f64) -> Self {
        Self {
            id,
            speed,
            pes,
            bandwidth,
            owner: 0,
            price: 0.,
        }
    }

    pub fn with_owner(mut self, owner: usize) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Yaml {
    vms: Vec<Vm>,
}

/// Parses a VM pool from YAML.
///
/// ```yaml
/// vms:
///   - id: 0
///     speed: 1000
///     pes: 1
///     bandwidth: 1000
///     owner: 2
///     price: 0.6
/// ```
pub fn vms_from_yaml_str(yaml: &str) -> Result<Vec<Vm>, ConfigError> {
    let yaml: Yaml = serde_yaml::from_str(yaml)?;
    Ok(yaml.vms)
}

/// Loads a VM pool from YAML file, see [`vms_from_yaml_str`] for the format.
pub fn load_vms<P: AsRef<Path>>(file: P) -> Result<Vec<Vm>, ConfigError> {
    vms_from_yaml_str(&std::fs::read_to_string(file)?)
}
