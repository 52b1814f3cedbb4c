//! Static per-field metadata attached to every publish

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Units and descriptions keyed by publish name, plus one sensor label
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorMetadata {
    sensor: String,
    units: HashMap<String, String>,
    description: HashMap<String, String>,
}

impl SensorMetadata {
    pub fn new(sensor: impl Into<String>) -> Self {
        Self {
            sensor: sensor.into(),
            ..Self::default()
        }
    }

    /// Register unit and description for a publish name
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.units.insert(name.clone(), unit.into());
        self.description.insert(name, description.into());
        self
    }

    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    pub fn unit(&self, name: &str) -> Result<&str> {
        self.units
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingMetadata {
                kind: "units",
                name: name.to_string(),
            })
    }

    pub fn description(&self, name: &str) -> Result<&str> {
        self.description
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingMetadata {
                kind: "description",
                name: name.to_string(),
            })
    }
}
