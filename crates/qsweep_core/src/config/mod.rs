//! Sweep and execution configuration
//!
//! Configuration is explicit and validated: every struct rejects unknown
//! fields, and object names are resolved against the registry when a spec is
//! applied, so a typo fails loudly instead of sweeping nothing.
//!
//! # Example
//!
//! ```ignore
//! let spec = SweepSpec::from_json(r#"{
//!     "axes": [
//!         { "object": "qubit", "key": "frequency", "min": 4.0, "max": 6.0, "step": 0.5 },
//!         { "object": "cavity", "key": "dimension", "values": [3, 5, 8] },
//!         { "object": "coupling", "key": "g", "values": [0.1, 0.2, 0.3], "lockstep": true }
//!     ],
//!     "execution": { "mode": "parallel", "workers": 4 }
//! }"#)?;
//! simulation.apply_spec(&spec)?;
//! ```

pub mod builder;

pub use builder::{SystemBuilder, composite, leaf, term};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::Value;
use crate::registry::Registry;
use crate::sweep::{Scale, SweepAxis, ValueSource};

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// How sweep points are evaluated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// In place, one point after another
    #[default]
    Sequential,
    /// On a fixed-size worker pool, one replica per point
    Parallel,
}

/// Execution settings for a sweep run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Worker threads in parallel mode (defaults to CPU count)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            workers: default_workers(),
        }
    }
}

impl ExecutionConfig {
    #[must_use]
    pub fn sequential() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn parallel(workers: usize) -> Self {
        Self {
            mode: ExecutionMode::Parallel,
            workers,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == ExecutionMode::Parallel && self.workers == 0 {
            return Err(ConfigError::InvalidExecution {
                reason: "parallel mode needs at least one worker",
            });
        }
        Ok(())
    }
}

/// Serialisable description of one sweep axis, addressed by object name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisSpec {
    /// Object name or alias
    pub object: String,
    /// Parameter key (`dimension` resizes a leaf)
    pub key: String,
    /// Explicit values; take precedence over a range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default)]
    pub scale: Scale,
    /// Advance together with the previous axis
    #[serde(default)]
    pub lockstep: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AxisSpec {
    /// Axis over explicit values
    pub fn values(object: impl Into<String>, key: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            object: object.into(),
            key: key.into(),
            values: Some(values),
            min: None,
            max: None,
            step: None,
            scale: Scale::Linear,
            lockstep: false,
            label: None,
        }
    }

    /// Axis over a `min`/`max`/`step` range
    pub fn range(object: impl Into<String>, key: impl Into<String>, min: f64, max: f64, step: f64) -> Self {
        Self {
            values: None,
            min: Some(min),
            max: Some(max),
            step: Some(step),
            ..Self::values(object, key, Vec::new())
        }
    }

    /// Resolve the object name and build the axis.
    ///
    /// Value validation is left to the first read of the axis values.
    pub fn resolve<A>(&self, registry: &Registry<A>) -> Result<SweepAxis, crate::error::SimError> {
        let target = registry.lookup(&self.object)?;
        let source = match &self.values {
            Some(values) => ValueSource::Explicit(values.clone()),
            None => ValueSource::Range {
                min: self.min,
                max: self.max,
                step: self.step,
                scale: self.scale,
            },
        };

        let mut axis = SweepAxis::with_source(target, self.key.as_str(), source)
            .with_label(self.label.clone().unwrap_or_else(|| format!("{}.{}", self.object, self.key)));
        if self.lockstep {
            axis = axis.lockstep();
        }
        Ok(axis)
    }
}

/// Complete sweep description: axes in declaration order plus execution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSpec {
    #[serde(default)]
    pub axes: Vec<AxisSpec>,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl SweepSpec {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LookupError, SimError};

    #[test]
    fn test_parse_sweep_spec() {
        let spec = SweepSpec::from_json(
            r#"{
                "axes": [
                    { "object": "qubit", "key": "frequency", "min": 4.0, "max": 6.0, "step": 0.5 },
                    { "object": "coupling", "key": "g", "values": [0.1, 0.2], "lockstep": true },
                    { "object": "cavity", "key": "kappa", "min": 0.001, "max": 0.1, "step": 10.0, "scale": "log" }
                ],
                "execution": { "mode": "parallel", "workers": 4 }
            }"#,
        )
        .unwrap();

        assert_eq!(spec.axes.len(), 3);
        assert!(spec.axes[1].lockstep);
        assert_eq!(spec.axes[2].scale, Scale::Log);
        assert_eq!(spec.execution, ExecutionConfig::parallel(4));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = SweepSpec::from_json(r#"{ "axes": [], "executor": {} }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = SweepSpec::from_json(
            r#"{ "axes": [{ "object": "q", "key": "f", "value": [1] }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_execution_defaults() {
        let spec = SweepSpec::from_json(r#"{ "axes": [] }"#).unwrap();
        assert_eq!(spec.execution.mode, ExecutionMode::Sequential);
        assert!(spec.execution.workers >= 1);
        assert!(ExecutionConfig::parallel(0).validate().is_err());
        assert!(ExecutionConfig::sequential().validate().is_ok());
    }

    #[test]
    fn test_resolve_axis_spec() {
        let mut registry: Registry<()> = Registry::new();
        let q = registry.create_leaf("qubit", 2).unwrap();

        let axis = AxisSpec::range("qubit", "frequency", 4.0, 5.0, 0.5)
            .resolve(&registry)
            .unwrap();
        assert_eq!(axis.target(), q);
        assert_eq!(axis.label(), "qubit.frequency");
        assert_eq!(axis.len().unwrap(), 3);

        let explicit = AxisSpec {
            min: Some(0.0),
            label: Some("f".to_string()),
            ..AxisSpec::values("qubit", "frequency", vec![Value::Float(1.0)])
        };
        let axis = explicit.resolve(&registry).unwrap();
        assert_eq!(axis.label(), "f");
        assert_eq!(axis.len().unwrap(), 1);

        assert_eq!(
            AxisSpec::values("cavity", "kappa", vec![]).resolve(&registry).unwrap_err(),
            SimError::Lookup(LookupError::NameNotFound("cavity".to_string()))
        );
    }

    #[test]
    fn test_incomplete_range_fails_on_first_read() {
        let mut registry: Registry<()> = Registry::new();
        registry.create_leaf("qubit", 2).unwrap();
        let spec = AxisSpec {
            step: None,
            ..AxisSpec::range("qubit", "frequency", 4.0, 5.0, 0.5)
        };
        let axis = spec.resolve(&registry).unwrap();
        assert!(matches!(axis.values(), Err(ConfigError::MissingValues { .. })));
    }

    #[test]
    fn test_json_round_trip() {
        let spec = SweepSpec {
            axes: vec![AxisSpec::values("q", "f", vec![Value::Int(1), Value::Float(2.5)])],
            execution: ExecutionConfig::parallel(2),
        };
        assert_eq!(SweepSpec::from_json(&spec.to_json().unwrap()).unwrap(), spec);
    }
}
