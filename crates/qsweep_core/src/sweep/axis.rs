//! Sweep axes and their grouping

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{ObjectId, Value};

/// Relative tolerance used to decide whether `max` is reached
const INCLUSIVE_TOLERANCE: f64 = 1e-9;

/// Most values a range-built axis may expand to
pub const MAX_AXIS_POINTS: usize = 1 << 24;

/// Spacing of a range-built axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    /// `min + k * step`
    #[default]
    Linear,
    /// `min * step^k`
    Log,
}

/// Where an axis gets its values from
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    Explicit(Vec<Value>),
    /// `step` is optional so an incomplete description can be stored and
    /// rejected when the values are first read
    Range {
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
        scale: Scale,
    },
}

/// One swept parameter: which cell, which values, and how it pairs with the
/// axis declared before it
#[derive(Debug, Clone)]
pub struct SweepAxis {
    target: ObjectId,
    key: String,
    label: Option<String>,
    source: ValueSource,
    lockstep: bool,
    values: OnceLock<Result<Vec<Value>, ConfigError>>,
}

impl SweepAxis {
    /// Axis over an explicit list of values
    pub fn new(target: ObjectId, key: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with_source(target, key, ValueSource::Explicit(values))
    }

    /// Axis built from `min`/`max`/`step`
    pub fn range(target: ObjectId, key: impl Into<String>, min: f64, max: f64, step: f64) -> Self {
        Self::with_source(
            target,
            key,
            ValueSource::Range {
                min: Some(min),
                max: Some(max),
                step: Some(step),
                scale: Scale::Linear,
            },
        )
    }

    pub fn with_source(target: ObjectId, key: impl Into<String>, source: ValueSource) -> Self {
        Self {
            target,
            key: key.into(),
            label: None,
            source,
            lockstep: false,
            values: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Scale) -> Self {
        if let ValueSource::Range { scale: s, .. } = &mut self.source {
            *s = scale;
        }
        self.values = OnceLock::new();
        self
    }

    /// Advance together with the previously declared axis instead of
    /// spanning a new dimension
    #[must_use]
    pub fn lockstep(mut self) -> Self {
        self.lockstep = true;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn set_source(&mut self, source: ValueSource) {
        self.source = source;
        self.values = OnceLock::new();
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = Some(label);
    }

    #[must_use]
    pub fn target(&self) -> ObjectId {
        self.target
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Explicit label, or the key when none was given
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    #[must_use]
    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }

    #[must_use]
    pub fn source(&self) -> &ValueSource {
        &self.source
    }

    #[must_use]
    pub fn is_lockstep(&self) -> bool {
        self.lockstep
    }

    /// The values this axis takes, built once on first read
    pub fn values(&self) -> Result<&[Value], ConfigError> {
        self.values
            .get_or_init(|| build_values(self.label(), &self.source))
            .as_deref()
            .map_err(Clone::clone)
    }

    pub fn len(&self) -> Result<usize, ConfigError> {
        self.values().map(<[Value]>::len)
    }
}

fn build_values(axis: &str, source: &ValueSource) -> Result<Vec<Value>, ConfigError> {
    let values = match source {
        ValueSource::Explicit(values) => values.clone(),
        ValueSource::Range {
            min: Some(min),
            max: Some(max),
            step: Some(step),
            scale,
        } => {
            let points = match scale {
                Scale::Linear => linear(axis, *min, *max, *step)?,
                Scale::Log => geometric(axis, *min, *max, *step)?,
            };
            points.into_iter().map(Value::Float).collect()
        }
        ValueSource::Range { .. } => {
            return Err(ConfigError::MissingValues {
                axis: axis.to_string(),
            });
        }
    };

    if values.is_empty() {
        return Err(ConfigError::EmptyAxis {
            axis: axis.to_string(),
        });
    }
    Ok(values)
}

fn invalid(axis: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidRange {
        axis: axis.to_string(),
        reason,
    }
}

fn linear(axis: &str, min: f64, max: f64, step: f64) -> Result<Vec<f64>, ConfigError> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(invalid(axis, "bounds and step must be finite"));
    }
    if step == 0.0 {
        return Err(invalid(axis, "step must not be zero"));
    }
    let span = max - min;
    if span != 0.0 && span.signum() != step.signum() {
        return Err(invalid(axis, "step points away from max"));
    }

    let tolerance = INCLUSIVE_TOLERANCE * span.abs().max(step.abs());
    let count = point_count(axis, (span + tolerance.copysign(step)) / step)?;
    Ok((0..count).map(|k| min + k as f64 * step).collect())
}

fn geometric(axis: &str, min: f64, max: f64, ratio: f64) -> Result<Vec<f64>, ConfigError> {
    if !(min.is_finite() && max.is_finite() && ratio.is_finite()) {
        return Err(invalid(axis, "bounds and step must be finite"));
    }
    if min <= 0.0 || max <= 0.0 {
        return Err(invalid(axis, "log scale needs positive bounds"));
    }
    if ratio <= 0.0 || ratio == 1.0 {
        return Err(invalid(axis, "log step must be a positive ratio other than 1"));
    }
    if max != min && (max > min) != (ratio > 1.0) {
        return Err(invalid(axis, "step points away from max"));
    }

    let span = (max / min).ln() / ratio.ln();
    let count = point_count(axis, span + INCLUSIVE_TOLERANCE * span.abs().max(1.0))?;
    Ok((0..count).map(|k| min * ratio.powf(k as f64)).collect())
}

/// Number of values for `steps` whole steps past `min`, checked against
/// [`MAX_AXIS_POINTS`] before anything is allocated
fn point_count(axis: &str, steps: f64) -> Result<usize, ConfigError> {
    let steps = steps.floor();
    if steps.is_nan() || steps < 0.0 {
        return Err(invalid(axis, "step count is undefined"));
    }
    if steps >= MAX_AXIS_POINTS as f64 {
        return Err(invalid(axis, "step is too small for the range"));
    }
    (steps as usize)
        .checked_add(1)
        .ok_or_else(|| invalid(axis, "step is too small for the range"))
}

/// Indices of axes that advance together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisGroup {
    pub axes: Vec<usize>,
}

/// Partition axes into groups: a lockstep axis joins the group of the axis
/// declared immediately before it, every other axis starts a new group
#[must_use]
pub fn group_axes(axes: &[SweepAxis]) -> Vec<AxisGroup> {
    let mut groups: Vec<AxisGroup> = Vec::new();
    for (i, axis) in axes.iter().enumerate() {
        if axis.is_lockstep()
            && let Some(group) = groups.last_mut()
        {
            group.axes.push(i);
        } else {
            groups.push(AxisGroup { axes: vec![i] });
        }
    }
    groups
}
