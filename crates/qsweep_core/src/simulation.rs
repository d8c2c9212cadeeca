//! Top-level simulation: a registry of objects plus the sweep run over it

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::aggregate::{ResultAggregator, SweepResults};
use crate::config::{ExecutionConfig, SweepSpec};
use crate::error::{Result, SimError};
use crate::executor::{Executor, PointOutputs, SweepPoint, SweepProgress};
use crate::model::ObjectId;
use crate::registry::Registry;
use crate::sweep::{AxisGroup, SweepAxis, SweepIndexSpace, group_axes};

/// Owns the object registry, the declared sweep axes and the execution
/// settings
#[derive(Debug)]
pub struct Simulation<A> {
    registry: Registry<A>,
    axes: Vec<SweepAxis>,
    execution: ExecutionConfig,
    groups: Vec<AxisGroup>,
    space: SweepIndexSpace,
}

impl<A: Send + Sync> Simulation<A> {
    #[must_use]
    pub fn new(registry: Registry<A>) -> Self {
        Self {
            registry,
            axes: Vec::new(),
            execution: ExecutionConfig::default(),
            groups: Vec::new(),
            space: SweepIndexSpace::from_sizes(Vec::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry<A> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry<A> {
        &mut self.registry
    }

    #[must_use]
    pub fn into_registry(self) -> Registry<A> {
        self.registry
    }

    #[must_use]
    pub fn axes(&self) -> &[SweepAxis] {
        &self.axes
    }

    #[must_use]
    pub fn execution(&self) -> &ExecutionConfig {
        &self.execution
    }

    pub fn set_execution(&mut self, execution: ExecutionConfig) -> Result<()> {
        execution.validate()?;
        self.execution = execution;
        Ok(())
    }

    /// Groups computed by the last [`prepare`](Self::prepare)
    #[must_use]
    pub fn groups(&self) -> &[AxisGroup] {
        &self.groups
    }

    /// Index space computed by the last [`prepare`](Self::prepare)
    #[must_use]
    pub fn index_space(&self) -> &SweepIndexSpace {
        &self.space
    }

    /// Declare the next sweep axis.
    ///
    /// Axes without an explicit label are labelled `object.key`.
    pub fn add_axis(&mut self, mut axis: SweepAxis) -> Result<()> {
        let name = self.registry.name(axis.target())?;
        if !axis.has_label() {
            let label = format!("{name}.{}", axis.key());
            axis.set_label(label);
        }
        self.axes.push(axis);
        Ok(())
    }

    pub fn clear_axes(&mut self) {
        self.axes.clear();
        self.groups.clear();
        self.space = SweepIndexSpace::from_sizes(Vec::new());
    }

    /// Replace the axes and execution settings with those of `spec`,
    /// resolving object names through the registry
    pub fn apply_spec(&mut self, spec: &SweepSpec) -> Result<()> {
        let axes = spec
            .axes
            .iter()
            .map(|axis| axis.resolve(&self.registry))
            .collect::<Result<Vec<_>>>()?;
        self.set_execution(spec.execution.clone())?;
        self.clear_axes();
        for axis in axes {
            self.add_axis(axis)?;
        }
        Ok(())
    }

    /// Recompute axis groups and the index space from the current axes.
    ///
    /// Any axis configuration error surfaces here.
    pub fn prepare(&mut self) -> Result<&SweepIndexSpace> {
        self.groups = group_axes(&self.axes);
        self.space = SweepIndexSpace::prepare(&self.axes, &self.groups)?;
        Ok(&self.space)
    }

    /// Run the sweep, calling `evaluate` at every point
    pub fn run<F>(&mut self, evaluate: F) -> Result<SweepResults>
    where
        F: Fn(&mut Registry<A>, &SweepPoint) -> Result<PointOutputs> + Send + Sync,
    {
        self.run_with_progress(evaluate, SweepProgress::default())
    }

    /// Run the sweep, reporting completed points through `progress`.
    ///
    /// Swept parameters are restored to their pre-run state afterwards, even
    /// when the run fails.
    pub fn run_with_progress<F>(&mut self, evaluate: F, progress: SweepProgress) -> Result<SweepResults>
    where
        F: Fn(&mut Registry<A>, &SweepPoint) -> Result<PointOutputs> + Send + Sync,
    {
        self.prepare()?;
        self.execution.validate()?;

        let swept: BTreeSet<(ObjectId, &str)> = self
            .axes
            .iter()
            .map(|axis| (axis.target(), axis.key()))
            .collect();
        let snapshots = swept
            .iter()
            .map(|&(object, key)| self.registry.snapshot(object, key))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(
            axes = self.axes.len(),
            points = self.space.total(),
            "running simulation"
        );
        let outcome = Executor::new(&self.axes, &self.groups, &self.space)
            .with_progress(progress)
            .run(&mut self.registry, &self.execution, evaluate);

        let mut restored = Ok(());
        for snapshot in snapshots.into_iter().rev() {
            if let Err(e) = self.registry.restore(snapshot) {
                warn!(error = %e, "could not restore swept parameter");
                restored = Err(e);
            }
        }
        let points = outcome?;
        restored?;

        let mut aggregator = ResultAggregator::new(&self.space);
        aggregator.collect_all(points)?;
        let series = aggregator.finish()?;

        let labels = self.axes.iter().map(|a| a.label().to_string()).collect();
        let axis_values = self
            .axes
            .iter()
            .map(|a| a.values().map(<[_]>::to_vec))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(SweepResults::new(
            &self.space,
            self.groups.clone(),
            labels,
            axis_values,
            series,
        ))
    }
}

impl<A> From<Registry<A>> for Simulation<A>
where
    A: Send + Sync,
{
    fn from(registry: Registry<A>) -> Self {
        Self::new(registry)
    }
}

/// Convenience for evaluators that report a single scalar
pub fn scalar(name: &str, value: f64) -> PointOutputs {
    PointOutputs::from([(name.to_string(), vec![value])])
}
