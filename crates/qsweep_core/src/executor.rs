//! Sweep execution
//!
//! Runs an evaluation callback at every point of a prepared index space,
//! either in place on a single system or on a fixed-size rayon pool where
//! every point gets its own replica. Only value-only [`PointResult`]s leave a
//! worker, so cached artifacts and parameter state are never shared.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::capability::{Replicate, Sweepable};
use crate::config::{ExecutionConfig, ExecutionMode};
use crate::error::{ConfigError, SimError};
use crate::sweep::{AxisGroup, SweepAxis, SweepIndexSpace, decompose};

/// Named numeric outputs of one sweep point
pub type PointOutputs = BTreeMap<String, Vec<f64>>;

/// Position of the point currently being evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPoint {
    pub flat_index: usize,
    /// One index per axis group, in declaration order
    pub indices: Vec<usize>,
}

/// Outputs of one point, tagged with the flat index they belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointResult {
    pub flat_index: usize,
    pub outputs: PointOutputs,
}

/// Progress tracking for sweep execution
#[derive(Debug, Clone)]
pub struct SweepProgress {
    /// Completed points counter
    completed: Arc<AtomicUsize>,
    /// Total points
    total: Arc<AtomicUsize>,
}

impl SweepProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
        }
    }

    /// Share counters owned elsewhere, e.g. by a host that polls them
    pub fn from_atomics(completed: Arc<AtomicUsize>, total: Arc<AtomicUsize>) -> Self {
        Self { completed, total }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Completed share in `[0, 1]`; an empty run counts as done
    #[must_use]
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 1.0,
            total => self.completed() as f64 / total as f64,
        }
    }
}

impl Default for SweepProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Drives an evaluation callback over every point of a sweep
pub struct Executor<'a> {
    axes: &'a [SweepAxis],
    groups: &'a [AxisGroup],
    space: &'a SweepIndexSpace,
    progress: SweepProgress,
}

impl<'a> Executor<'a> {
    pub fn new(axes: &'a [SweepAxis], groups: &'a [AxisGroup], space: &'a SweepIndexSpace) -> Self {
        Self {
            axes,
            groups,
            space,
            progress: SweepProgress::default(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: SweepProgress) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn progress(&self) -> &SweepProgress {
        &self.progress
    }

    /// Check that the index space was prepared from these axes and groups
    pub fn validate(&self) -> Result<(), ConfigError> {
        let expected = SweepIndexSpace::prepare(self.axes, self.groups)?;
        if expected.sizes() != self.space.sizes() {
            return Err(self.mismatch());
        }
        Ok(())
    }

    fn mismatch(&self) -> ConfigError {
        ConfigError::IndexSpaceMismatch {
            expected: self
                .groups
                .iter()
                .map(|g| g.axes.first().and_then(|&a| self.axes.get(a)?.len().ok()).unwrap_or(0))
                .collect(),
            found: self.space.sizes().to_vec(),
        }
    }

    /// Write the axis values of one point into `system`.
    ///
    /// Every axis of every group is written, in declaration order, each write
    /// cascading invalidation through the system.
    pub fn apply_point<S: Sweepable>(&self, system: &mut S, flat: usize) -> Result<SweepPoint, SimError> {
        let total = self.space.total();
        if flat >= total {
            return Err(ConfigError::PointOutOfRange { flat, total }.into());
        }
        let indices = decompose(flat, self.space.sizes());
        if indices.len() != self.groups.len() {
            return Err(self.mismatch().into());
        }
        for (g, (group, &index)) in self.groups.iter().zip(&indices).enumerate() {
            for &a in &group.axes {
                let axis = self
                    .axes
                    .get(a)
                    .ok_or(ConfigError::UnknownAxis { group: g, axis: a })?;
                let value = axis.values()?.get(index).ok_or_else(|| self.mismatch())?;
                system.apply(axis.target(), axis.key(), value)?;
            }
        }
        Ok(SweepPoint {
            flat_index: flat,
            indices,
        })
    }

    fn evaluate_point<S, F>(&self, system: &mut S, flat: usize, evaluate: &F) -> Result<PointResult, SimError>
    where
        S: Sweepable,
        F: Fn(&mut S, &SweepPoint) -> Result<PointOutputs, SimError>,
    {
        let point = self.apply_point(system, flat)?;
        trace!(flat, indices = ?point.indices, "evaluating point");
        let outputs = evaluate(system, &point)?;
        self.progress.increment();
        Ok(PointResult {
            flat_index: flat,
            outputs,
        })
    }

    /// Evaluate every point and return the results in flat-index order.
    ///
    /// The first failing point aborts the run.
    pub fn run<S, F>(
        &self,
        system: &mut S,
        config: &ExecutionConfig,
        evaluate: F,
    ) -> Result<Vec<PointResult>, SimError>
    where
        S: Sweepable + Replicate + Send + Sync,
        F: Fn(&mut S, &SweepPoint) -> Result<PointOutputs, SimError> + Send + Sync,
    {
        config.validate()?;
        self.validate()?;
        let total = self.space.total();
        self.progress.reset(total);
        info!(
            points = total,
            groups = self.space.ndim(),
            mode = ?config.mode,
            "starting sweep"
        );

        let results = match config.mode {
            ExecutionMode::Sequential => self.run_sequential(system, &evaluate),
            ExecutionMode::Parallel => self.run_parallel(system, config.workers, &evaluate),
        }?;

        info!(points = results.len(), "sweep finished");
        Ok(results)
    }

    fn run_sequential<S, F>(&self, system: &mut S, evaluate: &F) -> Result<Vec<PointResult>, SimError>
    where
        S: Sweepable,
        F: Fn(&mut S, &SweepPoint) -> Result<PointOutputs, SimError>,
    {
        (0..self.space.total())
            .map(|flat| self.evaluate_point(system, flat, evaluate))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn run_parallel<S, F>(&self, system: &S, workers: usize, evaluate: &F) -> Result<Vec<PointResult>, SimError>
    where
        S: Sweepable + Replicate + Send + Sync,
        F: Fn(&mut S, &SweepPoint) -> Result<PointOutputs, SimError> + Send + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("qsweep-worker-{i}"))
            .build()
            .map_err(|e| SimError::WorkerPool(e.to_string()))?;
        debug!(workers, "worker pool ready");

        // One task per point, each on its own replica. The indexed collect
        // keeps results in flat-index order.
        pool.install(|| {
            (0..self.space.total())
                .into_par_iter()
                .with_max_len(1)
                .map(|flat| {
                    let mut replica = system.replicate();
                    self.evaluate_point(&mut replica, flat, evaluate)
                })
                .collect()
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn run_parallel<S, F>(&self, system: &S, workers: usize, evaluate: &F) -> Result<Vec<PointResult>, SimError>
    where
        S: Sweepable + Replicate,
        F: Fn(&mut S, &SweepPoint) -> Result<PointOutputs, SimError>,
    {
        debug!(workers, "built without the parallel feature, evaluating replicas in turn");
        (0..self.space.total())
            .map(|flat| {
                let mut replica = system.replicate();
                self.evaluate_point(&mut replica, flat, evaluate)
            })
            .collect()
    }
}
