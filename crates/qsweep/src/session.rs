//! One configured sweep run over a host-provided system

use std::path::Path;

use color_eyre::eyre::WrapErr;
use qsweep_core::{
    PointOutputs, Registry, Simulation, SweepPoint, SweepProgress, SweepResults,
};
use tracing::info;

use crate::settings::RunSettings;

/// A simulation with its settings applied, plus a progress handle that can
/// be polled from another thread while the sweep runs
pub struct Session<A> {
    settings: RunSettings,
    simulation: Simulation<A>,
    progress: SweepProgress,
}

impl<A: Send + Sync> Session<A> {
    /// Apply `settings.sweep` to a fresh simulation over `registry`.
    ///
    /// Object names in the sweep are resolved here, so unknown names fail
    /// before anything runs.
    pub fn new(registry: Registry<A>, settings: RunSettings) -> color_eyre::Result<Self> {
        let mut simulation = Simulation::new(registry);
        simulation
            .apply_spec(&settings.sweep)
            .wrap_err("applying sweep settings")?;
        let points = simulation
            .prepare()
            .wrap_err("preparing sweep axes")?
            .total();
        info!(points, axes = settings.sweep.axes.len(), "session ready");

        Ok(Self {
            settings,
            simulation,
            progress: SweepProgress::new(points),
        })
    }

    /// Like [`Session::new`], reading the settings from a YAML file
    pub fn from_file(registry: Registry<A>, path: &Path) -> color_eyre::Result<Self> {
        Self::new(registry, RunSettings::load(path)?)
    }

    #[must_use]
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    #[must_use]
    pub fn simulation(&self) -> &Simulation<A> {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation<A> {
        &mut self.simulation
    }

    /// Shared progress counters for the current or last run
    #[must_use]
    pub fn progress(&self) -> SweepProgress {
        self.progress.clone()
    }

    /// Run the sweep with the configured execution mode
    pub fn run<F>(&mut self, evaluate: F) -> color_eyre::Result<SweepResults>
    where
        F: Fn(&mut Registry<A>, &SweepPoint) -> qsweep_core::Result<PointOutputs> + Send + Sync,
    {
        let mode = self.simulation.execution().mode;
        let results = self
            .simulation
            .run_with_progress(evaluate, self.progress.clone())
            .wrap_err_with(|| format!("running {mode:?} sweep"))?;
        info!(
            points = self.progress.completed(),
            series = results.series_names().count(),
            "session finished"
        );
        Ok(results)
    }

    pub fn into_simulation(self) -> Simulation<A> {
        self.simulation
    }
}
